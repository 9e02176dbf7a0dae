use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use overture_core::{
    ApiResponse, CallOutcome, ChatProvider, ChatRequest, ChunkStream, FeedbackKey, MessageParam,
    OvertureConfig, ProviderError, SystemContent, ToolSpec,
};
use overture_resolver::{resolve_response, FinalResult, ResolvedCall, ResolvedReturn};
use overture_session::{Event, ModelParameters, PiiRedactor, Redactor, SessionClient};
use overture_template::{format_messages, format_system, Params, ResolvedSystem, TemplateError, TemplateValue};

#[derive(Debug, Error)]
pub enum OvertureError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Per-call overrides, resolved against the client config and its baked-in
/// environment defaults.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    pub api_key: Option<SecretString>,
    pub prompt_template_name: Option<String>,
    pub template_params: Option<Params>,
    pub chat_id: Option<String>,
    pub chain_id: Option<String>,
    pub feedback_key: Option<FeedbackKey>,
    pub context: Option<Value>,
}

/// A request whose system prompt and message list may be templates.
#[derive(Clone, Debug)]
pub struct TrackedRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: Option<TemplateValue<SystemContent>>,
    pub messages: TemplateValue<Vec<MessageParam>>,
    pub tools: Vec<ToolSpec>,
    pub temperature: Option<f64>,
    pub stream: bool,
}

/// What the caller gets back: indistinguishable from an untracked call.
pub enum TrackedResponse {
    Complete(ApiResponse),
    Stream(ChunkStream),
}

impl std::fmt::Debug for TrackedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackedResponse::Complete(response) => {
                f.debug_tuple("Complete").field(response).finish()
            }
            TrackedResponse::Stream(_) => f.debug_tuple("Stream").finish(),
        }
    }
}

/// Middleware around a [`ChatProvider`]: substitutes templates before the
/// remote call, normalizes the outcome, and reports it on a detached
/// background continuation that can never delay or fail the caller.
pub struct TrackedClient<P> {
    provider: P,
    config: OvertureConfig,
    session: SessionClient,
    redactor: Option<Arc<dyn Redactor>>,
}

impl<P: ChatProvider> TrackedClient<P> {
    pub fn new(provider: P, config: OvertureConfig) -> Self {
        let redactor = if config.redact_pii {
            match PiiRedactor::new() {
                Ok(redactor) => Some(Arc::new(redactor) as Arc<dyn Redactor>),
                Err(err) => {
                    warn!(error = %err, "could not build PII redactor, reporting unredacted data");
                    None
                }
            }
        } else {
            None
        };
        Self {
            session: SessionClient::new(config.clone()),
            provider,
            config,
            redactor,
        }
    }

    pub fn with_redactor(mut self, redactor: Arc<dyn Redactor>) -> Self {
        self.redactor = Some(redactor);
        self
    }

    pub async fn create(
        &self,
        request: TrackedRequest,
        options: CallOptions,
    ) -> Result<TrackedResponse, OvertureError> {
        let started = Instant::now();
        let params = options.template_params.clone();

        // Substitution happens (and fails) before the remote call.
        let resolved_system = match &request.system {
            Some(system) => Some(format_system(system, params.as_ref())?),
            None => None,
        };
        let formatted = format_messages(&request.messages, params.as_ref())?;

        let chat_request = ChatRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            system: resolved_system
                .as_ref()
                .map(|system| SystemContent::Text(system.prompt.clone())),
            messages: formatted.messages.clone(),
            tools: request.tools.clone(),
            temperature: request.temperature,
        };

        let outcome = if request.stream {
            CallOutcome::Streaming(self.provider.stream(chat_request).await?)
        } else {
            CallOutcome::Complete(self.provider.complete(chat_request).await?)
        };

        let template_name = options
            .prompt_template_name
            .clone()
            .or_else(|| self.config.prompt_template_name.clone());
        if template_name.is_none() && !self.config.allow_unnamed_prompts {
            // Untracked passthrough, exactly what an undecorated call returns.
            return Ok(match outcome {
                CallOutcome::Complete(response) => TrackedResponse::Complete(response),
                CallOutcome::Streaming(stream) => TrackedResponse::Stream(stream),
            });
        }

        let feedback_key = options
            .feedback_key
            .clone()
            .unwrap_or_else(FeedbackKey::generate);
        let ResolvedCall {
            return_value,
            final_result,
        } = resolve_response(outcome, feedback_key.clone());

        let raw_response = match &return_value {
            ResolvedReturn::Complete(response) => serde_json::to_value(response).ok(),
            ResolvedReturn::Streaming(_) => None,
        };

        self.spawn_report(
            final_result,
            ReportContext {
                started,
                feedback_key,
                template_name,
                params,
                raw_response,
                message_template: formatted.template,
                resolved_messages: formatted.messages,
                system: resolved_system,
                tools: request.tools,
                model_parameters: json!({
                    "model": request.model,
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                }),
                api_key: options.api_key,
                chat_id: options.chat_id.or_else(|| self.config.chat_id.clone()),
                chain_id: options.chain_id,
                context: options.context,
            },
        );

        Ok(match return_value {
            ResolvedReturn::Complete(response) => TrackedResponse::Complete(response),
            ResolvedReturn::Streaming(aggregator) => TrackedResponse::Stream(aggregator.boxed()),
        })
    }

    // Detached continuation: its outcome never alters or delays the
    // caller's primary result.
    fn spawn_report(&self, final_result: FinalResult, ctx: ReportContext) {
        let session = self.session.clone();
        let redactor = self.redactor.clone();
        tokio::spawn(async move {
            let resolved = final_result.await;
            let response_time = ctx.started.elapsed().as_millis() as u64;

            let mut response_text = resolved.text.clone();
            let mut params_value = match &ctx.params {
                Some(params) => serde_json::to_value(params).unwrap_or_else(|_| json!({})),
                None => json!({}),
            };
            if let Some(redactor) = &redactor {
                match redact_report(redactor.as_ref(), &response_text, &params_value) {
                    Ok((text, params)) => {
                        response_text = text;
                        params_value = params;
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to redact PII, reporting unredacted data");
                    }
                }
            }

            let event = Event {
                params: params_value,
                response: response_text,
                raw_response: ctx.raw_response,
                tool_calls: resolved.tool_calls,
                tools: if ctx.tools.is_empty() {
                    None
                } else {
                    serde_json::to_value(&ctx.tools).ok()
                },
                response_time: Some(response_time),
                response_metrics: Some(resolved.metrics),
                prompt_template_chat: prompt_template_chat(
                    ctx.message_template,
                    ctx.resolved_messages,
                    ctx.system.as_ref(),
                ),
                prompt_template_name: ctx.template_name.clone(),
                api_name: ctx.template_name,
                prompt: json!({}),
                chat_id: ctx.chat_id,
                chain_id: ctx.chain_id,
                context: ctx.context,
                feedback_key: ctx.feedback_key,
                model_parameters: Some(ModelParameters {
                    model_provider: "anthropic".to_string(),
                    model_type: "chat".to_string(),
                    params: ctx.model_parameters,
                }),
            };
            session.send_event(&event, ctx.api_key.as_ref()).await;
        });
    }
}

struct ReportContext {
    started: Instant,
    feedback_key: FeedbackKey,
    template_name: Option<String>,
    params: Option<Params>,
    raw_response: Option<Value>,
    message_template: Option<Vec<MessageParam>>,
    resolved_messages: Vec<MessageParam>,
    system: Option<ResolvedSystem>,
    tools: Vec<ToolSpec>,
    model_parameters: Value,
    api_key: Option<SecretString>,
    chat_id: Option<String>,
    chain_id: Option<String>,
    context: Option<Value>,
}

// The reported template is the pre-substitution message list when one was
// recovered, else the resolved messages; a system prompt is prepended as a
// leading system message, preferring its own template form.
fn prompt_template_chat(
    template: Option<Vec<MessageParam>>,
    resolved: Vec<MessageParam>,
    system: Option<&ResolvedSystem>,
) -> Option<Value> {
    let mut chat = template.unwrap_or(resolved);
    if let Some(system) = system {
        let content = system.template.clone().unwrap_or_else(|| system.prompt.clone());
        chat.insert(0, MessageParam::new("system", content));
    }
    serde_json::to_value(chat).ok()
}

fn redact_report(
    redactor: &dyn Redactor,
    text: &Option<String>,
    params: &Value,
) -> Result<(Option<String>, Value), overture_session::RedactionError> {
    let text = match text {
        Some(text) => match redactor.redact(Value::String(text.clone()))? {
            Value::String(scrubbed) => Some(scrubbed),
            other => Some(other.to_string()),
        },
        None => None,
    };
    Ok((text, redactor.redact(params.clone())?))
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use secrecy::SecretString;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use overture::{
    ApiChunk, ApiResponse, CallOptions, ChatChunk, ChatProvider, ChatRequest, ChatResponse,
    ChatStreamEvent, ChunkStream, ContentBlock, ContentDelta, FeedbackKey, MessageDeltaBody,
    MessageParam, OvertureConfig, ProviderError, RedactionError, Redactor, SystemContent,
    TemplateValue, TrackedClient, TrackedRequest, TrackedResponse, Usage,
};

#[derive(Clone)]
struct FakeProvider {
    response: ApiResponse,
    chunks: Vec<ApiChunk>,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<ChatRequest>>>,
}

impl FakeProvider {
    fn new(response: ApiResponse, chunks: Vec<ApiChunk>) -> Self {
        Self {
            response,
            chunks,
            calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    fn record(&self, request: ChatRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    async fn complete(&self, request: ChatRequest) -> Result<ApiResponse, ProviderError> {
        self.record(request);
        Ok(self.response.clone())
    }

    async fn stream(&self, request: ChatRequest) -> Result<ChunkStream, ProviderError> {
        self.record(request);
        Ok(stream::iter(self.chunks.clone().into_iter().map(Ok)).boxed())
    }
}

struct FailingRedactor;

impl Redactor for FailingRedactor {
    fn redact(&self, _value: Value) -> Result<Value, RedactionError> {
        Err(RedactionError("injected failure".to_string()))
    }
}

fn chat_response(text: &str) -> ApiResponse {
    ApiResponse::Chat(ChatResponse {
        id: "msg_1".to_string(),
        model: "atlas-3".to_string(),
        role: "assistant".to_string(),
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        stop_reason: Some("end_turn".to_string()),
        usage: Some(Usage {
            input_tokens: 10,
            output_tokens: 20,
        }),
        feedback_key: None,
    })
}

fn text_chunks(fragments: &[&str]) -> Vec<ApiChunk> {
    let mut chunks: Vec<ApiChunk> = fragments
        .iter()
        .map(|fragment| {
            ApiChunk::Chat(ChatChunk::new(ChatStreamEvent::ContentBlockDelta {
                index: 0,
                delta: ContentDelta::TextDelta {
                    text: fragment.to_string(),
                },
            }))
        })
        .collect();
    chunks.push(ApiChunk::Chat(ChatChunk::new(
        ChatStreamEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: Some("end_turn".to_string()),
            },
            usage: None,
        },
    )));
    chunks
}

fn tracked_request(stream: bool) -> TrackedRequest {
    TrackedRequest {
        model: "atlas-3".to_string(),
        max_tokens: 256,
        system: Some(TemplateValue::tagged(SystemContent::Text(
            "Answer as a {persona}.".to_string(),
        ))),
        messages: TemplateValue::tagged(vec![MessageParam::new(
            "user",
            "Where can I eat {food}?",
        )]),
        tools: Vec::new(),
        temperature: None,
        stream,
    }
}

fn call_options() -> CallOptions {
    CallOptions {
        prompt_template_name: Some("travel-guide".to_string()),
        template_params: Some(
            [
                ("persona".to_string(), json!("travel guide")),
                ("food".to_string(), json!("pizza")),
            ]
            .into_iter()
            .collect(),
        ),
        ..CallOptions::default()
    }
}

async fn telemetry_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/event"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;
    server
}

async fn wait_for_events(server: &MockServer, count: usize) -> Vec<Request> {
    for _ in 0..200 {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.len() >= count {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("telemetry server never received {count} event(s)");
}

fn event_body(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap()
}

#[tokio::test]
async fn tracked_call_reports_the_original_template() {
    let server = telemetry_server().await;
    let provider = FakeProvider::new(chat_response("Try the carbonara."), Vec::new());
    let config = OvertureConfig::with_prefix(
        Some(SecretString::new("test-key".to_string())),
        &server.uri(),
    );
    let client = TrackedClient::new(provider.clone(), config);

    let response = client
        .create(tracked_request(false), call_options())
        .await
        .unwrap();

    // the provider saw the substituted request
    let sent = provider.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(
        sent.system,
        Some(SystemContent::Text("Answer as a travel guide.".to_string()))
    );
    assert_eq!(
        sent.messages,
        vec![MessageParam::new("user", "Where can I eat pizza?")]
    );

    // the caller got the annotated response
    let feedback_key = match response {
        TrackedResponse::Complete(response) => response.feedback_key().cloned().unwrap(),
        TrackedResponse::Stream(_) => panic!("expected a complete response"),
    };

    // the event carries the pre-substitution template and resolved params
    let requests = wait_for_events(&server, 1).await;
    let body = event_body(&requests[0]);
    assert_eq!(body["response"], json!("Try the carbonara."));
    assert_eq!(body["params"], json!({ "persona": "travel guide", "food": "pizza" }));
    assert_eq!(
        body["promptTemplateChat"],
        json!([
            { "role": "system", "content": "Answer as a {persona}." },
            { "role": "user", "content": "Where can I eat {food}?" },
        ])
    );
    assert_eq!(body["promptTemplateName"], json!("travel-guide"));
    assert_eq!(body["feedbackKey"], json!(feedback_key.as_str()));
    assert_eq!(body["responseMetrics"]["stop_reason"], json!("end_turn"));
}

#[tokio::test]
async fn streamed_call_reports_accumulated_text() {
    let server = telemetry_server().await;
    let provider = FakeProvider::new(
        chat_response("unused"),
        text_chunks(&["He", "llo", " ", "World"]),
    );
    let config = OvertureConfig::with_prefix(
        Some(SecretString::new("test-key".to_string())),
        &server.uri(),
    );
    let client = TrackedClient::new(provider, config);

    let response = client
        .create(tracked_request(true), call_options())
        .await
        .unwrap();
    let mut stream = match response {
        TrackedResponse::Stream(stream) => stream,
        TrackedResponse::Complete(_) => panic!("expected a stream"),
    };
    let mut yielded = 0;
    while let Some(chunk) = stream.next().await {
        assert!(chunk.unwrap().feedback_key().is_some());
        yielded += 1;
    }
    assert_eq!(yielded, 5);
    drop(stream);

    let requests = wait_for_events(&server, 1).await;
    let body = event_body(&requests[0]);
    assert_eq!(body["response"], json!("Hello World"));
    assert_eq!(body["responseMetrics"]["stop_reason"], json!("end_turn"));
}

#[tokio::test]
async fn abandoned_stream_still_reports_partial_text() {
    let server = telemetry_server().await;
    let provider = FakeProvider::new(
        chat_response("unused"),
        text_chunks(&["He", "llo", " ", "World"]),
    );
    let config = OvertureConfig::with_prefix(
        Some(SecretString::new("test-key".to_string())),
        &server.uri(),
    );
    let client = TrackedClient::new(provider, config);

    let response = client
        .create(tracked_request(true), call_options())
        .await
        .unwrap();
    let mut stream = match response {
        TrackedResponse::Stream(stream) => stream,
        TrackedResponse::Complete(_) => panic!("expected a stream"),
    };
    stream.next().await;
    stream.next().await;
    drop(stream);

    let requests = wait_for_events(&server, 1).await;
    let body = event_body(&requests[0]);
    assert_eq!(body["response"], json!("Hello"));
}

#[tokio::test]
async fn unnamed_prompts_are_not_reported_when_disallowed() {
    let server = telemetry_server().await;
    let provider = FakeProvider::new(chat_response("untracked"), Vec::new());
    let mut config = OvertureConfig::with_prefix(
        Some(SecretString::new("test-key".to_string())),
        &server.uri(),
    );
    config.allow_unnamed_prompts = false;
    let client = TrackedClient::new(provider, config);

    let mut options = call_options();
    options.prompt_template_name = None;
    let response = client.create(tracked_request(false), options).await.unwrap();

    // no tracking: the response comes back unannotated
    match response {
        TrackedResponse::Complete(response) => assert!(response.feedback_key().is_none()),
        TrackedResponse::Stream(_) => panic!("expected a complete response"),
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn missing_params_fail_before_the_provider_is_called() {
    let server = telemetry_server().await;
    let provider = FakeProvider::new(chat_response("never"), Vec::new());
    let config = OvertureConfig::with_prefix(
        Some(SecretString::new("test-key".to_string())),
        &server.uri(),
    );
    let client = TrackedClient::new(provider.clone(), config);

    let mut options = call_options();
    options.template_params = None;
    let err = client
        .create(tracked_request(false), options)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        overture::OvertureError::Template(overture::TemplateError::MissingParams)
    ));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn redaction_failure_reports_unredacted_data() {
    let server = telemetry_server().await;
    let provider = FakeProvider::new(chat_response("reach me at ada@example.com"), Vec::new());
    let config = OvertureConfig::with_prefix(
        Some(SecretString::new("test-key".to_string())),
        &server.uri(),
    );
    let client =
        TrackedClient::new(provider, config).with_redactor(Arc::new(FailingRedactor));

    client
        .create(tracked_request(false), call_options())
        .await
        .unwrap();

    // the intentional fallback: the event still goes out, unredacted
    let requests = wait_for_events(&server, 1).await;
    let body = event_body(&requests[0]);
    assert_eq!(body["response"], json!("reach me at ada@example.com"));
}

#[tokio::test]
async fn pii_is_redacted_when_enabled() {
    let server = telemetry_server().await;
    let provider = FakeProvider::new(chat_response("reach me at ada@example.com"), Vec::new());
    let mut config = OvertureConfig::with_prefix(
        Some(SecretString::new("test-key".to_string())),
        &server.uri(),
    );
    config.redact_pii = true;
    let client = TrackedClient::new(provider, config);

    client
        .create(tracked_request(false), call_options())
        .await
        .unwrap();

    let requests = wait_for_events(&server, 1).await;
    let body = event_body(&requests[0]);
    assert_eq!(body["response"], json!("reach me at [REDACTED]"));
}

#[tokio::test]
async fn slow_telemetry_does_not_delay_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/event"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let provider = FakeProvider::new(chat_response("fast"), Vec::new());
    let config = OvertureConfig::with_prefix(
        Some(SecretString::new("test-key".to_string())),
        &server.uri(),
    );
    let client = TrackedClient::new(provider, config);

    let started = std::time::Instant::now();
    client
        .create(tracked_request(false), call_options())
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(300));

    wait_for_events(&server, 1).await;
}

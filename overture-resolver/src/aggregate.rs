use serde::Serialize;
use tracing::warn;

use overture_core::{
    ApiResponse, ChatResponse, Completion, ContentBlock, FeedbackKey, ResponseMetrics,
    ToolUseBlock,
};

/// The normalized outcome of one call, produced exactly once per call either
/// synchronously or when a stream finishes.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct ResolvedApiResult {
    pub text: Option<String>,
    pub metrics: ResponseMetrics,
    pub tool_calls: Vec<ToolUseBlock>,
}

/// Derive the aggregate from an already-complete response, annotating it in
/// place with the call's feedback key.
pub fn resolve_static(response: &mut ApiResponse, feedback_key: &FeedbackKey) -> ResolvedApiResult {
    match response {
        ApiResponse::Chat(chat) => resolve_chat(chat, feedback_key),
        ApiResponse::Completion(completion) => resolve_completion(completion, feedback_key),
    }
}

fn resolve_chat(response: &mut ChatResponse, feedback_key: &FeedbackKey) -> ResolvedApiResult {
    response.feedback_key = Some(feedback_key.clone());

    let mut text = None;
    let mut extra_text_blocks = 0;
    let mut tool_calls = Vec::new();
    for block in &response.content {
        match block {
            ContentBlock::Text { text: block_text } => {
                if text.is_none() {
                    text = Some(block_text.clone());
                } else {
                    extra_text_blocks += 1;
                }
            }
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolUseBlock {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
        }
    }
    if extra_text_blocks > 0 {
        warn!(
            extra_text_blocks,
            "unexpected multiple text blocks in chat response, resolving to the first one"
        );
    }

    ResolvedApiResult {
        text,
        metrics: ResponseMetrics {
            usage: response.usage.clone(),
            stop_reason: response.stop_reason.clone(),
        },
        tool_calls,
    }
}

fn resolve_completion(completion: &mut Completion, feedback_key: &FeedbackKey) -> ResolvedApiResult {
    completion.feedback_key = Some(feedback_key.clone());

    match &completion.completion {
        Some(text) => ResolvedApiResult {
            text: Some(text.clone()),
            metrics: ResponseMetrics {
                usage: None,
                stop_reason: completion.stop_reason.clone(),
            },
            tool_calls: Vec::new(),
        },
        None => ResolvedApiResult::default(),
    }
}

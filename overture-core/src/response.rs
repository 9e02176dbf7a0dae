use std::fmt;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ContentBlock, ProviderError, Value};

/// Opaque per-call correlation identifier. Threaded through every chunk of a
/// streamed response and into the final telemetry record so a later rating or
/// correction can be tied back to the original call.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FeedbackKey(String);

impl FeedbackKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedbackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResponseMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub stop_reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ToolUseBlock {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// One complete chat-style response.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub role: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_key: Option<FeedbackKey>,
}

/// Legacy completion-style response. Doubles as the chunk type when the
/// completion API streams.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Completion {
    pub model: String,
    pub completion: Option<String>,
    pub stop_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_key: Option<FeedbackKey>,
}

/// One chunk of a streamed chat response. The feedback key rides alongside
/// the event so decorated chunks keep the provider's wire shape.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ChatChunk {
    #[serde(flatten)]
    pub event: ChatStreamEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_key: Option<FeedbackKey>,
}

impl ChatChunk {
    pub fn new(event: ChatStreamEvent) -> Self {
        Self {
            event,
            feedback_key: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    MessageStart {
        message: ChatResponse,
    },
    ContentBlockStart {
        index: usize,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: ContentDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    MessageStop,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<String>,
}

/// A completed response from either API shape.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ApiResponse {
    Chat(ChatResponse),
    Completion(Completion),
}

impl ApiResponse {
    pub fn feedback_key(&self) -> Option<&FeedbackKey> {
        match self {
            ApiResponse::Chat(response) => response.feedback_key.as_ref(),
            ApiResponse::Completion(completion) => completion.feedback_key.as_ref(),
        }
    }
}

/// One chunk from either streaming API shape.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ApiChunk {
    Chat(ChatChunk),
    Completion(Completion),
}

impl ApiChunk {
    pub fn feedback_key(&self) -> Option<&FeedbackKey> {
        match self {
            ApiChunk::Chat(chunk) => chunk.feedback_key.as_ref(),
            ApiChunk::Completion(completion) => completion.feedback_key.as_ref(),
        }
    }
}

pub type ChunkStream = BoxStream<'static, Result<ApiChunk, ProviderError>>;

/// The outcome of a remote call: either a single completed response or a
/// live sequence of chunks.
pub enum CallOutcome {
    Complete(ApiResponse),
    Streaming(ChunkStream),
}

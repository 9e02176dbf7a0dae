mod config;
mod error;
mod message;
mod provider;
mod response;

pub use config::{OvertureConfig, DEFAULT_API_PREFIX};
pub use error::ProviderError;
pub use message::{
    ChatRequest, ContentBlock, MessageContent, MessageParam, SystemContent, TextSegment, ToolSpec,
    CHAT_HISTORY_ROLE,
};
pub use provider::ChatProvider;
pub use response::{
    ApiChunk, ApiResponse, CallOutcome, ChatChunk, ChatResponse, ChatStreamEvent, ChunkStream,
    Completion, ContentDelta, FeedbackKey, MessageDeltaBody, ResponseMetrics, ToolUseBlock, Usage,
};

pub type Value = serde_json::Value;

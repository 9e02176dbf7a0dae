//! Overture sits between application code and a remote text-generation
//! service. Callers mark parts of a request as templates, substitution is
//! deferred to call time, and every call's outcome is normalized and
//! reported on a detached side channel together with the original
//! (pre-substitution) template.

mod client;

pub use client::{CallOptions, OvertureError, TrackedClient, TrackedRequest, TrackedResponse};

pub use overture_core::{
    ApiChunk, ApiResponse, CallOutcome, ChatChunk, ChatProvider, ChatRequest, ChatResponse,
    ChatStreamEvent, ChunkStream, Completion, ContentBlock, ContentDelta, FeedbackKey,
    MessageContent, MessageDeltaBody, MessageParam, OvertureConfig, ProviderError,
    ResponseMetrics, SystemContent, TextSegment, ToolSpec, ToolUseBlock, Usage, CHAT_HISTORY_ROLE,
};
pub use overture_resolver::{
    resolve_response, resolve_static, FinalResult, ResolvedApiResult, ResolvedCall,
    ResolvedReturn, StreamAggregator,
};
pub use overture_session::{
    Event, Feedback, ModelParameters, PiiRedactor, RedactionError, Redactor, SessionClient,
    SessionError, UpdateChain,
};
pub use overture_template::{
    format, format_messages, format_str, format_system, format_value, FormattedMessages, Params,
    ResolvedSystem, TemplateError, TemplateValue,
};

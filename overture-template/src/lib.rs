//! Template tagging and placeholder substitution.
//!
//! Strings inside a tagged value are scanned left to right for `{name}`
//! tokens. `\{` and `\}` render literal braces and never start a
//! placeholder. The reserved role `chat_history` splices message lists into
//! the surrounding conversation instead of rendering as a string.

mod format;
mod value;

pub use format::{
    format, format_messages, format_str, format_system, format_value, FormattedMessages,
    ResolvedSystem, TemplateError,
};
pub use value::TemplateValue;

pub type Params = std::collections::HashMap<String, serde_json::Value>;

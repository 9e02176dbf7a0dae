use serde::{Deserialize, Serialize};

use crate::Value;

/// Reserved role whose content placeholders splice message lists into the
/// surrounding conversation instead of rendering as a string.
pub const CHAT_HISTORY_ROLE: &str = "chat_history";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MessageParam {
    pub role: String,
    pub content: MessageContent,
}

impl MessageParam {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(content.into()),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

/// System prompts arrive either as a plain string or a list of text
/// segments. Segment lists are joined before substitution.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SystemContent {
    Text(String),
    Segments(Vec<TextSegment>),
}

impl SystemContent {
    pub fn joined_text(&self) -> String {
        match self {
            SystemContent::Text(text) => text.clone(),
            SystemContent::Segments(segments) => segments
                .iter()
                .map(|segment| segment.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TextSegment {
    pub text: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemContent>,
    pub messages: Vec<MessageParam>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

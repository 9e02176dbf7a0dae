use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use overture_core::{
    ContentBlock, MessageContent, MessageParam, SystemContent, CHAT_HISTORY_ROLE,
};

use crate::{Params, TemplateValue};

// Escapes and placeholders share one alternation so a single left-to-right
// scan resolves both; an escaped brace can never start a token.
const TOKEN_PATTERN: &str = r"\\\{|\\\}|\{([A-Za-z0-9_]+)\}";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template requires params, but none were provided")]
    MissingParams,
    #[error("chat history placeholder '{name}' has no value")]
    MissingHistoryParam { name: String },
    #[error("chat history placeholder '{name}' must resolve to a list of messages")]
    HistoryNotMessages { name: String },
    #[error("chat history content must be a plain string")]
    HistoryContentNotText,
    #[error("invalid token pattern: {0}")]
    Pattern(String),
}

fn token_pattern() -> Result<Regex, TemplateError> {
    Regex::new(TOKEN_PATTERN).map_err(|e| TemplateError::Pattern(e.to_string()))
}

fn render_param(value: &Value) -> String {
    value
        .as_str()
        .map(|s| s.to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Substitute `{name}` tokens in one string. Escaped braces collapse to
/// literals. A placeholder with no matching param is left verbatim and
/// logged, never silently emptied.
pub fn format_str(template: &str, params: &Params) -> Result<String, TemplateError> {
    let pattern = token_pattern()?;
    let rendered = pattern.replace_all(template, |caps: &Captures| {
        match caps.get(1) {
            Some(name) => match params.get(name.as_str()) {
                Some(value) => render_param(value),
                None => {
                    warn!(placeholder = name.as_str(), "no value for placeholder");
                    caps[0].to_string()
                }
            },
            // `\{` or `\}`
            None => caps[0][1..].to_string(),
        }
    });
    Ok(rendered.into_owned())
}

/// Structural recursion over an arbitrary JSON-like value: strings are
/// formatted, numbers/booleans/null pass through, arrays and objects recurse
/// into every element. Always returns a new value.
pub fn format_value(value: &Value, params: &Params) -> Result<Value, TemplateError> {
    match value {
        Value::String(text) => Ok(Value::String(format_str(text, params)?)),
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| format_value(item, params))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Value::Object(map) => Ok(Value::Object(
            map.iter()
                .map(|(key, value)| Ok((key.clone(), format_value(value, params)?)))
                .collect::<Result<_, TemplateError>>()?,
        )),
        other => Ok(other.clone()),
    }
}

/// Format an arbitrary tagged value. `Raw` values pass through untouched; a
/// tagged value with no param set fails before any remote call is attempted.
pub fn format(
    template: &TemplateValue<Value>,
    params: Option<&Params>,
) -> Result<Value, TemplateError> {
    if !template.is_tagged() {
        return Ok(template.value().clone());
    }
    let params = params.ok_or(TemplateError::MissingParams)?;
    format_value(template.value(), params)
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormattedMessages {
    pub messages: Vec<MessageParam>,
    /// The pre-substitution message list, present only for tagged inputs.
    pub template: Option<Vec<MessageParam>>,
}

/// Resolve a message list. Entries with the reserved `chat_history` role are
/// replaced by the spliced expansion of their placeholders; every other
/// entry is formatted in place.
pub fn format_messages(
    messages: &TemplateValue<Vec<MessageParam>>,
    params: Option<&Params>,
) -> Result<FormattedMessages, TemplateError> {
    if !messages.is_tagged() {
        return Ok(FormattedMessages {
            messages: messages.value().clone(),
            template: None,
        });
    }
    let params = params.ok_or(TemplateError::MissingParams)?;

    let mut resolved = Vec::with_capacity(messages.value().len());
    for entry in messages.value() {
        if entry.role == CHAT_HISTORY_ROLE {
            resolved.extend(splice_history(entry, params)?);
        } else {
            resolved.push(MessageParam {
                role: entry.role.clone(),
                content: format_content(&entry.content, params)?,
            });
        }
    }

    Ok(FormattedMessages {
        messages: resolved,
        template: messages.source().cloned(),
    })
}

fn format_content(content: &MessageContent, params: &Params) -> Result<MessageContent, TemplateError> {
    match content {
        MessageContent::Text(text) => Ok(MessageContent::Text(format_str(text, params)?)),
        MessageContent::Blocks(blocks) => Ok(MessageContent::Blocks(
            blocks
                .iter()
                .map(|block| format_block(block, params))
                .collect::<Result<Vec<_>, _>>()?,
        )),
    }
}

fn format_block(block: &ContentBlock, params: &Params) -> Result<ContentBlock, TemplateError> {
    match block {
        ContentBlock::Text { text } => Ok(ContentBlock::Text {
            text: format_str(text, params)?,
        }),
        ContentBlock::ToolUse { id, name, input } => Ok(ContentBlock::ToolUse {
            id: id.clone(),
            name: name.clone(),
            input: format_value(input, params)?,
        }),
    }
}

// Every placeholder in a chat-history entry must resolve to a message list.
// The entry itself disappears, replaced by the flattened concatenation of
// those lists in the order the placeholders appear.
fn splice_history(entry: &MessageParam, params: &Params) -> Result<Vec<MessageParam>, TemplateError> {
    let content = match &entry.content {
        MessageContent::Text(text) => text,
        MessageContent::Blocks(_) => return Err(TemplateError::HistoryContentNotText),
    };

    let pattern = token_pattern()?;
    let mut spliced = Vec::new();
    for caps in pattern.captures_iter(content) {
        let Some(name) = caps.get(1) else {
            // escaped brace, nothing to splice
            continue;
        };
        let value = params
            .get(name.as_str())
            .ok_or_else(|| TemplateError::MissingHistoryParam {
                name: name.as_str().to_string(),
            })?;
        let messages: Vec<MessageParam> = serde_json::from_value(value.clone()).map_err(|_| {
            TemplateError::HistoryNotMessages {
                name: name.as_str().to_string(),
            }
        })?;
        spliced.extend(messages);
    }
    Ok(spliced)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSystem {
    pub prompt: String,
    /// The pre-substitution prompt, present only for tagged inputs.
    pub template: Option<String>,
}

/// Resolve a system prompt. Segment lists are joined with newlines before
/// substitution, so a tagged segment list still formats as one template.
pub fn format_system(
    system: &TemplateValue<SystemContent>,
    params: Option<&Params>,
) -> Result<ResolvedSystem, TemplateError> {
    let joined = system.value().joined_text();
    if !system.is_tagged() {
        return Ok(ResolvedSystem {
            prompt: joined,
            template: None,
        });
    }
    let params = params.ok_or(TemplateError::MissingParams)?;
    let source = system.source().map(|s| s.joined_text());
    Ok(ResolvedSystem {
        prompt: format_str(&joined, params)?,
        template: source,
    })
}

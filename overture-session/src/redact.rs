use regex::Regex;
use serde_json::Value;
use thiserror::Error;

const REDACTED: &str = "[REDACTED]";

const PII_PATTERNS: &[&str] = &[
    // email
    r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
    // phone number
    r"\+?\d{1,2}[\s.-]?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}",
    // social security number
    r"\b\d{3}-\d{2}-\d{4}\b",
    // credit card number
    r"\b(?:\d[ -]?){13,16}\b",
];

#[derive(Debug, Error)]
#[error("redaction failed: {0}")]
pub struct RedactionError(pub String);

/// Scrubs PII from a value before it leaves the process. Behind a trait so
/// the reporting path can be exercised with a failing implementation.
pub trait Redactor: Send + Sync {
    fn redact(&self, value: Value) -> Result<Value, RedactionError>;
}

pub struct PiiRedactor {
    patterns: Vec<Regex>,
}

impl PiiRedactor {
    pub fn new() -> Result<Self, RedactionError> {
        let patterns = PII_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).map_err(|e| RedactionError(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    fn redact_text(&self, text: &str) -> String {
        let mut scrubbed = text.to_string();
        for pattern in &self.patterns {
            scrubbed = pattern.replace_all(&scrubbed, REDACTED).into_owned();
        }
        scrubbed
    }
}

impl Redactor for PiiRedactor {
    fn redact(&self, value: Value) -> Result<Value, RedactionError> {
        Ok(match value {
            Value::String(text) => Value::String(self.redact_text(&text)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.redact(item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| Ok((key, self.redact(value)?)))
                    .collect::<Result<_, RedactionError>>()?,
            ),
            other => other,
        })
    }
}

use serde::Serialize;

use overture_core::{FeedbackKey, ResponseMetrics, ToolUseBlock, Value};

/// One telemetry record per call. The reporting service expects camelCase
/// field names.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Resolved placeholder parameters for this call.
    pub params: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolUseBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    /// Response time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_metrics: Option<ResponseMetrics>,
    /// The original (pre-substitution) message template, system included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template_chat: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_name: Option<String>,
    pub prompt: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub feedback_key: FeedbackKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_parameters: Option<ModelParameters>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParameters {
    pub model_provider: String,
    pub model_type: String,
    #[serde(flatten)]
    pub params: Value,
}

/// A correction or rating correlated to an earlier call by its feedback key.
/// The feedback endpoint expects snake_case field names, apart from the
/// API key itself.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Feedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_key: Option<FeedbackKey>,
    /// A rating from 0 to 1 on the quality of the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// A better response than what the model produced, e.g. a user edit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub better_response: Option<String>,
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct UpdateChain {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

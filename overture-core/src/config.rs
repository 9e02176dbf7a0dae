use std::env;

use secrecy::SecretString;

pub const DEFAULT_API_PREFIX: &str = "https://app.overture.dev/api";

/// Explicit configuration for the middleware. Environment variables are read
/// once at this boundary; nothing downstream touches ambient state.
#[derive(Clone, Debug)]
pub struct OvertureConfig {
    pub api_key: Option<SecretString>,
    pub reporting_url: String,
    pub feedback_url: String,
    pub chain_url: String,
    pub prompt_template_name: Option<String>,
    pub allow_unnamed_prompts: bool,
    pub redact_pii: bool,
    pub chat_id: Option<String>,
}

impl OvertureConfig {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self::with_prefix(api_key, DEFAULT_API_PREFIX)
    }

    pub fn with_prefix(api_key: Option<SecretString>, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            api_key,
            reporting_url: format!("{prefix}/event"),
            feedback_url: format!("{prefix}/feedback"),
            chain_url: format!("{prefix}/v1/updateChain"),
            prompt_template_name: None,
            allow_unnamed_prompts: true,
            redact_pii: false,
            chat_id: None,
        }
    }

    /// Build a config from `OVERTURE_*` environment variables. Per-endpoint
    /// URLs override the shared prefix.
    pub fn from_env() -> Self {
        let api_key = env::var("OVERTURE_API_KEY").ok().map(SecretString::new);
        let prefix =
            env::var("OVERTURE_API_PREFIX").unwrap_or_else(|_| DEFAULT_API_PREFIX.to_string());
        let mut config = Self::with_prefix(api_key, &prefix);
        if let Ok(url) = env::var("OVERTURE_REPORTING_URL") {
            config.reporting_url = url;
        }
        if let Ok(url) = env::var("OVERTURE_FEEDBACK_URL") {
            config.feedback_url = url;
        }
        if let Ok(url) = env::var("OVERTURE_UPDATE_CHAIN_URL") {
            config.chain_url = url;
        }
        config
    }
}

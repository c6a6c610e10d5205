//! Runtime configuration read from the environment

use crate::llm::OpenAiSettings;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_USER: &str = "local-user";

/// Configuration for the companion binary
#[derive(Debug, Clone)]
pub struct CompanionConfig {
    pub db_path: PathBuf,
    pub user_id: String,
    pub ai_base_url: String,
    pub ai_model: String,
    pub ai_api_key: Option<String>,
    /// HTTP client timeout; the core itself imposes none
    pub ai_timeout: Duration,
    pub log_json: bool,
}

impl CompanionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = var("MILO_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".milo").join("milo.db")
            },
            PathBuf::from,
        );

        let ai_timeout = var("MILO_AI_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);

        Self {
            db_path,
            user_id: var("MILO_USER_ID")
                .or_else(|| var("USER"))
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            ai_base_url: var("MILO_AI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ai_model: var("MILO_AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ai_api_key: var("MILO_AI_API_KEY").or_else(|| var("OPENAI_API_KEY")),
            ai_timeout,
            log_json: var("MILO_LOG_JSON").is_some_and(|v| v != "0" && v != "false"),
        }
    }

    /// Client settings, or `None` when no API key is configured
    pub fn openai_settings(&self) -> Option<OpenAiSettings> {
        self.ai_api_key.as_ref().map(|api_key| OpenAiSettings {
            api_key: api_key.clone(),
            base_url: self.ai_base_url.clone(),
            model: self.ai_model.clone(),
            timeout: self.ai_timeout,
        })
    }
}

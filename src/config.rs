use serde::Deserialize;
use validator::Validate;

/// Main configuration for Menu Concierge
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct Config {
    /// HTTP server port
    #[validate(range(min = 1024, max = 65535))]
    pub server_port: u16,

    /// Catalog API base URL (menu items, categories, auth)
    pub catalog_base_url: String,

    /// Catalog login email
    pub catalog_email: String,

    /// Catalog login password
    pub catalog_password: String,

    /// OpenAI-compatible API base URL (embeddings, chat, rerank)
    pub llm_base_url: String,

    /// API key for the LLM endpoint
    pub llm_api_key: String,

    /// Embedding model name; catalog and query vectors must both come from it
    pub embedding_model: String,

    /// Chat model driving the conversational turn
    pub chat_model: String,

    /// Model used for the candidate rerank pass
    pub rerank_model: String,

    /// Prefix for session-store keys (`<namespace>:chat:<session_id>`)
    #[validate(length(min = 1))]
    pub session_namespace: String,

    /// Log level (e.g., info, debug, trace)
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            // Core defaults
            .set_default("server_port", 8080)?
            .set_default("log_level", "info")?
            .set_default("catalog_base_url", "http://localhost:3000/api/v1")?
            .set_default("catalog_email", "")?
            .set_default("catalog_password", "")?
            .set_default("llm_base_url", "https://api.openai.com")?
            .set_default("llm_api_key", "")?
            .set_default("embedding_model", "text-embedding-3-small")?
            .set_default("chat_model", "gpt-4o-mini")?
            .set_default("rerank_model", "gpt-4o-mini")?
            .set_default("session_namespace", "concierge")?
            // Load from ./concierge.toml (if present)
            .add_source(config::File::with_name("concierge").required(false))
            // Environment overrides: CONCIERGE__SERVER_PORT, CONCIERGE__LLM_API_KEY, etc.
            .add_source(config::Environment::with_prefix("CONCIERGE").separator("__"))
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }
}

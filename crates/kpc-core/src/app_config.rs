use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    /// Tracing filter used when `KPC_LOG_LEVEL` is unset.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Environment::Development => "debug",
            Environment::Test => "warn",
            Environment::Production => "info",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub env: Environment,
    pub log_level: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_fetches: usize,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// YAML fallback table. `None` selects the compiled-in table.
    pub fallback_path: Option<PathBuf>,
    pub derive_unit_price: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base_url", &self.api_base_url)
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("fallback_path", &self.fallback_path)
            .field("derive_unit_price", &self.derive_unit_price)
            .finish()
    }
}

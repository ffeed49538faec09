use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
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

/// Runtime configuration for a scraping run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Scheme + host of the job site; every endpoint is resolved against it.
    pub site_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for transient errors.
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Fixed pause between consecutive job-page fetches. `0` disables it.
    pub inter_request_delay_ms: u64,
    /// Skip job URLs already seen earlier in the same run.
    pub dedupe_job_urls: bool,
    /// Pattern source overrides keyed by lowercase pattern name (`job_title`, ...).
    pub pattern_overrides: BTreeMap<String, String>,
}

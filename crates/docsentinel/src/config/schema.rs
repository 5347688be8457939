use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level agent configuration.
///
/// Loaded from a JSON document; every section has serde defaults so an empty
/// object `{}` is a valid config. Environment variables prefixed
/// `DOCSENTINEL_` override individual knobs after loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,

    /// Directory watched for uploaded documents.
    #[serde(default = "default_inbox")]
    pub inbox_directory: String,

    /// SQLite database path for durable results/feedback. Empty keeps
    /// everything in memory.
    #[serde(default)]
    pub database_path: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub breakers: BreakersConfig,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_inbox() -> String {
    "inbox".to_string()
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

impl Default for Config {
    fn default() -> Self {
        serde_json::from_str("{}").expect("empty config must deserialize")
    }
}

/// Backoff parameters for retried collaborator calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Thresholds for one dependency's circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_recovery_timeout_secs() -> u64 {
    30
}

impl BreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout_secs: u64) -> Self {
        Self {
            failure_threshold,
            recovery_timeout_secs,
        }
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
        }
    }
}

/// One breaker per external dependency. The LLM endpoint tolerates more
/// consecutive failures before tripping and cools down longer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakersConfig {
    #[serde(default = "default_llm_breaker")]
    pub llm: BreakerConfig,
    #[serde(default)]
    pub search: BreakerConfig,
    #[serde(default)]
    pub store: BreakerConfig,
}

fn default_llm_breaker() -> BreakerConfig {
    BreakerConfig::new(5, 60)
}

impl Default for BreakersConfig {
    fn default() -> Self {
        Self {
            llm: default_llm_breaker(),
            search: BreakerConfig::default(),
            store: BreakerConfig::default(),
        }
    }
}

/// Knobs of the detection pipeline itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// How many leading characters of the source text form the search query.
    #[serde(default = "default_query_chars")]
    pub search_query_chars: usize,
    /// Maximum related documents requested per search.
    #[serde(default = "default_page_size")]
    pub search_page_size: usize,
    /// Most-recent feedback entries loaded before compare-text.
    #[serde(default = "default_feedback_limit")]
    pub feedback_limit: usize,
    /// Character budget per feedback detail in the context digest.
    #[serde(default = "default_feedback_detail_chars")]
    pub feedback_detail_chars: usize,
    /// Maximum characters of each document side sent to the comparer.
    #[serde(default = "default_compare_chars")]
    pub compare_chars: usize,
}

fn default_query_chars() -> usize {
    500
}

fn default_page_size() -> usize {
    5
}

fn default_feedback_limit() -> usize {
    20
}

fn default_feedback_detail_chars() -> usize {
    80
}

fn default_compare_chars() -> usize {
    16_000
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            search_query_chars: default_query_chars(),
            search_page_size: default_page_size(),
            feedback_limit: default_feedback_limit(),
            feedback_detail_chars: default_feedback_detail_chars(),
            compare_chars: default_compare_chars(),
        }
    }
}

/// LLM comparison endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the inference endpoint. Empty disables the HTTP client.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: String::new(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Search index endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search_timeout_secs() -> u64 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

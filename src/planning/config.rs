//! Planner configuration: YAML parsing and validation.
//!
//! The deterministic planner reads nothing from the environment: supported
//! types, timeouts and query knobs all come from one immutable `PlannerConfig`
//! handed to it at construction.

use crate::core::types::TargetType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for [`super::DeterministicPlanner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Schema version (must be "1.0")
    #[serde(default = "default_version")]
    pub version: String,

    /// Planner name reported in errors
    #[serde(default = "default_name")]
    pub name: String,

    /// Target types accepted, in display order
    #[serde(default = "default_supported_types")]
    pub supported_types: Vec<TargetType>,

    /// Engines queried by the reputation step
    #[serde(default = "default_engines")]
    pub reputation_engines: Vec<String>,

    /// Appended to the target in news queries
    #[serde(default = "default_news_suffix")]
    pub news_query_suffix: String,

    /// Web search result count outside demo mode
    #[serde(default = "default_web_results")]
    pub web_results: u32,

    /// Web search result count in demo mode
    #[serde(default = "default_web_results_demo")]
    pub web_results_demo: u32,

    /// Look-back for the baseline news step
    #[serde(default = "default_news_days")]
    pub news_days_back: u32,

    /// Look-back for the news step inserted on high-severity evidence
    #[serde(default = "default_adaptive_news_days")]
    pub adaptive_news_days_back: u32,

    /// Passed through to the scorer
    #[serde(default = "default_aggregation")]
    pub aggregation_method: String,

    /// Passed through to the scorer
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Advisory per-step deadlines
    #[serde(default)]
    pub timeouts: StepTimeouts,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: default_name(),
            supported_types: default_supported_types(),
            reputation_engines: default_engines(),
            news_query_suffix: default_news_suffix(),
            web_results: default_web_results(),
            web_results_demo: default_web_results_demo(),
            news_days_back: default_news_days(),
            adaptive_news_days_back: default_adaptive_news_days(),
            aggregation_method: default_aggregation(),
            confidence_threshold: default_confidence_threshold(),
            timeouts: StepTimeouts::default(),
        }
    }
}

/// Per-primitive timeouts in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTimeouts {
    #[serde(default = "default_whois_timeout")]
    pub whois: u32,
    #[serde(default = "default_web_search_timeout")]
    pub web_search: u32,
    #[serde(default = "default_reputation_timeout")]
    pub reputation: u32,
    #[serde(default = "default_news_timeout")]
    pub news_search: u32,
    #[serde(default = "default_adaptive_news_timeout")]
    pub adaptive_news_search: u32,
    #[serde(default = "default_risk_score_timeout")]
    pub risk_score: u32,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            whois: default_whois_timeout(),
            web_search: default_web_search_timeout(),
            reputation: default_reputation_timeout(),
            news_search: default_news_timeout(),
            adaptive_news_search: default_adaptive_news_timeout(),
            risk_score: default_risk_score_timeout(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
fn default_name() -> String {
    "deterministic".to_string()
}
fn default_supported_types() -> Vec<TargetType> {
    vec![TargetType::Domain, TargetType::Url, TargetType::Ip]
}
fn default_engines() -> Vec<String> {
    vec!["virustotal".to_string(), "safebrowsing".to_string()]
}
fn default_news_suffix() -> String {
    "scam OR complaints OR fraud".to_string()
}
fn default_web_results() -> u32 {
    3
}
fn default_web_results_demo() -> u32 {
    5
}
fn default_news_days() -> u32 {
    30
}
fn default_adaptive_news_days() -> u32 {
    90
}
fn default_aggregation() -> String {
    "weighted_average".to_string()
}
fn default_confidence_threshold() -> f64 {
    0.7
}
fn default_whois_timeout() -> u32 {
    30
}
fn default_web_search_timeout() -> u32 {
    15
}
fn default_reputation_timeout() -> u32 {
    20
}
fn default_news_timeout() -> u32 {
    25
}
fn default_adaptive_news_timeout() -> u32 {
    30
}
fn default_risk_score_timeout() -> u32 {
    5
}

/// Config validation error.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

fn err(errors: &mut Vec<ConfigError>, message: String) {
    errors.push(ConfigError { message });
}

/// Parse a planner config file from disk.
pub fn parse_config_file(path: &Path) -> Result<PlannerConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a planner config from a YAML string.
pub fn parse_config(yaml: &str) -> Result<PlannerConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed config. Returns every violation (empty = valid).
pub fn validate_config(config: &PlannerConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        err(
            &mut errors,
            format!("version must be \"1.0\", got \"{}\"", config.version),
        );
    }
    if config.name.trim().is_empty() {
        err(&mut errors, "name must not be empty".to_string());
    }

    if config.supported_types.is_empty() {
        err(&mut errors, "supported_types must not be empty".to_string());
    }
    for (i, t) in config.supported_types.iter().enumerate() {
        if config.supported_types[..i].contains(t) {
            err(&mut errors, format!("supported_types lists '{}' twice", t));
        }
        if *t == TargetType::Company {
            err(
                &mut errors,
                "the deterministic planner cannot plan 'company' targets".to_string(),
            );
        }
    }

    if config.reputation_engines.is_empty() {
        err(&mut errors, "reputation_engines must not be empty".to_string());
    }
    if config.reputation_engines.iter().any(|e| e.trim().is_empty()) {
        err(&mut errors, "reputation_engines contains an empty name".to_string());
    }
    if config.news_query_suffix.trim().is_empty() {
        err(&mut errors, "news_query_suffix must not be empty".to_string());
    }
    if config.web_results == 0 || config.web_results_demo == 0 {
        err(&mut errors, "web result counts must be positive".to_string());
    }
    if config.news_days_back == 0 {
        err(&mut errors, "news_days_back must be positive".to_string());
    }
    if config.adaptive_news_days_back < config.news_days_back {
        err(
            &mut errors,
            format!(
                "adaptive_news_days_back ({}) must not be shorter than news_days_back ({})",
                config.adaptive_news_days_back, config.news_days_back
            ),
        );
    }
    if config.aggregation_method.trim().is_empty() {
        err(&mut errors, "aggregation_method must not be empty".to_string());
    }
    if !(0.0..=1.0).contains(&config.confidence_threshold) {
        err(
            &mut errors,
            format!(
                "confidence_threshold must be within [0.0, 1.0], got {}",
                config.confidence_threshold
            ),
        );
    }

    let t = &config.timeouts;
    for (name, secs) in [
        ("whois", t.whois),
        ("web_search", t.web_search),
        ("reputation", t.reputation),
        ("news_search", t.news_search),
        ("adaptive_news_search", t.adaptive_news_search),
        ("risk_score", t.risk_score),
    ] {
        if secs == 0 {
            err(&mut errors, format!("timeouts.{} must be positive", name));
        }
    }

    errors
}

/// Render the default config as YAML, for `init`.
pub fn default_config_yaml() -> Result<String, String> {
    serde_yaml_ng::to_string(&PlannerConfig::default())
        .map_err(|e| format!("serialize error: {}", e))
}

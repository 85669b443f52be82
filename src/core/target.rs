//! Target normalization and type detection.
//!
//! Every downstream lookup uses `normalized_value`, so two spellings of the
//! same subject (`https://www.Example.COM/page`, `example.com`) must collapse
//! to one canonical form.

use super::error::ValidationError;
use super::types::{Params, TargetType};
use chrono::{DateTime, Utc};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::OnceLock;

/// A normalized investigation subject. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Target {
    /// Original user input, verbatim
    pub value: String,

    #[serde(rename = "type")]
    pub target_type: TargetType,

    /// Canonical form used by every lookup
    pub normalized_value: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Provenance notes; never interpreted by planners
    #[serde(default)]
    pub metadata: Params,
}

impl Target {
    /// Build a target, deriving `normalized_value` from `value` and `target_type`.
    pub fn new(value: impl Into<String>, target_type: TargetType) -> Result<Self, ValidationError> {
        let value = value.into();
        let normalized = normalize(&value, target_type)?;
        let mut metadata = Params::new();
        metadata.insert(
            "original_input".to_string(),
            serde_json::Value::String(value.clone()),
        );
        Ok(Self {
            value,
            target_type,
            normalized_value: normalized,
            created_at: Utc::now(),
            metadata,
        })
    }

    /// Build a target whose value was already normalized by an intake layer.
    pub fn with_normalized(
        value: impl Into<String>,
        target_type: TargetType,
        normalized_value: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let normalized_value = normalized_value.into();
        if normalized_value.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "normalized_value",
            });
        }
        Ok(Self {
            value: value.into(),
            target_type,
            normalized_value,
            created_at: Utc::now(),
            metadata: Params::new(),
        })
    }

    /// Infer the target type from raw input, then normalize.
    pub fn detect(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let target_type = detect_type(&value);
        Self::new(value, target_type)
    }

    /// Check invariants on a deserialized target.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.normalized_value.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "normalized_value",
            });
        }
        Ok(())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Target {}: {}>", self.target_type, self.normalized_value)
    }
}

fn hostname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z][a-z0-9-]{0,62}$")
            .expect("static hostname regex")
    })
}

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("static scheme regex"))
}

/// Guess the category of raw input.
pub fn detect_type(value: &str) -> TargetType {
    let trimmed = value.trim();
    if parse_ip(trimmed).is_some() {
        return TargetType::Ip;
    }
    if scheme_re().is_match(trimmed) {
        return TargetType::Url;
    }
    let host = extract_host(trimmed);
    if !host.contains(char::is_whitespace) && hostname_re().is_match(&host) {
        return TargetType::Domain;
    }
    TargetType::Company
}

/// Derive the canonical form for a value of the given type.
pub fn normalize(value: &str, target_type: TargetType) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field: "value" });
    }

    match target_type {
        TargetType::Domain | TargetType::Url => {
            let host = extract_host(trimmed);
            if let Some(ip) = parse_ip(&host) {
                return Ok(ip.to_string());
            }
            let host = match host.strip_prefix("www.") {
                Some(rest) if rest.contains('.') => rest,
                _ => host.as_str(),
            };
            if host.is_empty() || !hostname_re().is_match(host) {
                return Err(ValidationError::Invalid {
                    kind: "hostname",
                    value: trimmed.to_string(),
                });
            }
            Ok(host.to_string())
        }
        TargetType::Ip => parse_ip(trimmed)
            .map(|ip| ip.to_string())
            .ok_or_else(|| ValidationError::Invalid {
                kind: "IP address",
                value: trimmed.to_string(),
            }),
        TargetType::Company => Ok(trimmed
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()),
    }
}

/// Lower-cased host with scheme, credentials, port, path, query, fragment,
/// and trailing dot removed.
fn extract_host(input: &str) -> String {
    let rest = match scheme_re().find(input) {
        Some(m) => &input[m.end()..],
        None => input,
    };
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    // Bracketed IPv6 literals carry colons of their own.
    let host = match host_port.find(']') {
        Some(end) if host_port.starts_with('[') => &host_port[..=end],
        _ => host_port.split(':').next().unwrap_or_default(),
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn parse_ip(input: &str) -> Option<IpAddr> {
    let stripped = input
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(input);
    stripped.parse::<IpAddr>().ok()
}

//! Data contracts binding planner, executor, and scorer.
//!
//! Defines the shared enumerations plus `Step`, `Evidence`, and `RiskReport`.
//! All types derive Serialize/Deserialize for JSON/YAML interchange and
//! JsonSchema for contract export.

use super::error::ValidationError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structured arguments or metadata, order-preserving.
pub type Params = IndexMap<String, serde_json::Value>;

// ============================================================================
// Primitives
// ============================================================================

/// Capability names a plan may reference. The planner only names these;
/// the executor resolves them.
pub mod primitives {
    pub const WHOIS: &str = "whois";
    pub const WEB_SEARCH: &str = "web_search";
    pub const REPUTATION: &str = "reputation";
    pub const NEWS_SEARCH: &str = "news_search";
    /// Sentinel: aggregate all evidence now. Always the last step of a plan.
    pub const RISK_SCORE: &str = "risk_score";
}

// ============================================================================
// Enumerations
// ============================================================================

/// Investigation target category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Ip,
    Domain,
    Url,
    Company,
}

impl TargetType {
    pub const ALL: [TargetType; 4] = [Self::Ip, Self::Domain, Self::Url, Self::Company];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Domain => "domain",
            Self::Url => "url",
            Self::Company => "company",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| unknown_variant("target type", s, Self::ALL.map(|t| t.as_str())))
    }
}

/// Acquisition cost tier. Ordered: `Free < Basic < Premium`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    #[default]
    Free,
    Basic,
    Premium,
}

impl CostTier {
    pub const ALL: [CostTier; 3] = [Self::Free, Self::Basic, Self::Premium];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Premium => "premium",
        }
    }
}

impl fmt::Display for CostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| unknown_variant("cost tier", s, Self::ALL.map(|t| t.as_str())))
    }
}

/// Lifecycle status of an investigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Rejected,
    Failed,
}

impl InvestigationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Pending | Self::InProgress => false,
            Self::Completed | Self::Cancelled | Self::Rejected | Self::Failed => true,
        }
    }

    /// Allowed edges: `pending -> in_progress -> {completed, failed}` and
    /// `pending -> {cancelled, rejected}`.
    pub fn can_transition_to(&self, next: InvestigationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Cancelled)
                | (Self::Pending, Self::Rejected)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
        )
    }
}

impl fmt::Display for InvestigationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical bucket for aggregated risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Severity classifier carried by each risk indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

fn unknown_variant<const N: usize>(kind: &'static str, value: &str, expected: [&str; N]) -> ValidationError {
    ValidationError::UnknownVariant {
        kind,
        value: value.to_string(),
        expected: expected.join(", "),
    }
}

// ============================================================================
// Step
// ============================================================================

/// One atomic, plannable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Step {
    /// Unique within a plan; stable once assigned
    pub id: String,

    /// Capability to invoke (see [`primitives`])
    pub primitive: String,

    /// Arguments for the primitive
    #[serde(default)]
    pub params: Params,

    /// No ordering dependency on other not-yet-run steps
    #[serde(default)]
    pub parallel: bool,

    /// Human-readable description
    #[serde(default)]
    pub label: Option<String>,

    /// Advisory per-step deadline in seconds
    #[serde(default)]
    pub timeout_s: Option<u32>,

    /// Expected acquisition cost
    #[serde(default)]
    pub cost_tier: CostTier,
}

impl Step {
    pub fn new(id: impl Into<String>, primitive: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            primitive: primitive.into(),
            params: Params::new(),
            parallel: false,
            label: None,
            timeout_s: None,
            cost_tier: CostTier::Free,
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn timeout_s(mut self, secs: u32) -> Self {
        self.timeout_s = Some(secs);
        self
    }

    pub fn cost_tier(mut self, tier: CostTier) -> Self {
        self.cost_tier = tier;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Whether this is the aggregation barrier.
    pub fn is_terminal(&self) -> bool {
        self.primitive == primitives::RISK_SCORE
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Step {}: {} ({})>", self.id, self.primitive, self.cost_tier)
    }
}

// ============================================================================
// Evidence
// ============================================================================

/// A flagged signal inside a piece of evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskIndicator {
    /// Indicator name (e.g. "new_domain")
    #[serde(rename = "type", default)]
    pub indicator_type: Option<String>,

    pub severity: Severity,

    /// Human description
    #[serde(default)]
    pub detail: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_impact: Option<i32>,

    /// Source-specific extras, preserved verbatim
    #[serde(flatten)]
    pub extra: Params,
}

impl RiskIndicator {
    pub fn new(severity: Severity, detail: impl Into<String>) -> Self {
        Self {
            indicator_type: None,
            severity,
            detail: detail.into(),
            score_impact: None,
            extra: Params::new(),
        }
    }

    pub fn kind(mut self, indicator_type: impl Into<String>) -> Self {
        self.indicator_type = Some(indicator_type.into());
        self
    }
}

/// Outcome of executing one step. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Evidence {
    /// Primitive that produced it
    pub source: String,

    /// Originating step (lookup/audit only)
    #[serde(default)]
    pub step_id: Option<String>,

    /// Canonical value this evidence concerns
    pub target_value: String,

    /// Parsed result; the only field scoring may consume
    #[serde(default)]
    pub data: serde_json::Value,

    /// Flagged signals; these drive adaptation
    #[serde(default)]
    pub risk_indicators: Vec<RiskIndicator>,

    /// In [0.0, 1.0]
    pub confidence: f64,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub cost_tier: CostTier,

    /// Unparsed source output, audit only
    #[serde(default)]
    pub raw_response: String,
}

impl Evidence {
    pub fn new(
        source: impl Into<String>,
        target_value: impl Into<String>,
        confidence: f64,
    ) -> Result<Self, ValidationError> {
        let evidence = Self {
            source: source.into(),
            step_id: None,
            target_value: target_value.into(),
            data: serde_json::Value::Object(serde_json::Map::new()),
            risk_indicators: Vec::new(),
            confidence,
            timestamp: Utc::now(),
            cost_tier: CostTier::Free,
            raw_response: String::new(),
        };
        evidence.validate()?;
        Ok(evidence)
    }

    pub fn step_id(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn indicator(mut self, indicator: RiskIndicator) -> Self {
        self.risk_indicators.push(indicator);
        self
    }

    pub fn cost_tier(mut self, tier: CostTier) -> Self {
        self.cost_tier = tier;
        self
    }

    pub fn raw_response(mut self, raw: impl Into<String>) -> Self {
        self.raw_response = raw.into();
        self
    }

    /// Re-check field ranges. Deserialized evidence must pass this before use.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source.trim().is_empty() {
            return Err(ValidationError::Empty { field: "source" });
        }
        if self.target_value.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "target_value",
            });
        }
        check_unit_interval("confidence", self.confidence)
    }

    /// Whether any indicator is flagged high severity.
    pub fn has_high_severity(&self) -> bool {
        self.risk_indicators
            .iter()
            .any(|i| i.severity == Severity::High)
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Evidence {} for {} (confidence={:.2})>",
            self.source, self.target_value, self.confidence
        )
    }
}

// ============================================================================
// Risk report
// ============================================================================

/// Composite assessment emitted by the scorer. Constructed outside this
/// crate; the shape is validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskReport {
    pub target_value: String,

    /// Composite score, 0 (low) to 100 (high)
    pub score: u8,

    pub level: RiskLevel,

    /// In [0.0, 1.0]
    pub confidence: f64,

    pub explanation: String,

    #[serde(default)]
    pub evidence_summary: Vec<String>,

    #[serde(default)]
    pub recommended_actions: Vec<String>,

    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,

    /// Back-reference to the owning investigation
    pub investigation_id: String,

    #[serde(default)]
    pub metadata: Params,
}

impl RiskReport {
    pub fn new(
        investigation_id: impl Into<String>,
        target_value: impl Into<String>,
        score: u8,
        level: RiskLevel,
        confidence: f64,
        explanation: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let report = Self {
            target_value: target_value.into(),
            score,
            level,
            confidence,
            explanation: explanation.into(),
            evidence_summary: Vec::new(),
            recommended_actions: Vec::new(),
            generated_at: Utc::now(),
            investigation_id: investigation_id.into(),
            metadata: Params::new(),
        };
        report.validate()?;
        Ok(report)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.score > 100 {
            return Err(ValidationError::OutOfRange {
                field: "score",
                min: "0".to_string(),
                max: "100".to_string(),
                value: self.score.to_string(),
            });
        }
        if self.investigation_id.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "investigation_id",
            });
        }
        check_unit_interval("confidence", self.confidence)
    }
}

impl fmt::Display for RiskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<RiskReport target={} score={} level={}>",
            self.target_value, self.score, self.level
        )
    }
}

/// NaN fails this check as well.
pub(crate) fn check_unit_interval(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: "0.0".to_string(),
            max: "1.0".to_string(),
            value: value.to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_target_type_parse() {
        assert_eq!("domain".parse::<TargetType>().unwrap(), TargetType::Domain);
        assert_eq!(" IP ".parse::<TargetType>().unwrap(), TargetType::Ip);
        let err = "host".parse::<TargetType>().unwrap_err();
        assert!(err.to_string().contains("ip, domain, url, company"));
    }

    #[test]
    fn test_types_cost_tier_ordering() {
        assert!(CostTier::Free < CostTier::Basic);
        assert!(CostTier::Basic < CostTier::Premium);
        assert_eq!(CostTier::default(), CostTier::Free);
        assert_eq!("premium".parse::<CostTier>().unwrap(), CostTier::Premium);
        assert!("gold".parse::<CostTier>().is_err());
    }

    #[test]
    fn test_types_status_transitions() {
        use InvestigationStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Cancelled));
        for terminal in [Completed, Cancelled, Rejected, Failed] {
            assert!(terminal.is_terminal());
            for next in [Pending, InProgress, Completed, Cancelled, Rejected, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_types_step_builder_and_display() {
        let step = Step::new("step_domain_001", primitives::WHOIS)
            .param("domain", "example.com")
            .label("WHOIS Domain Lookup")
            .timeout_s(30);
        assert_eq!(step.params["domain"], "example.com");
        assert!(!step.parallel);
        assert!(!step.is_terminal());
        assert_eq!(step.to_string(), "<Step step_domain_001: whois (free)>");
    }

    #[test]
    fn test_types_step_serde_defaults() {
        let step: Step =
            serde_json::from_str(r#"{"id": "s1", "primitive": "risk_score"}"#).unwrap();
        assert!(step.is_terminal());
        assert_eq!(step.cost_tier, CostTier::Free);
        assert!(step.params.is_empty());
        assert_eq!(step.timeout_s, None);
    }

    #[test]
    fn test_types_evidence_confidence_range() {
        assert!(Evidence::new("whois", "example.com", 0.95).is_ok());
        assert!(Evidence::new("whois", "example.com", 1.0).is_ok());
        let err = Evidence::new("whois", "example.com", 1.5).unwrap_err();
        assert!(err.to_string().contains("confidence"));
        assert!(Evidence::new("whois", "example.com", f64::NAN).is_err());
        assert!(Evidence::new("", "example.com", 0.5).is_err());
    }

    #[test]
    fn test_types_evidence_from_json() {
        let json = r#"{
            "source": "whois",
            "step_id": "step_domain_001",
            "target_value": "suspicious-deals.com",
            "data": {"registrar": "Namecheap Inc."},
            "risk_indicators": [
                {"type": "new_domain", "severity": "high", "detail": "Domain registered 5 days ago", "score_impact": 25}
            ],
            "confidence": 0.95,
            "timestamp": "2025-01-15T10:05:30Z",
            "cost_tier": "free"
        }"#;
        let ev: Evidence = serde_json::from_str(json).unwrap();
        assert!(ev.validate().is_ok());
        assert!(ev.has_high_severity());
        assert_eq!(ev.risk_indicators[0].indicator_type.as_deref(), Some("new_domain"));
        assert_eq!(ev.risk_indicators[0].score_impact, Some(25));
        assert_eq!(
            ev.to_string(),
            "<Evidence whois for suspicious-deals.com (confidence=0.95)>"
        );
    }

    #[test]
    fn test_types_indicator_unknown_severity_rejected() {
        let json = r#"{"severity": "extreme", "detail": "x"}"#;
        assert!(serde_json::from_str::<RiskIndicator>(json).is_err());
    }

    #[test]
    fn test_types_indicator_extra_fields_kept() {
        let json = r#"{"severity": "low", "detail": "x", "engine": "virustotal"}"#;
        let ind: RiskIndicator = serde_json::from_str(json).unwrap();
        assert_eq!(ind.extra["engine"], "virustotal");
    }

    #[test]
    fn test_types_risk_report_validation() {
        let report =
            RiskReport::new("inv_1", "sketchy-site.com", 85, RiskLevel::High, 0.92, "new domain")
                .unwrap();
        assert_eq!(
            report.to_string(),
            "<RiskReport target=sketchy-site.com score=85 level=high>"
        );
        assert!(RiskReport::new("inv_1", "x", 101, RiskLevel::Critical, 0.5, "").is_err());
        assert!(RiskReport::new("inv_1", "x", 50, RiskLevel::Medium, -0.1, "").is_err());
        assert!(RiskReport::new("", "x", 50, RiskLevel::Medium, 0.5, "").is_err());
    }

    #[test]
    fn test_types_enum_serde_names() {
        assert_eq!(
            serde_json::to_string(&InvestigationStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(serde_json::to_string(&TargetType::Url).unwrap(), "\"url\"");
        assert_eq!(serde_json::to_string(&RiskLevel::Critical).unwrap(), "\"critical\"");
    }
}

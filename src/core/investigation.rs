//! Investigation aggregate root and its lifecycle state machine.
//!
//! `pending -> in_progress -> {completed, failed}`, `pending -> {cancelled, rejected}`.
//! `completed_at` is set exactly when the status becomes terminal.

use super::error::ValidationError;
use super::target::Target;
use super::types::{CostTier, Evidence, InvestigationStatus, Params, RiskReport, Step};
use crate::planning::{validate_plan, PlanContext};
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-supplied budget and timeout knobs. Read-only to planners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvestigationSettings {
    /// Highest cost tier any planned step may carry
    #[serde(default)]
    pub max_cost_tier: Option<CostTier>,

    /// Overall deadline in seconds, enforced by the orchestrator
    #[serde(default)]
    pub timeout_total_s: Option<u64>,

    #[serde(flatten)]
    pub extra: Params,
}

/// One investigation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Investigation {
    pub id: String,

    pub target: Target,

    pub status: InvestigationStatus,

    /// Current ordered plan
    #[serde(default)]
    pub plan: Vec<Step>,

    /// Append-only
    #[serde(default)]
    pub evidence_collected: Vec<Evidence>,

    #[serde(default = "Utc::now")]
    pub started_at: DateTime<Utc>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub demo_mode: bool,

    #[serde(default)]
    pub settings: InvestigationSettings,

    /// Produced by the scorer on completion
    #[serde(default)]
    pub report: Option<RiskReport>,

    /// Recorded cause for `failed` or `rejected`
    #[serde(default)]
    pub failure_reason: Option<String>,

    /// Step ids from replaced plan versions. Not persisted; the current
    /// plan is always consulted as well.
    #[serde(skip)]
    known_step_ids: IndexSet<String>,
}

impl Investigation {
    pub fn new(target: Target, demo_mode: bool, settings: InvestigationSettings) -> Self {
        Self {
            id: format!("inv_{}", uuid::Uuid::new_v4().simple()),
            target,
            status: InvestigationStatus::Pending,
            plan: Vec::new(),
            evidence_collected: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            demo_mode,
            settings,
            report: None,
            failure_reason: None,
            known_step_ids: IndexSet::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Planner context derived from the investigation's own flags.
    pub fn plan_context(&self) -> PlanContext {
        PlanContext {
            demo: self.demo_mode,
            max_cost_tier: self.settings.max_cost_tier,
            ..PlanContext::default()
        }
    }

    /// Install the initial plan and begin execution.
    pub fn start(&mut self, plan: Vec<Step>) -> Result<(), ValidationError> {
        check_plan(&plan)?;
        self.transition(InvestigationStatus::InProgress)?;
        self.install_plan(plan);
        Ok(())
    }

    /// Replace the plan with an adapted version. Only while in progress.
    pub fn replace_plan(&mut self, plan: Vec<Step>) -> Result<(), ValidationError> {
        self.require_in_progress("replace the plan")?;
        check_plan(&plan)?;
        self.install_plan(plan);
        Ok(())
    }

    /// Append evidence. Its `step_id`, when present, must name a step from
    /// some version of the plan.
    pub fn record_evidence(&mut self, evidence: Evidence) -> Result<(), ValidationError> {
        self.require_in_progress("record evidence")?;
        evidence.validate()?;
        if let Some(ref step_id) = evidence.step_id {
            if !self.knows_step(step_id) {
                return Err(ValidationError::Constraint(format!(
                    "evidence references step '{}' which never appeared in the plan",
                    step_id
                )));
            }
        }
        if evidence.target_value != self.target.normalized_value {
            tracing::warn!(
                investigation = %self.id,
                evidence_target = %evidence.target_value,
                "evidence concerns a different value than the investigation target"
            );
        }
        self.evidence_collected.push(evidence);
        Ok(())
    }

    /// Finish with the scorer's report.
    pub fn complete(&mut self, report: RiskReport) -> Result<(), ValidationError> {
        report.validate()?;
        if report.investigation_id != self.id {
            return Err(ValidationError::Constraint(format!(
                "report belongs to investigation '{}', not '{}'",
                report.investigation_id, self.id
            )));
        }
        self.transition(InvestigationStatus::Completed)?;
        self.report = Some(report);
        Ok(())
    }

    pub fn fail(&mut self, cause: impl Into<String>) -> Result<(), ValidationError> {
        let cause = cause.into();
        if cause.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "failure cause",
            });
        }
        self.transition(InvestigationStatus::Failed)?;
        self.failure_reason = Some(cause);
        Ok(())
    }

    /// Reject before any step executes (e.g. unsupported target type).
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), ValidationError> {
        self.transition(InvestigationStatus::Rejected)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), ValidationError> {
        self.transition(InvestigationStatus::Cancelled)
    }

    /// Whether `step_id` appeared in any plan version.
    pub fn knows_step(&self, step_id: &str) -> bool {
        self.known_step_ids.contains(step_id) || self.plan.iter().any(|s| s.id == step_id)
    }

    fn install_plan(&mut self, plan: Vec<Step>) {
        for step in &plan {
            self.known_step_ids.insert(step.id.clone());
        }
        self.plan = plan;
    }

    fn require_in_progress(&self, action: &str) -> Result<(), ValidationError> {
        if self.status == InvestigationStatus::InProgress {
            Ok(())
        } else {
            Err(ValidationError::Constraint(format!(
                "cannot {} while investigation is {}",
                action, self.status
            )))
        }
    }

    fn transition(&mut self, next: InvestigationStatus) -> Result<(), ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError::IllegalTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(investigation = %self.id, from = %self.status, to = %next, "status transition");
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

fn check_plan(plan: &[Step]) -> Result<(), ValidationError> {
    validate_plan(plan).map_err(|e| ValidationError::Constraint(e.to_string()))
}

impl fmt::Display for Investigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Investigation {} status={}>", self.id, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{primitives, RiskLevel};

    fn make_investigation() -> Investigation {
        let target = Target::new("example.com", crate::core::types::TargetType::Domain).unwrap();
        Investigation::new(target, false, InvestigationSettings::default())
    }

    fn make_plan() -> Vec<Step> {
        vec![
            Step::new("step_domain_001", primitives::WHOIS),
            Step::new("step_domain_002", primitives::RISK_SCORE),
        ]
    }

    #[test]
    fn test_investigation_new_is_pending() {
        let inv = make_investigation();
        assert_eq!(inv.status, InvestigationStatus::Pending);
        assert!(inv.id.starts_with("inv_"));
        assert!(inv.completed_at.is_none());
        assert!(inv.to_string().contains("status=pending"));
    }

    #[test]
    fn test_investigation_happy_path() {
        let mut inv = make_investigation();
        inv.start(make_plan()).unwrap();
        assert_eq!(inv.status, InvestigationStatus::InProgress);
        assert!(inv.completed_at.is_none());

        let ev = Evidence::new("whois", "example.com", 0.9)
            .unwrap()
            .step_id("step_domain_001");
        inv.record_evidence(ev).unwrap();
        assert_eq!(inv.evidence_collected.len(), 1);

        let report =
            RiskReport::new(inv.id.clone(), "example.com", 10, RiskLevel::Low, 0.8, "clean")
                .unwrap();
        inv.complete(report).unwrap();
        assert_eq!(inv.status, InvestigationStatus::Completed);
        assert!(inv.completed_at.is_some());
        assert!(inv.report.is_some());
    }

    #[test]
    fn test_investigation_rejects_unknown_step_evidence() {
        let mut inv = make_investigation();
        inv.start(make_plan()).unwrap();
        let ev = Evidence::new("whois", "example.com", 0.9)
            .unwrap()
            .step_id("step_ghost_001");
        assert!(inv.record_evidence(ev).is_err());
        assert!(inv.evidence_collected.is_empty());
    }

    #[test]
    fn test_investigation_replaced_plan_keeps_old_ids_known() {
        let mut inv = make_investigation();
        inv.start(make_plan()).unwrap();
        inv.replace_plan(vec![Step::new("step_other_001", primitives::RISK_SCORE)])
            .unwrap();
        assert!(inv.knows_step("step_domain_001"));
        assert!(inv.knows_step("step_other_001"));
        let ev = Evidence::new("whois", "example.com", 0.5)
            .unwrap()
            .step_id("step_domain_001");
        assert!(inv.record_evidence(ev).is_ok());
    }

    #[test]
    fn test_investigation_complete_requires_in_progress() {
        let mut inv = make_investigation();
        let report =
            RiskReport::new(inv.id.clone(), "example.com", 10, RiskLevel::Low, 0.8, "x").unwrap();
        let err = inv.complete(report).unwrap_err();
        assert!(matches!(err, ValidationError::IllegalTransition { .. }));
    }

    #[test]
    fn test_investigation_complete_checks_back_reference() {
        let mut inv = make_investigation();
        inv.start(make_plan()).unwrap();
        let report =
            RiskReport::new("inv_other", "example.com", 10, RiskLevel::Low, 0.8, "x").unwrap();
        assert!(inv.complete(report).is_err());
        assert_eq!(inv.status, InvestigationStatus::InProgress);
    }

    #[test]
    fn test_investigation_fail_records_cause() {
        let mut inv = make_investigation();
        inv.start(make_plan()).unwrap();
        assert!(inv.fail("  ").is_err());
        inv.fail("executor crashed").unwrap();
        assert_eq!(inv.status, InvestigationStatus::Failed);
        assert_eq!(inv.failure_reason.as_deref(), Some("executor crashed"));
        assert!(inv.completed_at.is_some());
    }

    #[test]
    fn test_investigation_reject_and_cancel_only_from_pending() {
        let mut inv = make_investigation();
        inv.reject("unsupported target type").unwrap();
        assert_eq!(inv.status, InvestigationStatus::Rejected);
        assert!(inv.is_terminal());
        assert!(inv.cancel().is_err());
        assert!(inv.start(make_plan()).is_err());

        let mut inv = make_investigation();
        inv.start(make_plan()).unwrap();
        assert!(inv.cancel().is_err());
        assert!(inv.reject("late").is_err());
    }

    #[test]
    fn test_investigation_terminal_iff_completed_at() {
        let mut inv = make_investigation();
        inv.cancel().unwrap();
        assert!(inv.is_terminal());
        assert!(inv.completed_at.is_some());
    }

    #[test]
    fn test_investigation_plan_context_from_settings() {
        let target = Target::new("example.com", crate::core::types::TargetType::Domain).unwrap();
        let settings = InvestigationSettings {
            max_cost_tier: Some(CostTier::Free),
            ..Default::default()
        };
        let inv = Investigation::new(target, true, settings);
        let ctx = inv.plan_context();
        assert!(ctx.demo);
        assert!(!ctx.include_news);
        assert_eq!(ctx.max_cost_tier, Some(CostTier::Free));
    }

    #[test]
    fn test_investigation_rejects_malformed_plans() {
        let mut inv = make_investigation();
        let err = inv.start(vec![Step::new("a", primitives::WHOIS)]).unwrap_err();
        assert!(err.to_string().contains("malformed plan"));
        assert!(inv.start(Vec::new()).is_err());
        assert_eq!(inv.status, InvestigationStatus::Pending);

        inv.start(make_plan()).unwrap();
        assert!(inv.replace_plan(Vec::new()).is_err());
        assert!(inv
            .replace_plan(vec![
                Step::new("x", primitives::RISK_SCORE),
                Step::new("y", primitives::WHOIS),
            ])
            .is_err());
        assert_eq!(inv.plan, make_plan());
    }

    #[test]
    fn test_investigation_deserialized_accepts_current_plan_evidence() {
        let mut inv = make_investigation();
        inv.start(make_plan()).unwrap();
        let json = serde_json::to_string(&inv).unwrap();
        assert!(!json.contains("known_step_ids"));

        let mut restored: Investigation = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.status, InvestigationStatus::InProgress);
        let ev = Evidence::new("whois", "example.com", 0.9)
            .unwrap()
            .step_id("step_domain_001");
        restored.record_evidence(ev).unwrap();
        assert!(restored.knows_step("step_domain_002"));
        assert!(!restored.knows_step("step_ghost_001"));
    }

    #[test]
    fn test_investigation_evidence_requires_started() {
        let mut inv = make_investigation();
        let ev = Evidence::new("whois", "example.com", 0.9).unwrap();
        assert!(inv.record_evidence(ev).is_err());
    }
}

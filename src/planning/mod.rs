//! Planner contract: the capability every planning strategy implements.
//!
//! A planner turns a [`Target`] into an ordered plan of [`Step`]s and mutates
//! that plan as [`Evidence`] arrives. Both operations are pure functions of
//! their arguments; planners hold only immutable configuration, so one
//! instance may serve many investigations concurrently.
//!
//! Plan invariants checked by [`validate_plan`]:
//! - at least one step, every id non-empty and unique within the plan
//! - exactly one `risk_score` step, and it is the last element

pub mod budget;
pub mod config;
pub mod deterministic;
pub mod digest;
pub mod schedule;

use crate::core::types::{primitives, CostTier, Evidence, Params, Step, TargetType};
use crate::core::{PlanningError, Target};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use budget::BudgetedPlanner;
pub use config::PlannerConfig;
pub use deterministic::DeterministicPlanner;

/// Planning strategy: deterministic, learned, or anything else satisfying
/// the plan invariants.
pub trait Planner: Send + Sync {
    /// Short name used in error messages and logs.
    fn name(&self) -> &str;

    /// Target types this planner accepts, in display order.
    fn supported_types(&self) -> &[TargetType];

    /// Produce a baseline plan for `target`.
    fn create_plan(&self, target: &Target, context: &PlanContext) -> Result<Vec<Step>, PlanningError>;

    /// Return a new plan given the evidence gathered so far. Must be
    /// idempotent, never remove or reorder the terminal step, and return the
    /// input unchanged (by value) when no adaptation applies.
    fn adapt_plan(&self, current_plan: &[Step], evidence: &[Evidence]) -> Result<Vec<Step>, PlanningError>;

    /// Fail fast on a target type outside [`Planner::supported_types`].
    fn check_supported(&self, target: &Target) -> Result<(), PlanningError> {
        if self.supported_types().contains(&target.target_type) {
            return Ok(());
        }
        Err(PlanningError::UnsupportedTargetType {
            planner: self.name().to_string(),
            target_type: target.target_type,
            supported: self.supported_types().to_vec(),
        })
    }
}

// ============================================================================
// Context
// ============================================================================

/// Recognized planning options. Unknown keys from the free-form map are kept
/// in `extra` and ignored by the reference planner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanContext {
    /// Richer, slower plans
    #[serde(default)]
    pub demo: bool,

    /// Add the baseline news search outside demo mode
    #[serde(default)]
    pub include_news: bool,

    /// Highest cost tier a planned step may carry
    #[serde(default)]
    pub max_cost_tier: Option<CostTier>,

    #[serde(default)]
    pub extra: Params,
}

impl PlanContext {
    /// Parse the free-form configuration map. Wrong value types are an
    /// `InvalidContext` error rather than a silent default.
    pub fn from_map(map: &Params) -> Result<Self, PlanningError> {
        let mut ctx = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "demo" => ctx.demo = expect_bool(key, value)?,
                "include_news" | "includeNews" => ctx.include_news = expect_bool(key, value)?,
                "max_cost_tier" | "maxCostTier" => {
                    ctx.max_cost_tier = match value {
                        serde_json::Value::Null => None,
                        serde_json::Value::String(s) => {
                            Some(s.parse::<CostTier>().map_err(|e| {
                                PlanningError::InvalidContext {
                                    key: key.clone(),
                                    reason: e.to_string(),
                                }
                            })?)
                        }
                        other => {
                            return Err(PlanningError::InvalidContext {
                                key: key.clone(),
                                reason: format!("expected a cost tier name, got {}", other),
                            })
                        }
                    }
                }
                _ => {
                    ctx.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(ctx)
    }

    pub fn demo(mut self, demo: bool) -> Self {
        self.demo = demo;
        self
    }

    pub fn include_news(mut self, include_news: bool) -> Self {
        self.include_news = include_news;
        self
    }

    pub fn max_cost_tier(mut self, tier: CostTier) -> Self {
        self.max_cost_tier = Some(tier);
        self
    }

    /// Whether a step of `tier` fits the declared budget.
    pub fn allows(&self, tier: CostTier) -> bool {
        self.max_cost_tier.is_none_or(|max| tier <= max)
    }
}

fn expect_bool(key: &str, value: &serde_json::Value) -> Result<bool, PlanningError> {
    match value {
        serde_json::Value::Bool(b) => Ok(*b),
        serde_json::Value::Null => Ok(false),
        other => Err(PlanningError::InvalidContext {
            key: key.to_string(),
            reason: format!("expected a boolean, got {}", other),
        }),
    }
}

// ============================================================================
// Invariant checks shared by every planner
// ============================================================================

/// Check the structural plan invariants.
pub fn validate_plan(plan: &[Step]) -> Result<(), PlanningError> {
    let Some(last) = plan.last() else {
        return Err(PlanningError::MalformedPlan("plan has no steps".to_string()));
    };

    let mut seen = HashSet::new();
    for step in plan {
        if step.id.trim().is_empty() {
            return Err(PlanningError::MalformedPlan(format!(
                "step '{}' has an empty id",
                step.primitive
            )));
        }
        if !seen.insert(step.id.as_str()) {
            return Err(PlanningError::MalformedPlan(format!(
                "duplicate step id '{}'",
                step.id
            )));
        }
    }

    if !last.is_terminal() {
        return Err(PlanningError::MalformedPlan(format!(
            "last step must be '{}', found '{}'",
            primitives::RISK_SCORE,
            last.primitive
        )));
    }
    let terminal_count = plan.iter().filter(|s| s.is_terminal()).count();
    if terminal_count != 1 {
        return Err(PlanningError::MalformedPlan(format!(
            "expected exactly one '{}' step, found {}",
            primitives::RISK_SCORE,
            terminal_count
        )));
    }
    Ok(())
}

/// Reject any step above `max`. Over-budget steps are an error, never
/// silently dropped.
pub fn enforce_budget(plan: &[Step], max: Option<CostTier>) -> Result<(), PlanningError> {
    let Some(max) = max else {
        return Ok(());
    };
    match plan.iter().find(|s| s.cost_tier > max) {
        Some(step) => Err(PlanningError::BudgetExceeded {
            step_id: step.id.clone(),
            tier: step.cost_tier,
            max,
        }),
        None => Ok(()),
    }
}

/// Check evidence fields and that every `step_id` names a step in `plan`.
pub fn validate_evidence(plan: &[Step], evidence: &[Evidence]) -> Result<(), PlanningError> {
    for ev in evidence {
        ev.validate()
            .map_err(|e| PlanningError::InvalidEvidence(format!("{}: {}", ev.source, e)))?;
        if let Some(ref step_id) = ev.step_id {
            if !plan.iter().any(|s| &s.id == step_id) {
                return Err(PlanningError::UnknownStep {
                    step_id: step_id.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Position of the terminal `risk_score` step.
pub fn terminal_index(plan: &[Step]) -> Option<usize> {
    plan.iter().position(|s| s.is_terminal())
}

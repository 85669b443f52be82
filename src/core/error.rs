//! Error taxonomy: planning failures and construction-time validation.

use super::types::{CostTier, TargetType};
use thiserror::Error;

/// Field-level validation failure raised while constructing a domain record
/// or driving the investigation state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        min: String,
        max: String,
        value: String,
    },

    #[error("'{value}' is not a valid {kind}")]
    Invalid { kind: &'static str, value: String },

    #[error("unknown {kind} '{value}' (expected one of: {expected})")]
    UnknownVariant {
        kind: &'static str,
        value: String,
        expected: String,
    },

    #[error("illegal investigation transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("{0}")]
    Constraint(String),
}

/// The only error kind a planner raises.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    #[error("planner '{planner}' doesn't support target type: {target_type}. Supported types: {}", join_types(.supported))]
    UnsupportedTargetType {
        planner: String,
        target_type: TargetType,
        supported: Vec<TargetType>,
    },

    #[error("invalid context option '{key}': {reason}")]
    InvalidContext { key: String, reason: String },

    #[error("evidence references unknown step '{step_id}'")]
    UnknownStep { step_id: String },

    #[error("invalid evidence: {0}")]
    InvalidEvidence(String),

    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    #[error("step '{step_id}' requires {tier} tier, exceeding the declared maximum '{max}'")]
    BudgetExceeded {
        step_id: String,
        tier: CostTier,
        max: CostTier,
    },

    #[error("invalid target: {0}")]
    InvalidTarget(String),
}

impl PlanningError {
    /// Whether the failure stems from bad caller input. Orchestrators map these
    /// to `rejected`; everything else maps to `failed`.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedTargetType { .. } | Self::InvalidContext { .. } | Self::InvalidTarget(_)
        )
    }
}

impl From<ValidationError> for PlanningError {
    fn from(e: ValidationError) -> Self {
        Self::InvalidTarget(e.to_string())
    }
}

fn join_types(types: &[TargetType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

//! Domain model: targets, steps, evidence, investigations, reports, errors.

pub mod error;
pub mod investigation;
pub mod target;
pub mod types;

pub use error::{PlanningError, ValidationError};
pub use investigation::{Investigation, InvestigationSettings};
pub use target::Target;
pub use types::{
    primitives, CostTier, Evidence, InvestigationStatus, Params, RiskIndicator, RiskLevel,
    RiskReport, Severity, Step, TargetType,
};

//! Cost ceiling for any planner.
//!
//! Replacement planners (learned, LLM-backed) may propose premium steps.
//! Wrapping them in `BudgetedPlanner` turns every over-budget proposal into a
//! `BudgetExceeded` error instead of letting it reach the executor.

use super::{enforce_budget, PlanContext, Planner};
use crate::core::types::{CostTier, Evidence, Step, TargetType};
use crate::core::{PlanningError, Target};
use tracing::warn;

/// Enforces `max_cost_tier` on every plan the inner planner returns.
#[derive(Debug, Clone)]
pub struct BudgetedPlanner<P> {
    inner: P,
    max: CostTier,
}

impl<P: Planner> BudgetedPlanner<P> {
    pub fn new(inner: P, max: CostTier) -> Self {
        Self { inner, max }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn max_cost_tier(&self) -> CostTier {
        self.max
    }

    /// The tighter of the wrapper ceiling and the caller's declared ceiling.
    fn effective_max(&self, context: &PlanContext) -> CostTier {
        context
            .max_cost_tier
            .map_or(self.max, |declared| declared.min(self.max))
    }

    fn check(&self, plan: Vec<Step>, max: CostTier) -> Result<Vec<Step>, PlanningError> {
        if let Err(e) = enforce_budget(&plan, Some(max)) {
            warn!(planner = self.inner.name(), error = %e, "plan rejected by budget");
            return Err(e);
        }
        Ok(plan)
    }
}

impl<P: Planner> Planner for BudgetedPlanner<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supported_types(&self) -> &[TargetType] {
        self.inner.supported_types()
    }

    fn create_plan(&self, target: &Target, context: &PlanContext) -> Result<Vec<Step>, PlanningError> {
        let max = self.effective_max(context);
        let mut bounded = context.clone();
        bounded.max_cost_tier = Some(max);
        let plan = self.inner.create_plan(target, &bounded)?;
        self.check(plan, max)
    }

    fn adapt_plan(&self, current_plan: &[Step], evidence: &[Evidence]) -> Result<Vec<Step>, PlanningError> {
        let plan = self.inner.adapt_plan(current_plan, evidence)?;
        self.check(plan, self.max)
    }
}

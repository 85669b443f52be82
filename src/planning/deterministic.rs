//! Deterministic reference planner.
//!
//! Baseline plan per target:
//!
//! ```text
//! whois        (domain/url only)   free    serial
//! web_search                       free    parallel
//! reputation                       free    parallel
//! news_search  (demo/include_news) basic   serial
//! risk_score                       free    terminal barrier
//! ```
//!
//! Ids are `step_<type>_<NNN>`, 1-based and zero-padded. Adaptation inserts a
//! deeper `news_search` ahead of `risk_score` once any evidence carries a
//! high-severity indicator, and never more than one news step per plan.

use super::config::PlannerConfig;
use super::{terminal_index, validate_evidence, validate_plan, PlanContext, Planner};
use crate::core::types::{primitives, CostTier, Evidence, Step, TargetType};
use crate::core::{PlanningError, Target};
use tracing::{debug, info, warn};

/// Fixed-rule planner. Holds only its immutable config.
#[derive(Debug, Clone, Default)]
pub struct DeterministicPlanner {
    config: PlannerConfig,
}

impl DeterministicPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn news_query(&self, value: &str) -> String {
        format!("{} {}", value, self.config.news_query_suffix)
    }
}

/// Sequential id allocation within one plan.
struct StepIds {
    prefix: TargetType,
    next: u32,
}

impl StepIds {
    fn new(prefix: TargetType) -> Self {
        Self { prefix, next: 1 }
    }

    fn next(&mut self) -> String {
        let id = format!("step_{}_{:03}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// `step_adaptive_<NNN>` numbered from the plan length, skipping ids the
/// plan already uses.
fn adaptive_id(plan: &[Step]) -> String {
    (plan.len()..)
        .map(|n| format!("step_adaptive_{:03}", n))
        .find(|id| !plan.iter().any(|s| &s.id == id))
        .unwrap_or_default()
}

impl Planner for DeterministicPlanner {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn supported_types(&self) -> &[TargetType] {
        &self.config.supported_types
    }

    fn create_plan(&self, target: &Target, context: &PlanContext) -> Result<Vec<Step>, PlanningError> {
        self.check_supported(target)?;
        target.validate()?;

        let cfg = &self.config;
        let value = target.normalized_value.as_str();
        let mut ids = StepIds::new(target.target_type);
        let mut steps = Vec::new();

        if matches!(target.target_type, TargetType::Domain | TargetType::Url) {
            steps.push(
                Step::new(ids.next(), primitives::WHOIS)
                    .param("domain", value)
                    .label("WHOIS Domain Lookup")
                    .cost_tier(CostTier::Free)
                    .timeout_s(cfg.timeouts.whois),
            );
        }

        let max_results = if context.demo {
            cfg.web_results_demo
        } else {
            cfg.web_results
        };
        steps.push(
            Step::new(ids.next(), primitives::WEB_SEARCH)
                .param("query", value)
                .param("max_results", max_results)
                .label("Web Search")
                .cost_tier(CostTier::Free)
                .timeout_s(cfg.timeouts.web_search)
                .parallel(true),
        );

        steps.push(
            Step::new(ids.next(), primitives::REPUTATION)
                .param("target", value)
                .param("engines", cfg.reputation_engines.clone())
                .label("Reputation Check")
                .cost_tier(CostTier::Free)
                .timeout_s(cfg.timeouts.reputation)
                .parallel(true),
        );

        if context.demo || context.include_news {
            if context.allows(CostTier::Basic) {
                steps.push(
                    Step::new(ids.next(), primitives::NEWS_SEARCH)
                        .param("query", self.news_query(value))
                        .param("days_back", cfg.news_days_back)
                        .label("News & Complaint Search")
                        .cost_tier(CostTier::Basic)
                        .timeout_s(cfg.timeouts.news_search),
                );
            } else {
                warn!(
                    value = %target.normalized_value,
                    max_cost_tier = ?context.max_cost_tier,
                    "news search requested but exceeds the declared cost tier; omitting it"
                );
            }
        }

        steps.push(
            Step::new(ids.next(), primitives::RISK_SCORE)
                .param("aggregation_method", cfg.aggregation_method.as_str())
                .param("confidence_threshold", cfg.confidence_threshold)
                .label("Risk Assessment")
                .cost_tier(CostTier::Free)
                .timeout_s(cfg.timeouts.risk_score),
        );

        validate_plan(&steps)?;
        super::enforce_budget(&steps, context.max_cost_tier)?;
        info!(
            planner = %cfg.name,
            target_type = %target.target_type,
            value = %target.normalized_value,
            steps = steps.len(),
            "created plan"
        );
        Ok(steps)
    }

    fn adapt_plan(&self, current_plan: &[Step], evidence: &[Evidence]) -> Result<Vec<Step>, PlanningError> {
        if evidence.is_empty() {
            return Ok(current_plan.to_vec());
        }
        validate_plan(current_plan)?;
        validate_evidence(current_plan, evidence)?;

        let high_risk = evidence.iter().any(Evidence::has_high_severity);
        if !high_risk {
            debug!(evidence = evidence.len(), "no high-severity indicators; plan unchanged");
            return Ok(current_plan.to_vec());
        }

        if current_plan
            .iter()
            .any(|s| s.primitive == primitives::NEWS_SEARCH)
        {
            debug!("high-severity evidence but news search already planned; plan unchanged");
            return Ok(current_plan.to_vec());
        }

        // validate_plan guarantees the terminal step exists.
        let insert_at = terminal_index(current_plan).unwrap_or(current_plan.len() - 1);
        let news = Step::new(adaptive_id(current_plan), primitives::NEWS_SEARCH)
        .param("query", self.news_query(&evidence[0].target_value))
        .param("days_back", self.config.adaptive_news_days_back)
        .label("Deep News Search (High Risk Detected)")
        .cost_tier(CostTier::Basic)
        .timeout_s(self.config.timeouts.adaptive_news_search);

        let mut adapted = current_plan.to_vec();
        adapted.insert(insert_at, news);
        validate_plan(&adapted)?;

        info!(
            inserted = %adapted[insert_at].id,
            steps = adapted.len(),
            "high-severity evidence; inserted deep news search"
        );
        Ok(adapted)
    }
}

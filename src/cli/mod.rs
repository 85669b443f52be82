//! CLI subcommands: init, validate, plan, adapt, stages, schema.

use crate::core::types::{CostTier, Evidence, Step, TargetType};
use crate::core::{Investigation, RiskReport, Target};
use crate::planning::config::{self, PlannerConfig};
use crate::planning::{digest, schedule, BudgetedPlanner, DeterministicPlanner, PlanContext, Planner};
use clap::Subcommand;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default planner.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a planner config
    Validate {
        /// Path to planner.yaml
        #[arg(short, long, default_value = "planner.yaml")]
        config: PathBuf,
    },

    /// Build the baseline plan for a target
    Plan {
        /// Raw target value (domain, URL, IP or company name)
        value: String,

        /// Target type; detected from the value when omitted
        #[arg(short = 't', long = "type")]
        target_type: Option<String>,

        /// Richer plan: more web results plus news search
        #[arg(long)]
        demo: bool,

        /// Add the news search outside demo mode
        #[arg(long)]
        include_news: bool,

        /// Highest cost tier a step may carry (free, basic, premium)
        #[arg(long)]
        max_cost_tier: Option<String>,

        /// Planner config (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format: yaml or json
        #[arg(long, default_value = "yaml")]
        format: String,
    },

    /// Adapt a plan to collected evidence
    Adapt {
        /// Current plan (JSON or YAML list of steps)
        #[arg(long)]
        plan: PathBuf,

        /// Evidence collected so far (JSON or YAML list)
        #[arg(long)]
        evidence: PathBuf,

        /// Highest cost tier an adapted plan may carry (free, basic, premium)
        #[arg(long)]
        max_cost_tier: Option<String>,

        /// Planner config (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format: yaml or json
        #[arg(long, default_value = "yaml")]
        format: String,
    },

    /// Show concurrent dispatch waves for a plan
    Stages {
        /// Plan file (JSON or YAML list of steps)
        #[arg(long)]
        plan: PathBuf,
    },

    /// Print the JSON schema of a data contract
    Schema {
        /// target, step, evidence, investigation or risk-report
        entity: String,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Plan {
            value,
            target_type,
            demo,
            include_news,
            max_cost_tier,
            config,
            format,
        } => {
            let request = PlanRequest {
                value,
                target_type,
                demo,
                include_news,
                max_cost_tier,
            };
            cmd_plan(&request, config.as_deref(), &format)
        }
        Commands::Adapt {
            plan,
            evidence,
            max_cost_tier,
            config,
            format,
        } => cmd_adapt(
            &plan,
            &evidence,
            max_cost_tier.as_deref(),
            config.as_deref(),
            &format,
        ),
        Commands::Stages { plan } => cmd_stages(&plan),
        Commands::Schema { entity } => cmd_schema(&entity),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("planner.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;

    let yaml = config::default_config_yaml()?;
    std::fs::write(&config_path, yaml)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized planner config at {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    let types: Vec<&str> = config.supported_types.iter().map(|t| t.as_str()).collect();
    println!(
        "OK: {} (types: {}, {} reputation engines)",
        config.name,
        types.join(", "),
        config.reputation_engines.len()
    );
    Ok(())
}

/// Parse and validate a planner config file, returning errors if invalid.
fn parse_and_validate(file: &Path) -> Result<PlannerConfig, String> {
    let config = config::parse_config_file(file)?;
    let errors = config::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(format!("{} validation error(s)", errors.len()))
}

fn load_planner(config: Option<&Path>) -> Result<DeterministicPlanner, String> {
    match config {
        Some(path) => Ok(DeterministicPlanner::new(parse_and_validate(path)?)),
        None => Ok(DeterministicPlanner::default()),
    }
}

/// Arguments of `plan` that shape the target and context.
#[derive(Debug, Clone, Default)]
struct PlanRequest {
    value: String,
    target_type: Option<String>,
    demo: bool,
    include_news: bool,
    max_cost_tier: Option<String>,
}

fn build_target(value: &str, target_type: Option<&str>) -> Result<Target, String> {
    let target = match target_type {
        Some(t) => {
            let t: TargetType = t.parse().map_err(|e| format!("{}", e))?;
            Target::new(value, t)
        }
        None => Target::detect(value),
    };
    target.map_err(|e| format!("invalid target: {}", e))
}

/// Cost ceiling from `--max-cost-tier`; premium when omitted.
fn parse_ceiling(tier: Option<&str>) -> Result<CostTier, String> {
    match tier {
        Some(t) => t.parse().map_err(|e| format!("{}", e)),
        None => Ok(CostTier::Premium),
    }
}

fn build_plan(request: &PlanRequest, planner: DeterministicPlanner) -> Result<Vec<Step>, String> {
    let target = build_target(&request.value, request.target_type.as_deref())?;
    let mut context = PlanContext::default()
        .demo(request.demo)
        .include_news(request.include_news);
    let ceiling = parse_ceiling(request.max_cost_tier.as_deref())?;
    if request.max_cost_tier.is_some() {
        context = context.max_cost_tier(ceiling);
    }
    BudgetedPlanner::new(planner, ceiling)
        .create_plan(&target, &context)
        .map_err(|e| e.to_string())
}

fn cmd_plan(request: &PlanRequest, config: Option<&Path>, format: &str) -> Result<(), String> {
    let planner = load_planner(config)?;
    let plan = build_plan(request, planner)?;
    print!("{}", render(&plan, format)?);
    eprintln!("digest: {}", digest::plan_digest(&plan)?);
    Ok(())
}

fn cmd_adapt(
    plan_file: &Path,
    evidence_file: &Path,
    max_cost_tier: Option<&str>,
    config: Option<&Path>,
    format: &str,
) -> Result<(), String> {
    let planner = BudgetedPlanner::new(load_planner(config)?, parse_ceiling(max_cost_tier)?);
    let plan: Vec<Step> = read_document(plan_file)?;
    let evidence: Vec<Evidence> = read_document(evidence_file)?;

    let adapted = planner
        .adapt_plan(&plan, &evidence)
        .map_err(|e| e.to_string())?;
    print!("{}", render(&adapted, format)?);

    let before = digest::plan_digest(&plan)?;
    let after = digest::plan_digest(&adapted)?;
    if before == after {
        eprintln!("plan unchanged ({})", after);
    } else {
        eprintln!("plan changed: {} -> {}", before, after);
    }
    Ok(())
}

fn cmd_stages(plan_file: &Path) -> Result<(), String> {
    let plan: Vec<Step> = read_document(plan_file)?;
    let waves = schedule::waves(&plan).map_err(|e| e.to_string())?;
    println!("Stages: {} steps in {} waves", plan.len(), waves.len());
    for (i, wave) in waves.iter().enumerate() {
        println!("  {}: {}", i + 1, wave.join(", "));
    }
    Ok(())
}

fn cmd_schema(entity: &str) -> Result<(), String> {
    let schema = schema_for_entity(entity)?;
    println!("{}", schema);
    Ok(())
}

fn schema_for_entity(entity: &str) -> Result<String, String> {
    let schema = match entity {
        "target" => schemars::schema_for!(Target),
        "step" => schemars::schema_for!(Step),
        "evidence" => schemars::schema_for!(Evidence),
        "investigation" => schemars::schema_for!(Investigation),
        "risk-report" | "risk_report" => schemars::schema_for!(RiskReport),
        other => {
            return Err(format!(
                "unknown entity '{}' (expected one of: target, step, evidence, investigation, risk-report)",
                other
            ))
        }
    };
    serde_json::to_string_pretty(&schema).map_err(|e| format!("serialize error: {}", e))
}

/// Read a JSON (`.json`) or YAML document.
fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content).map_err(|e| format!("{}: JSON parse error: {}", path.display(), e))
    } else {
        serde_yaml_ng::from_str(&content)
            .map_err(|e| format!("{}: YAML parse error: {}", path.display(), e))
    }
}

fn render<T: Serialize>(value: &T, format: &str) -> Result<String, String> {
    match format {
        "yaml" => serde_yaml_ng::to_string(value).map_err(|e| format!("serialize error: {}", e)),
        "json" => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| format!("serialize error: {}", e)),
        other => Err(format!("unknown format '{}' (expected yaml or json)", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::primitives;

    fn request(value: &str) -> PlanRequest {
        PlanRequest {
            value: value.to_string(),
            ..PlanRequest::default()
        }
    }

    fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_init_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("project");
        cmd_init(&sub).unwrap();
        let written = sub.join("planner.yaml");
        assert!(written.exists());
        cmd_validate(&written).unwrap();
    }

    #[test]
    fn test_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("planner.yaml"), "exists").unwrap();
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_validate_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.yaml");
        std::fs::write(&path, "version: \"2.0\"\nsupported_types: [company]\n").unwrap();
        let err = cmd_validate(&path).unwrap_err();
        assert_eq!(err, "2 validation error(s)");
    }

    #[test]
    fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cmd_validate(&dir.path().join("nope.yaml")).is_err());
    }

    #[test]
    fn test_build_plan_detects_type() {
        let plan = build_plan(&request("https://Shop.Example.com/x"), DeterministicPlanner::default())
            .unwrap();
        assert_eq!(plan[0].id, "step_url_001");
        assert_eq!(plan[0].params["domain"], "shop.example.com");

        let plan = build_plan(&request("9.9.9.9"), DeterministicPlanner::default()).unwrap();
        assert_eq!(plan[0].id, "step_ip_001");
    }

    #[test]
    fn test_build_plan_company_rejected() {
        let err = build_plan(&request("Acme Corporation"), DeterministicPlanner::default())
            .unwrap_err();
        assert!(err.contains("doesn't support target type: company"));
    }

    #[test]
    fn test_build_plan_explicit_type_and_budget() {
        let req = PlanRequest {
            target_type: Some("domain".to_string()),
            demo: true,
            max_cost_tier: Some("free".to_string()),
            ..request("example.com")
        };
        let plan = build_plan(&req, DeterministicPlanner::default()).unwrap();
        assert!(!plan.iter().any(|s| s.primitive == primitives::NEWS_SEARCH));

        let bad = PlanRequest {
            max_cost_tier: Some("gold".to_string()),
            ..request("example.com")
        };
        assert!(build_plan(&bad, DeterministicPlanner::default()).is_err());

        let bad_type = PlanRequest {
            target_type: Some("host".to_string()),
            ..request("example.com")
        };
        assert!(build_plan(&bad_type, DeterministicPlanner::default()).is_err());
    }

    #[test]
    fn test_cmd_plan_with_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.yaml");
        std::fs::write(&path, "supported_types: [ip]\n").unwrap();
        assert!(cmd_plan(&request("1.2.3.4"), Some(&path), "json").is_ok());
        assert!(cmd_plan(&request("example.com"), Some(&path), "json").is_err());
        assert!(cmd_plan(&request("1.2.3.4"), None, "toml").is_err());
    }

    #[test]
    fn test_cmd_adapt_and_stages() {
        let dir = tempfile::tempdir().unwrap();
        let plan = build_plan(&request("suspicious.com"), DeterministicPlanner::default()).unwrap();
        let plan_path = write_json(dir.path(), "plan.json", &plan);

        let evidence = serde_json::json!([{
            "source": "whois",
            "step_id": "step_domain_001",
            "target_value": "suspicious.com",
            "confidence": 0.95,
            "risk_indicators": [{"type": "new_domain", "severity": "high", "detail": "Created yesterday"}]
        }]);
        let evidence_path = write_json(dir.path(), "evidence.json", &evidence);

        cmd_adapt(&plan_path, &evidence_path, None, None, "yaml").unwrap();
        let err = cmd_adapt(&plan_path, &evidence_path, Some("free"), None, "yaml").unwrap_err();
        assert!(err.contains("exceeding the declared maximum 'free'"));
        cmd_adapt(&plan_path, &evidence_path, Some("basic"), None, "json").unwrap();
        assert!(cmd_adapt(&plan_path, &evidence_path, Some("gold"), None, "yaml").is_err());
        cmd_stages(&plan_path).unwrap();

        let ghost = serde_json::json!([{
            "source": "whois",
            "step_id": "step_domain_042",
            "target_value": "suspicious.com",
            "confidence": 0.5
        }]);
        let ghost_path = write_json(dir.path(), "ghost.json", &ghost);
        let err = cmd_adapt(&plan_path, &ghost_path, None, None, "yaml").unwrap_err();
        assert!(err.contains("step_domain_042"));
    }

    #[test]
    fn test_read_document_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        std::fs::write(
            &path,
            "- id: a\n  primitive: whois\n- id: b\n  primitive: risk_score\n",
        )
        .unwrap();
        let plan: Vec<Step> = read_document(&path).unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan[1].is_terminal());
        cmd_stages(&path).unwrap();
    }

    #[test]
    fn test_stages_rejects_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(dir.path(), "plan.json", &vec![Step::new("a", primitives::WHOIS)]);
        assert!(cmd_stages(&path).unwrap_err().contains("malformed plan"));
    }

    #[test]
    fn test_schema_entities() {
        for entity in ["target", "step", "evidence", "investigation", "risk-report"] {
            let schema = schema_for_entity(entity).unwrap();
            assert!(schema.contains("\"properties\""), "{} schema", entity);
        }
        assert!(schema_for_entity("step").unwrap().contains("primitive"));
        assert!(cmd_schema("planet").is_err());
    }

    #[test]
    fn test_render_formats() {
        let plan = vec![Step::new("a", primitives::RISK_SCORE)];
        assert!(render(&plan, "yaml").unwrap().contains("primitive: risk_score"));
        assert!(render(&plan, "json").unwrap().contains("\"primitive\": \"risk_score\""));
        assert!(render(&plan, "xml").is_err());
    }
}

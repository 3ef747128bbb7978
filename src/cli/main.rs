// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * bhd-assist - Operator CLI
 * Policy-gated hypothesis drafting and playbook guidance
 *
 * Commands:
 * - evaluate: effective assistance level for a context
 * - select: pick a playbook for observations (optionally explained)
 * - draft: LLM hypothesis drafting through the policy guard
 * - checklist: render a playbook checklist and evidence plan
 * - validate-playbooks: safety check of the playbook library
 * - finding / export: finding drafts and engagement bundles
 * - config: effective configuration and validation report
 *
 * (c) 2026 Bountyy Oy
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Map};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use bhd_assist::adaptive::{evaluate_assist_level, AssistContext, EffectiveAssistLevel, Environment, TargetOwner};
use bhd_assist::config::{load_config, AssistConfig, ConfigValidator};
use bhd_assist::drafter::HypothesisDrafter;
use bhd_assist::export::BhdCliExport;
use bhd_assist::llm::LlmRouter;
use bhd_assist::playbooks::{PlaybookLoader, PlaybookSelector};
use bhd_assist::policy::PolicyGuard;
use bhd_assist::schema::{SchemaKind, SchemaValidator};
use bhd_assist::storage::JsonlStore;
use bhd_assist::types::{DecisionEvent, DecisionLogEntry, Observation};

/// bhd-assist - assistant reasoning pipeline for authorized penetration tests
#[derive(Parser)]
#[command(name = "bhd-assist")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version)]
#[command(about = "Safety-gated hypotheses and validation playbooks from tool observations", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (yaml, toml or json)
    #[arg(short, long, global = true, env = "BHD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(clap::Args, Clone)]
struct ContextArgs {
    /// Engagement environment
    #[arg(long, default_value = "prod-client")]
    environment: EnvironmentArg,

    /// Written authorization is in place
    #[arg(long)]
    authorized: bool,

    /// Who owns the target
    #[arg(long, default_value = "unknown")]
    target_owner: TargetOwnerArg,

    /// Requested assistance level
    #[arg(long, default_value = "standard")]
    level: LevelArg,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the effective assistance level for a context
    Evaluate {
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Select a playbook for a set of observations
    Select {
        /// Observations (JSON array or JSONL); defaults to the store
        #[arg(short, long)]
        observations: Option<PathBuf>,

        /// Test type, e.g. web, network, ics
        #[arg(short, long)]
        test_type: String,

        /// Print the full evaluation trace
        #[arg(long)]
        explain: bool,
    },

    /// Draft hypotheses from observations
    Draft {
        /// Observations (JSON array or JSONL); defaults to the store
        #[arg(short, long)]
        observations: Option<PathBuf>,

        #[command(flatten)]
        context: ContextArgs,

        /// Maximum hypotheses (defaults to drafter.max_hypotheses)
        #[arg(short, long)]
        max: Option<usize>,
    },

    /// Render a playbook checklist
    Checklist {
        /// Playbook id
        playbook_id: String,

        /// Also print the evidence plan as JSON
        #[arg(long)]
        evidence_plan: bool,
    },

    /// Validate every playbook in the library
    ValidatePlaybooks {
        /// Only list playbooks for this test type
        #[arg(short, long)]
        test_type: Option<String>,
    },

    /// Create a finding draft from a playbook template and store it
    Finding {
        /// Playbook id
        playbook_id: String,

        /// Affected asset (host, URL)
        #[arg(short, long)]
        asset: String,

        /// Evidence reference ids
        #[arg(short, long)]
        evidence: Vec<String>,
    },

    /// Export stored finding drafts as an engagement bundle or for bhd-cli import
    Export {
        /// Engagement id
        engagement_id: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "bundle")]
        format: ExportFormat,
    },

    /// Show the effective configuration and its validation report
    Config,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Bundle,
    BhdCli,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum EnvironmentArg {
    ProdClient,
    Lab,
    Ctf,
}

impl From<EnvironmentArg> for Environment {
    fn from(arg: EnvironmentArg) -> Self {
        match arg {
            EnvironmentArg::ProdClient => Environment::ProdClient,
            EnvironmentArg::Lab => Environment::Lab,
            EnvironmentArg::Ctf => Environment::Ctf,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum TargetOwnerArg {
    #[value(name = "self")]
    Own,
    Client,
    Unknown,
}

impl From<TargetOwnerArg> for TargetOwner {
    fn from(arg: TargetOwnerArg) -> Self {
        match arg {
            TargetOwnerArg::Own => TargetOwner::Own,
            TargetOwnerArg::Client => TargetOwner::Client,
            TargetOwnerArg::Unknown => TargetOwner::Unknown,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LevelArg {
    Standard,
    DeepLab,
}

impl From<LevelArg> for EffectiveAssistLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Standard => EffectiveAssistLevel::Standard,
            LevelArg::DeepLab => EffectiveAssistLevel::DeepLab,
        }
    }
}

impl From<&ContextArgs> for AssistContext {
    fn from(args: &ContextArgs) -> Self {
        AssistContext::new(args.environment.into(), args.authorized, args.target_owner.into())
            .requesting(args.level.into())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config, cli.debug);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(async_main(cli.command, config))
}

fn init_logging(config: &AssistConfig, debug: bool) {
    let level = if debug { "debug" } else { config.observability.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    if config.observability.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn async_main(command: Commands, config: AssistConfig) -> Result<()> {
    match command {
        Commands::Evaluate { context } => {
            let evaluation = evaluate_assist_level(&AssistContext::from(&context));
            print_json(&evaluation)
        }

        Commands::Select {
            observations,
            test_type,
            explain,
        } => {
            let observations = load_observations(&config, observations.as_deref())?;
            let selector = PlaybookSelector::from_path(&config.paths.selector_rules)?;
            let trace = selector.explain(&observations, &test_type);

            if let Some(playbook) = &trace.selected_playbook {
                let guard = build_guard(&config)?;
                let mut details = Map::new();
                details.insert("playbook_id".to_string(), json!(playbook));
                details.insert("test_type".to_string(), json!(test_type));
                details.insert("used_default".to_string(), json!(trace.used_default));
                details.insert(
                    "observation_ids".to_string(),
                    json!(observations.iter().map(|o| o.id.as_str()).collect::<Vec<_>>()),
                );
                guard.log_decision(&DecisionLogEntry::new(
                    DecisionEvent::PlaybookSelected,
                    guard.assistance_level(),
                    details,
                ))?;
            }

            if explain {
                print_json(&trace)
            } else {
                match trace.selected_playbook {
                    Some(id) => println!("{}", id),
                    None => println!("No matching playbook"),
                }
                Ok(())
            }
        }

        Commands::Draft {
            observations,
            context,
            max,
        } => {
            let observations = load_observations(&config, observations.as_deref())?;
            let guard = Arc::new(build_guard(&config)?);
            let router = Arc::new(LlmRouter::from_config(&config.llm));
            let drafter = HypothesisDrafter::new(router, guard, build_schemas(&config)?)
                .with_temperature(config.llm.temperature);

            let outcome = drafter
                .draft_hypotheses(
                    &observations,
                    &AssistContext::from(&context),
                    max.unwrap_or(config.drafter.max_hypotheses),
                )
                .await?;

            info!(
                hypotheses = outcome.hypotheses.len(),
                provider = ?outcome.provider_used,
                "Drafting complete"
            );
            print_json(&outcome)
        }

        Commands::Checklist {
            playbook_id,
            evidence_plan,
        } => {
            let loader = PlaybookLoader::new(&config.paths.playbooks_dir);
            let playbook = loader.load_playbook(&playbook_id)?;
            println!("{}", loader.render_checklist(&playbook));

            if evidence_plan {
                let plan = loader.create_evidence_plan(&playbook);
                build_schemas(&config)?.validate_entity(SchemaKind::Evidence, &plan)?;
                print_json(&plan)?;
            }
            Ok(())
        }

        Commands::ValidatePlaybooks { test_type } => {
            let loader = PlaybookLoader::new(&config.paths.playbooks_dir);
            let mut failures = 0;

            for (path, result) in loader.validate_all()? {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                match result {
                    Ok(playbook) => println!("✓ {} ({} safety constraints)", name, playbook.safety_constraints.len()),
                    Err(e) => {
                        failures += 1;
                        println!("✗ {}: {}", name, e);
                    }
                }
            }

            if let Some(test_type) = test_type {
                println!();
                for summary in loader.list_playbooks(Some(&test_type))? {
                    println!("{} {} - {}", summary.id, summary.version, summary.name);
                }
            }

            if failures > 0 {
                anyhow::bail!("{} playbook(s) failed validation", failures);
            }
            Ok(())
        }

        Commands::Finding {
            playbook_id,
            asset,
            evidence,
        } => {
            let loader = PlaybookLoader::new(&config.paths.playbooks_dir);
            let playbook = loader.load_playbook(&playbook_id)?;
            let draft = loader.create_finding_draft(&playbook, &asset, evidence);
            build_schemas(&config)?.validate_entity(SchemaKind::FindingDraft, &draft)?;

            let store = JsonlStore::new(&config.paths.storage_dir)?;
            store.save_finding_draft(&draft)?;
            print_json(&draft)
        }

        Commands::Export {
            engagement_id,
            output,
            format,
        } => {
            let store = JsonlStore::new(&config.paths.storage_dir)?;
            let bundle = store.export_bundle(&engagement_id)?;
            build_schemas(&config)?.validate_entity(SchemaKind::Bundle, &bundle)?;

            let rendered = match format {
                ExportFormat::Bundle => serde_json::to_string_pretty(&bundle)?,
                ExportFormat::BhdCli => BhdCliExport::new(&bundle.findings).render()?,
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write export to {:?}", path))?;
                    info!(path = %path.display(), findings = bundle.findings.len(), "Findings exported");
                }
                None => println!("{}", rendered),
            }
            Ok(())
        }

        Commands::Config => {
            let report = ConfigValidator::generate_validation_report(&config);
            for (field, warnings) in &report.warnings {
                for warning in warnings {
                    warn!(field = %field, "{}", warning);
                }
            }
            print_json(&json!({
                "config": config,
                "report": report,
            }))
        }
    }
}

fn build_guard(config: &AssistConfig) -> Result<PolicyGuard> {
    Ok(PolicyGuard::new(
        config.policy.assistance_level,
        config.policy.profile_path.as_deref(),
        Some(config.policy.decision_log.as_path()),
    )?)
}

fn build_schemas(config: &AssistConfig) -> Result<SchemaValidator> {
    Ok(match &config.paths.schemas_dir {
        Some(dir) => SchemaValidator::from_dir(dir)?,
        None => SchemaValidator::embedded()?,
    })
}

/// Observations from a JSON array or JSONL file, else from the store.
/// File input is schema-checked and persisted.
fn load_observations(config: &AssistConfig, path: Option<&Path>) -> Result<Vec<Observation>> {
    let store = JsonlStore::new(&config.paths.storage_dir)?;

    let Some(path) = path else {
        return Ok(store.load_observations()?);
    };

    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read observations: {:?}", path))?;

    let values: Vec<serde_json::Value> = if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()
            .context("Invalid JSONL observations")?
    } else {
        serde_json::from_str(&content).context("Observations file must contain a JSON array")?
    };

    let schemas = build_schemas(config)?;
    let mut observations = Vec::with_capacity(values.len());

    for value in values {
        schemas.validate(SchemaKind::Observation, &value)?;
        let observation: Observation = serde_json::from_value(value)?;
        observation.validate()?;
        observations.push(observation);
    }

    let stored = store.import_observations(&observations)?;
    debug!(loaded = observations.len(), stored, "Observations imported");

    Ok(observations)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

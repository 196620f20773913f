use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use tracing::{info, warn};

use mend_core::config::Config;
use mend_core::executor::PytestExecutor;
use mend_core::llm::Provider;
use mend_core::storage::{FileStore, SourceStore};
use mend_core::triage::LlmTriage;
use mend_core::{aggregate, decide, HealingOrchestrator, RunReport, WorkflowResult};

#[derive(Parser)]
#[command(name = "mend")]
#[command(about = "AI-driven self-healing for failing test suites", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to mend.toml / user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Heal the failures in a test run report and decide whether commit is allowed
    Heal {
        /// Machine-readable test run report (pytest-json-report format)
        #[arg(long, default_value = "reports/pytest-report.json")]
        report: PathBuf,

        /// Project root tests are executed from
        #[arg(long, default_value = ".")]
        project_root: PathBuf,
    },
    /// Re-evaluate the persisted healing report and exit accordingly
    Gate {
        /// Project root holding the healing report
        #[arg(long, default_value = ".")]
        project_root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().wrap_err("failed to load configuration")?,
    };

    match cli.command {
        Commands::Heal {
            report,
            project_root,
        } => heal(config, report, project_root).await,
        Commands::Gate { project_root } => gate(config, project_root),
    }
}

async fn heal(
    config: Config,
    report: PathBuf,
    project_root: PathBuf,
) -> color_eyre::Result<ExitCode> {
    let run_report = RunReport::from_path(&report)
        .wrap_err_with(|| format!("failed to read test run report {}", report.display()))?;

    let failures = run_report.failures();
    let store = FileStore::new(&project_root, &config.storage);

    if failures.is_empty() {
        info!("no failed tests found");
        let result = WorkflowResult::empty();
        store.save_report(&result).wrap_err("failed to write healing report")?;
        return Ok(ExitCode::SUCCESS);
    }

    let llm = Provider::build_from_config(&config.llm).wrap_err("failed to build LLM client")?;
    let triage = LlmTriage::new(llm);
    let executor = PytestExecutor::new(&project_root, &config.executor);

    let orchestrator =
        HealingOrchestrator::new(triage, executor, store.clone(), config.healing.clone());

    let records = orchestrator.run(failures).await;
    let result = aggregate(&records);

    store.save_report(&result).wrap_err("failed to write healing report")?;

    summarize(&result);

    Ok(exit_code(&result))
}

fn gate(config: Config, project_root: PathBuf) -> color_eyre::Result<ExitCode> {
    let store = FileStore::new(&project_root, &config.storage);
    let result = store
        .load_report()
        .wrap_err("healing report not found - run `mend heal` first")?;

    summarize(&result);

    Ok(exit_code(&result))
}

fn exit_code(result: &WorkflowResult) -> ExitCode {
    if decide(result) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn summarize(result: &WorkflowResult) {
    info!(
        healed = result.healed_count,
        defects = result.defect_count,
        exceeded = result.exceeded_count,
        "healing summary"
    );

    if result.commit_allowed {
        info!("commit allowed: every failing test was healed or traced to an application defect");
        if result.defect_count > 0 {
            info!(
                count = result.defect_count,
                "application defects require manual investigation"
            );
        }
    } else {
        warn!("commit blocked: tests are still failing after exhausting the repair budget");
        for test_id in &result.max_attempts_exceeded {
            warn!(test = %test_id, "exceeded max healing attempts");
        }
    }
}

//! mizu CLI: run the Mizu flows against a Sui full node.
//!
//! Usage:
//!   mizu flows                                   → list flows
//!   mizu run deploy                              → publish as the admin
//!   mizu run cooler --dry-run                    → show reads, requests and writes
//!   mizu run public-mint --from public_mint      → resume at a stage
//!   mizu store set user1 attributes 0x...        → seed a snapshot by hand

use anyhow::Context;
use clap::{Parser, Subcommand};
use mizu::config::ActorConfig;
use mizu::{build_flow, find_flow, MizuConfig, Role, FLOWS};
use mizu_chain::{Keypair, SuiClient};
use mizu_core::{Scalar, StoreKey};
use mizu_pipeline::{PipelineResult, ReadPlan, RunOptions, SessionContext, StageError, StageStatus};
use mizu_store::{JsonFileBackend, StateStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "mizu=info,mizu_core=info,mizu_store=info,mizu_chain=info,mizu_pipeline=info";

#[derive(Parser)]
#[command(
    name = "mizu",
    version = env!("CARGO_PKG_VERSION"),
    about = "Staged transaction pipelines for the Mizu water-cooler contracts on Sui"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (TOML)
    #[arg(long, global = true, default_value = "mizu.toml")]
    config: PathBuf,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available flows
    Flows,

    /// Run a flow
    Run {
        flow: String,

        /// Start at this stage; earlier stages are skipped
        #[arg(long)]
        from: Option<String>,

        /// Skip stages whose writes are already in the snapshot
        #[arg(long, default_value_t = false)]
        resume: bool,

        /// Print what each stage would read, submit and write, then exit
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Write the run report here (YAML)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Inspect or edit an actor's snapshot
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Print the effective config as TOML
    Config,
}

#[derive(Subcommand)]
enum StoreAction {
    Show { actor: String },
    Set { actor: String, key: String, value: String },
    Unset { actor: String, key: String },
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("log file has no name: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

async fn open_store(actor: &ActorConfig) -> anyhow::Result<StateStore> {
    let backend = Arc::new(JsonFileBackend::new(&actor.snapshot));
    StateStore::open(actor.name.as_str(), backend)
        .await
        .with_context(|| format!("opening snapshot {}", actor.snapshot.display()))
}

fn print_flows() {
    println!("Flows:");
    for flow in FLOWS {
        let role = match flow.role {
            Role::Admin => "admin",
            Role::User => "user",
        };
        println!("  {:<12} [{}] {}", flow.name, role, flow.summary);
    }
}

fn print_result(result: &PipelineResult, location: &str) {
    let report = &result.report;
    println!("\n=== Run Complete ===");
    println!("Run ID: {}", report.run_id);
    println!("Flow: {} (as {} {})", report.pipeline, report.actor, report.address);
    println!("Outcome: {}", report.outcome);
    println!("Wall: {}ms", report.total_wall_ms);
    println!("Snapshot: {}", location);

    println!("\nStages:");
    for stage in &report.stages {
        let icon = match stage.status {
            StageStatus::Success => "✓",
            StageStatus::Failed => "✗",
            _ => "○",
        };
        let digest = stage.digest.as_deref().unwrap_or("-");
        println!("  {} {} ({}ms, tx {})", icon, stage.name, stage.wall_ms, digest);
        if let Some(note) = &stage.note {
            println!("      {}", note);
        }
    }

    let delta = report.store_delta();
    if !delta.is_empty() {
        println!("\nWritten:");
        for (key, value) in delta {
            println!("  {} = {}", key, value);
        }
    }

    if let Some(log) = &report.last_log {
        println!("\nLast transaction ({} changes):", log.len());
        for record in log.records() {
            println!(
                "  {:?} {} {}",
                record.kind(),
                record.declared_type().unwrap_or("-"),
                record.identifier().unwrap_or("-")
            );
        }
    }

    if let Some(failure) = &report.failure {
        println!("\nFailed at {} ({}): {}", failure.stage, failure.kind, failure.message);
    }
}

async fn run_flow(
    config: &MizuConfig,
    flow: &str,
    options: RunOptions,
    dry_run: bool,
    report_path: Option<&Path>,
) -> anyhow::Result<i32> {
    let info = find_flow(flow).ok_or_else(|| mizu::FlowError::Unknown(flow.to_string()))?;
    let actor = match info.role {
        Role::Admin => &config.actors.admin,
        Role::User => &config.actors.user,
    };

    let admin_store = open_store(&config.actors.admin).await?;
    let mut store = match info.role {
        Role::Admin => admin_store,
        Role::User => open_store(&config.actors.user).await?.layered_over(&admin_store),
    };

    if dry_run {
        let pipeline = build_flow(flow, config, None)?;
        let sender = Keypair::from_env(&actor.key_env)
            .map(|k| k.address().to_string())
            .unwrap_or_else(|_| format!("${}", actor.key_env));
        println!("=== {} as {} ({}) ===\n", pipeline.name(), actor.name, sender);
        for plan in pipeline.plan(&store, &sender) {
            print!("{}", plan);
            for (key, read) in &plan.reads {
                if matches!(read, ReadPlan::Missing | ReadPlan::Record) {
                    if let Some(hint) = info.seed_hint(&actor.name, key.as_str()) {
                        println!("    {}", hint);
                    }
                }
            }
        }
        return Ok(0);
    }

    let signer = Keypair::from_env(&actor.key_env)?;
    let package = if info.publishes {
        Some(mizu::compile(&config.contracts.sui_bin, &config.contracts.path, config.timeout()).await?)
    } else {
        None
    };
    let pipeline = build_flow(flow, config, package)?;

    let client = SuiClient::with_timeout(config.network.rpc_url.as_str(), config.timeout())?
        .with_gas_budget(config.gas.budget);
    info!(url = client.url(), actor = actor.name.as_str(), address = signer.address(), "connected");
    let ctx = SessionContext::new(&actor.name, Arc::new(client), Arc::new(signer));

    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling the running stage");
            cancel.cancel();
        }
    });

    let result = pipeline.run_with(&mut store, &ctx, options).await?;
    print_result(&result, &store.location());
    if let Some(StageError::UnresolvedDependency { key, .. }) = &result.error {
        if let Some(hint) = info.seed_hint(&actor.name, key.as_str()) {
            println!("{}", hint);
        }
    }

    if let Some(path) = report_path {
        tokio::fs::write(path, result.report.to_yaml())
            .await
            .with_context(|| format!("writing report {}", path.display()))?;
        println!("\nReport: {}", path.display());
    }
    info!("{}", result.report.run_log_line());
    Ok(result.exit_code())
}

async fn store_command(config: &MizuConfig, action: StoreAction) -> anyhow::Result<()> {
    let actor_name = match &action {
        StoreAction::Show { actor } | StoreAction::Set { actor, .. } | StoreAction::Unset { actor, .. } => actor,
    };
    let actor = config
        .actor(actor_name)
        .with_context(|| format!("no actor named '{}' in config", actor_name))?;
    let mut store = open_store(actor).await?;

    match action {
        StoreAction::Show { .. } => {
            println!("{}", serde_json::to_string_pretty(&store.document())?);
        }
        StoreAction::Set { key, value, .. } => {
            let key = StoreKey::parse(&key)?;
            let previous = store.write(key.clone(), Scalar::infer(&value))?;
            store.flush().await?;
            match previous {
                Some(old) => println!("{}: {} -> {}", key, old, value),
                None => println!("{} = {}", key, value),
            }
        }
        StoreAction::Unset { key, .. } => {
            let key = StoreKey::parse(&key)?;
            match store.remove(&key) {
                Some(old) => {
                    store.flush().await?;
                    println!("removed {} (was {})", key, old);
                }
                None => println!("{} not set", key),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let guard = init_tracing(cli.log_file.as_deref())?;

    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Failed to read .env: {}", e),
    }

    let config = MizuConfig::load(&cli.config)?;

    let code = match cli.command {
        Commands::Flows => {
            print_flows();
            0
        }
        Commands::Config => {
            print!("{}", config.to_toml());
            0
        }
        Commands::Store { action } => {
            store_command(&config, action).await?;
            0
        }
        Commands::Run {
            flow,
            from,
            resume,
            dry_run,
            report,
        } => {
            let options = RunOptions {
                from,
                resume,
                cancel: CancellationToken::new(),
            };
            run_flow(&config, &flow, options, dry_run, report.as_deref()).await?
        }
    };

    drop(guard);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

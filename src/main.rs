//! ETL Studio - command line entry point
//!
//! Headless diagnostics against a live orchestration API: print a pipeline
//! graph with its layout, list versions, publish, trigger and watch runs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use etl_studio::{
    backend::{HttpBackend, PipelineBackend},
    config::{config_path, LogFormat, LoggingConfig, StudioConfig},
    lifecycle::VersionController,
    overlay::{format_bytes, format_duration, format_throughput, RunGraph, RunMonitor},
    pipeline::{PipelineId, RunId, VersionId},
    types::PipelineRun,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "etl-studio")]
#[command(about = "Inspect and operate ETL pipelines from the command line")]
struct Cli {
    /// Config file (defaults to the platform data directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// API base URL, overriding config and environment
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a pipeline version as a laid-out graph
    Show {
        pipeline: PipelineId,
        /// Explicit version id (defaults to latest, then published)
        #[arg(long)]
        version: Option<VersionId>,
        /// Recompute every position instead of using persisted ones
        #[arg(long)]
        auto_layout: bool,
        /// Print the backend nodes and edges as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the versions of a pipeline
    Versions { pipeline: PipelineId },
    /// Publish a version
    Publish {
        pipeline: PipelineId,
        version: VersionId,
    },
    /// Trigger a run (published version unless given)
    Trigger {
        pipeline: PipelineId,
        #[arg(long)]
        version: Option<VersionId>,
    },
    /// Show the status of a run
    Run {
        pipeline: PipelineId,
        run: RunId,
        /// Poll until the run finishes
        #[arg(long)]
        watch: bool,
    },
    /// Print the effective configuration
    Config,
}

fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
    };

    let stderr = match config.format {
        LogFormat::Full => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let (file, guard) = match &config.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .context("logging.file has no file name")?;
            let appender = tracing_appender::rolling::daily(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr.with_filter(filter()))
        .with(file)
        .init();
    Ok(guard)
}

fn load_config(cli: &Cli) -> Result<StudioConfig> {
    let mut config = match &cli.config {
        Some(path) => StudioConfig::load_from(path)?,
        None => StudioConfig::load_or_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_run(run: &PipelineRun, graph: Option<&RunGraph>) {
    println!(
        "run {} [{}]{}",
        run.id,
        run.status,
        run.job_id
            .as_deref()
            .map(|j| format!(" job {j}"))
            .unwrap_or_default()
    );
    let Some(graph) = graph else {
        println!("  (run has no version topology)");
        return;
    };
    for node in &graph.nodes {
        let step = node.step.as_ref();
        let mut line = format!(
            "  {:<24} {:<8}",
            node.node.data.label,
            format!("{:?}", node.state()).to_lowercase()
        );
        if let Some(rate) = node.throughput {
            line.push_str(&format!(" {}", format_throughput(rate)));
        }
        if let Some(seconds) = step.and_then(|s| s.duration_seconds) {
            line.push_str(&format!(" {}", format_duration(seconds)));
        }
        if let Some(message) = step.and_then(|s| s.error_message.as_deref()) {
            line.push_str(&format!(" error: {message}"));
        }
        println!("{line}");
    }
    let summary = graph.summary();
    println!(
        "  {}/{} finished ({:.0}%), {} rows out, {}",
        summary.finished(),
        summary.total,
        summary.progress() * 100.0,
        summary.rows_out,
        format_bytes(summary.bytes_processed)
    );
}

async fn run(cli: Cli, config: StudioConfig) -> Result<()> {
    if let Commands::Config = cli.command {
        if let Some(path) = cli.config.clone().or_else(config_path) {
            println!("# {}", path.display());
        }
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let backend: Arc<dyn PipelineBackend> = Arc::new(HttpBackend::from_config(&config.api)?);
    tracing::debug!(base_url = %config.api.base_url, "Using orchestration API");

    match cli.command {
        Commands::Show {
            pipeline,
            version,
            auto_layout,
            json,
        } => {
            let mut controller =
                VersionController::new(backend, config.layout.clone(), &config.editor);
            let result = controller.open(pipeline, version).await?;
            tracing::debug!(?result, "Opened pipeline");
            if auto_layout && controller.state().is_editable() {
                controller.auto_layout()?;
            }
            let store = controller.store();
            if json {
                let (nodes, edges) = store.to_backend();
                let value = serde_json::json!({ "nodes": nodes, "edges": edges });
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }
            println!(
                "{} [{}] v{}",
                controller.name(),
                controller.state(),
                controller
                    .current_version()
                    .map(|v| v.version.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            for node in store.nodes() {
                let position = node
                    .position()
                    .map(|p| format!("({:.0}, {:.0})", p.x, p.y))
                    .unwrap_or_default();
                println!(
                    "  {:<28} {:<10} {:<10} {}",
                    node.id.as_str(),
                    node.kind().as_str(),
                    node.data.operator_type.as_str(),
                    position
                );
            }
            for edge in store.edges() {
                println!("  {} -> {}", edge.source, edge.target);
            }
        }
        Commands::Versions { pipeline } => {
            let pipeline_info = backend.get_pipeline(pipeline).await?;
            let published = pipeline_info.published_version.as_ref().map(|v| v.id);
            println!("{}", pipeline_info.name);
            for version in backend.list_versions(pipeline).await? {
                let marker = if Some(version.id) == published {
                    "*"
                } else {
                    " "
                };
                println!(
                    " {marker} v{:<4} id {:<6} {} nodes, {} edges  {}",
                    version.version,
                    version.id,
                    version.nodes.len(),
                    version.edges.len(),
                    version.version_notes.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Publish { pipeline, version } => {
            let mut controller =
                VersionController::new(backend, config.layout.clone(), &config.editor);
            controller.open(pipeline, None).await?;
            let published = controller.publish(version).await?;
            println!("published v{} (id {})", published.version, published.id);
        }
        Commands::Trigger { pipeline, version } => {
            let response = backend.trigger(pipeline, version).await?;
            println!("{}", response.job_id);
        }
        Commands::Run {
            pipeline,
            run: run_id,
            watch,
        } => {
            let mut monitor = RunMonitor::new(
                backend,
                pipeline,
                run_id,
                config.runs.poll_interval(),
                config.layout.clone(),
            )
            .with_error_budget(config.runs.max_poll_errors);
            if watch {
                let finished = monitor.watch(|run, graph| print_run(run, graph)).await?;
                tracing::info!(status = %finished.status, "Run finished");
            } else {
                monitor.poll().await?;
                if let Some(run) = monitor.run() {
                    print_run(run, monitor.graph());
                }
            }
        }
        Commands::Config => {}
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _guard = init_logging(&config.logging)?;

    tracing::info!("Starting ETL Studio");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(cli, config))
}

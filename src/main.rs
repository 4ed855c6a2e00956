//! Volume Inventory
//!
//! Prints one row per PersistentVolumeClaim with its PersistentVolume, EBS
//! volume id and type, the EC2 instances mounting it and kubelet usage.
//!
//! The report goes to stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use volume_inventory::config::{
    DEFAULT_DESCRIBE_BATCH_SIZE, DEFAULT_DESCRIBE_CONCURRENCY, DEFAULT_METRICS_CONCURRENCY,
};
use volume_inventory::{
    build_client, render, run_pass, CorrelationContext, InventoryConfig, KubeClientOptions,
    KubeClusterReader, OutputFormat, Result, VolumeDescriberRef,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Volume Inventory - PVC / PV / EBS volume report
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Only report claims in this namespace (default: all namespaces)
    #[arg(short = 'n', long, env = "NAMESPACE", global = true)]
    namespace: Option<String>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Path to a kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// AWS region for volume type lookups
    #[arg(long, env = "AWS_REGION", global = true)]
    region: Option<String>,

    /// Skip volume type lookups
    #[arg(long, global = true)]
    no_cloud: bool,

    /// Output format (table, json, yaml)
    #[arg(short, long, env = "OUTPUT", default_value = "table", global = true)]
    output: String,

    /// Omit the table header
    #[arg(long, global = true)]
    no_headers: bool,

    /// Deadline for the whole pass in seconds (0 disables)
    #[arg(long, env = "TIMEOUT", default_value = "60", global = true)]
    timeout: u64,

    /// Nodes scraped concurrently
    #[arg(long, default_value_t = DEFAULT_METRICS_CONCURRENCY, global = true)]
    metrics_concurrency: usize,

    /// DescribeVolumes calls in flight concurrently
    #[arg(long, default_value_t = DEFAULT_DESCRIBE_CONCURRENCY, global = true)]
    describe_concurrency: usize,

    /// Volume ids per DescribeVolumes call (max 200)
    #[arg(long, default_value_t = DEFAULT_DESCRIBE_BATCH_SIZE, global = true)]
    batch_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Display the PVC / PV / volume report (default)
    List,
    /// Display the version
    Version,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.command == Some(Command::Version) {
        println!("Version: {}", volume_inventory::VERSION);
        return ExitCode::SUCCESS;
    }

    init_logging(&args);
    debug!(
        "Starting {} {}",
        volume_inventory::NAME,
        volume_inventory::VERSION
    );

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_transient() {
                eprintln!("The failure looks transient; retrying may succeed.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let format: OutputFormat = args.output.parse()?;

    let client_options = KubeClientOptions {
        kubeconfig: args.kubeconfig.clone(),
        context: args.context.clone(),
        ..Default::default()
    };
    let client = build_client(&client_options).await?;

    let mut ctx = CorrelationContext::new(Arc::new(KubeClusterReader::new(client)));
    if let Some(cloud) = cloud_describer(args).await {
        ctx = ctx.with_cloud(cloud);
    }

    let mut config = InventoryConfig {
        metrics_concurrency: args.metrics_concurrency,
        describe_concurrency: args.describe_concurrency,
        describe_batch_size: args.batch_size,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        ..Default::default()
    };
    if let Some(namespace) = &args.namespace {
        config = config.with_namespace(namespace.clone());
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling outstanding reads");
            interrupt.cancel();
        }
    });

    let inventory = run_pass(&ctx, &config, cancel).await?;

    let diagnostics = &inventory.diagnostics;
    if !diagnostics.is_complete() {
        warn!(
            "Report is partial: pods {}, volume types {}, {} of {} nodes without stats",
            diagnostics.pods,
            diagnostics.volume_types,
            diagnostics.nodes_failed(),
            diagnostics.node_scrapes.len()
        );
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render(&inventory.rows, format, !args.no_headers, &mut out)?;
    out.flush()?;

    Ok(())
}

// =============================================================================
// Cloud Provider
// =============================================================================

#[cfg(feature = "ec2")]
async fn cloud_describer(args: &Args) -> Option<VolumeDescriberRef> {
    if args.no_cloud {
        debug!("Volume type lookups disabled");
        return None;
    }
    let describer = volume_inventory::Ec2VolumeDescriber::from_env(args.region.clone()).await;
    Some(Arc::new(describer))
}

#[cfg(not(feature = "ec2"))]
async fn cloud_describer(_args: &Args) -> Option<VolumeDescriberRef> {
    debug!("Built without a cloud provider; volume types not resolved");
    None
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=warn", "tower=warn", "aws_config=warn", "aws_smithy_runtime=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

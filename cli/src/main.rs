//! Rankstep CLI: runs one PageRank iteration step over tab-separated files

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rankstep::rankstep_core::{CancellationFlag, MissingRankPolicy, ViolationPolicy};
use rankstep::{accumulate_file, export_graph, JobResult, StepConfig, StepJob};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rankstep", version, about = "PageRank iteration step")]
struct Cli {
    /// Log output format
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Report output format
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum MissingRankArg {
    /// Treat a missing prior rank as 0
    Zero,
    /// Fail the step
    Error,
}

impl From<MissingRankArg> for MissingRankPolicy {
    fn from(arg: MissingRankArg) -> Self {
        match arg {
            MissingRankArg::Zero => MissingRankPolicy::Zero,
            MissingRankArg::Error => MissingRankPolicy::Error,
        }
    }
}

#[derive(Args)]
struct StepArgs {
    /// Transition file: `<page>\t<dest1>,<dest2>,...`
    transitions: PathBuf,

    /// Prior rank file: `<page>\t<rank>`
    ranks: PathBuf,

    /// YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Damping factor (beta) in [0, 1]
    #[arg(long, env = "RANKSTEP_DAMPING")]
    damping: Option<f64>,

    /// Worker threads for aggregation
    #[arg(long, env = "RANKSTEP_THREADS")]
    threads: Option<usize>,

    /// Policy for sources without a prior rank
    #[arg(long)]
    missing_rank: Option<MissingRankArg>,

    /// Drop the output of sources that break a numeric invariant
    #[arg(long)]
    suppress_violations: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute contributions for one iteration
    Step {
        #[command(flatten)]
        args: StepArgs,

        /// Contribution output file: `<destination>\t<amount>`
        output: PathBuf,
    },
    /// Sum contributions per destination into a rank file
    Sum {
        /// Contribution file
        contributions: PathBuf,

        /// Rank output file
        output: PathBuf,
    },
    /// Print contributions as force-graph JSON
    Export {
        #[command(flatten)]
        args: StepArgs,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_format);

    let result = match cli.command {
        Commands::Step { args, output } => run_step(args, output, &cli.format).await,
        Commands::Sum { contributions, output } => run_sum(contributions, output).await,
        Commands::Export { args } => run_export(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn build_config(args: &StepArgs) -> anyhow::Result<StepConfig> {
    let mut config = match &args.config {
        Some(path) => StepConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StepConfig::default(),
    };

    if let Some(damping) = args.damping {
        config.damping_factor = damping;
    }
    if let Some(threads) = args.threads {
        config.threads = Some(threads);
    }
    if let Some(policy) = args.missing_rank {
        config.missing_rank = policy.into();
    }
    if args.suppress_violations {
        config.on_violation = ViolationPolicy::Suppress;
    }

    config.validate()?;
    Ok(config)
}

/// Run blocking work off the runtime; Ctrl-C cancels at the next group boundary.
async fn run_cancellable<T, F>(cancel: CancellationFlag, work: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> JobResult<T> + Send + 'static,
{
    let mut handle = tokio::task::spawn_blocking(work);
    tokio::select! {
        result = &mut handle => Ok(result??),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, cancelling step");
            cancel.cancel();
            Ok(handle.await??)
        }
    }
}

async fn run_step(args: StepArgs, output: PathBuf, format: &OutputFormat) -> anyhow::Result<()> {
    let job = StepJob::new(build_config(&args)?)?;
    let cancel = job.cancellation();
    let StepArgs { transitions, ranks, .. } = args;

    let report = run_cancellable(cancel, move || job.run(&transitions, &ranks, &output)).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Transitions:    {}", report.transitions);
            println!("Edges:          {}", report.edges);
            println!("Ranks:          {}", report.ranks);
            println!("Groups:         {}", report.groups);
            println!("Contributions:  {}", report.contributions);
            println!("Dangling pages: {}", report.dangling_pages);
            println!("Missing ranks:  {}", report.missing_ranks);
            println!("Violations:     {}", report.violations);
        }
    }

    Ok(())
}

async fn run_sum(contributions: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let pages = tokio::task::spawn_blocking(move || accumulate_file(&contributions, &output)).await??;
    println!("{} page(s)", pages);
    Ok(())
}

async fn run_export(args: StepArgs) -> anyhow::Result<()> {
    let job = StepJob::new(build_config(&args)?)?;
    let cancel = job.cancellation();
    let StepArgs { transitions, ranks, .. } = args;

    let result = run_cancellable(cancel, move || job.compute(&transitions, &ranks)).await?;
    println!("{}", export_graph(&result.outputs).to_json_pretty()?);
    Ok(())
}

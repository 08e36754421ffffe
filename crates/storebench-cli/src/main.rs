//! Storebench Command-Line Runner
//!
//! Runs one benchmark session against the selected storage backends and
//! prints a side-by-side comparison.

mod formatter;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::sync::oneshot;
use formatter::{Formatter, OutputFormat};
use storebench_core::{
    open_configured, BackendKind, BenchConfig, BenchmarkOrchestrator, OperationCount,
};

/// Backend selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Embedded sled tree
    Sled,
    /// SQLite table behind the blocking pool
    Sqlite,
    /// In-process map
    Memory,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Sled => BackendKind::Sled,
            BackendArg::Sqlite => BackendKind::Sqlite,
            BackendArg::Memory => BackendKind::Memory,
        }
    }
}

/// Storebench Command-Line Runner
#[derive(Parser, Debug)]
#[command(name = "storebench")]
#[command(version, about = "Compare sequential key-value storage latency")]
pub struct Args {
    /// Operations per phase (100-1000, rounded to a multiple of 100)
    #[arg(short = 'n', long)]
    pub operations: Option<usize>,

    /// Backend to benchmark, in run order (repeatable)
    #[arg(short, long = "backend", value_enum)]
    pub backends: Vec<BackendArg>,

    /// Directory for file-backed stores (temporary stores if omitted)
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Simulated per-call latency of the memory backend in milliseconds
    #[arg(long)]
    pub memory_latency_ms: Option<u64>,

    /// JSON configuration file; command-line flags override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Do not print progress while running
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Build the session configuration.
    pub fn into_config(self) -> Result<BenchConfig, storebench_core::Error> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };

        if let Some(requested) = self.operations {
            let count = OperationCount::clamped(requested);
            if count.get() != requested {
                tracing::warn!(requested, using = count.get(), "operation count adjusted");
            }
            config = config.with_operation_count(count);
        }
        if !self.backends.is_empty() {
            config = config.with_backends(self.backends.into_iter().map(Into::into).collect());
        }
        if let Some(dir) = self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(ms) = self.memory_latency_ms {
            config = config.with_memory_latency(Duration::from_millis(ms));
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storebench=info,storebench_core=info".into()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let format = args.format;
    let quiet = args.quiet;
    let config = args.into_config()?;

    tracing::info!(
        operations = config.operation_count.get(),
        backends = ?config.backends,
        data_dir = ?config.data_dir,
        "configuration loaded"
    );

    let backends = open_configured(&config)?;
    let orchestrator = Arc::new(BenchmarkOrchestrator::with_backends(backends));
    orchestrator.set_operation_count(config.operation_count);

    let formatter: Arc<dyn Formatter> = Arc::from(formatter::create_formatter(format));

    let reporter = (!quiet).then(|| spawn_progress_reporter(&orchestrator, Arc::clone(&formatter)));

    let outcome = orchestrator.run_all().await;

    if let Some((done, handle)) = reporter {
        let _ = done.send(());
        let _ = handle.await;
        if formatter.redraws_progress() {
            eprintln!();
        }
    }

    let results = outcome?;
    println!("{}", formatter.format_results(&results));
    Ok(())
}

/// Print progress to stderr whenever it changes.
///
/// Pending updates are written before the task stops once `done` fires.
fn spawn_progress_reporter(
    orchestrator: &BenchmarkOrchestrator,
    formatter: Arc<dyn Formatter>,
) -> (oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let (done_tx, mut done) = oneshot::channel();
    let mut progress = orchestrator.subscribe_progress();
    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                changed = progress.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let value = *progress.borrow_and_update();
                    let mut stderr = std::io::stderr().lock();
                    let _ = write!(stderr, "{}", progress_line(formatter.as_ref(), value));
                    let _ = stderr.flush();
                }
                _ = &mut done => break,
            }
        }
    });
    (done_tx, handle)
}

/// Progress text as written to the terminal.
fn progress_line(formatter: &dyn Formatter, progress: f64) -> String {
    if formatter.redraws_progress() {
        format!("\r{}", formatter.format_progress(progress))
    } else {
        format!("{}\n", formatter.format_progress(progress))
    }
}

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use vigil::config::{Config, ReportMode};
use vigil::{vlog, vlog_error, vlog_warn, Orchestrator, Result};

/// How long in-flight tasks get to settle after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Vigil - runs background monitors in paced, isolated cycles
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    VIGIL_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.vigil/vigil.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Config file (default: ~/.vigil/vigil.toml)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Pause between cycles, in milliseconds
    #[arg(long)]
    pub pacing_ms: Option<u64>,

    /// Per-task timeout, in milliseconds (default: none)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// How cycle outcomes are reported
    #[arg(long, value_enum)]
    pub report: Option<ReportMode>,

    /// Stop after this many cycles
    #[arg(long)]
    pub cycles: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(ms) = self.pacing_ms {
            config.pacing_delay_ms = ms;
        }
        if let Some(ms) = self.timeout_ms {
            config.task_timeout_ms = Some(ms);
        }
        if let Some(report) = self.report {
            config.report = report;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    vigil::log::init(cli.debug);
    if cli.debug {
        vlog!("Vigil starting (debug mode enabled)");
    } else {
        vlog!("Vigil starting");
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply(&mut config);

    let mut orchestrator = match Orchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            vlog_error!("Invalid configuration: {}", e);
            return Err(e);
        }
    };
    if let Some(cycles) = cli.cycles {
        orchestrator = orchestrator.with_max_cycles(cycles);
    }

    let handle = orchestrator.spawn();
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        vlog!("Interrupt received, stopping after the current cycle");
        cancel.cancel();
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        vlog_warn!("Tasks still running after {:?}, exiting", SHUTDOWN_GRACE);
        std::process::exit(130);
    });

    let cycles = handle.join().await?;
    vlog!("Vigil stopped after {} cycles", cycles);
    Ok(())
}

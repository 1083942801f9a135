//! vlanswap - interactive VLAN replacement for one Cisco IOS switch
//!
//! Entry point for the vlanswap binary.

use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use vlanswap::{Workflow, WorkflowConfig, WorkflowOutcome, DEFAULT_DOMAIN};
use vlanswap_common::{SshConnector, SystemResolver, TerminalOperator, DEFAULT_SSH_PORT};

/// Move every access port in one VLAN to another VLAN on a Cisco IOS switch
#[derive(Parser, Debug)]
#[command(name = "vlanswap")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// DNS suffix appended to bare device names
    #[arg(long, env = "VLANSWAP_DOMAIN", default_value = DEFAULT_DOMAIN)]
    domain: String,

    /// SSH port on the device
    #[arg(short = 'p', long, env = "VLANSWAP_PORT", default_value_t = DEFAULT_SSH_PORT)]
    port: u16,

    /// TextFSM-style grammar for `show interfaces status` (built-in IOS grammar if unset)
    #[arg(short = 't', long, env = "VLANSWAP_TEMPLATE")]
    template: Option<PathBuf>,

    /// Seconds to wait for any single device prompt
    #[arg(long, env = "VLANSWAP_TIMEOUT_SECS", default_value = "60")]
    timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, env = "VLANSWAP_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn workflow_config(&self) -> WorkflowConfig {
        let config = WorkflowConfig::default()
            .with_domain(self.domain.clone())
            .with_port(self.port)
            .with_read_timeout(Duration::from_secs(self.timeout_secs));
        match &self.template {
            Some(path) => config.with_template(path.clone()),
            None => config,
        }
    }
}

/// Initializes tracing/logging subsystem
fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{}'", level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to set tracing subscriber: {}", e))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("vlanswap: {:#}", e);
        return ExitCode::FAILURE;
    }
    debug!(?args, "Starting vlanswap");

    let config = args.workflow_config();
    let connector = SshConnector::new(config.read_timeout);
    let workflow = match Workflow::new(connector, SystemResolver, config) {
        Ok(workflow) => workflow,
        Err(e) => {
            error!(error = %e, "Failed to load status template");
            eprintln!("vlanswap: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut operator = TerminalOperator::new();
    match workflow.run(&mut operator).await {
        WorkflowOutcome::Unresolved | WorkflowOutcome::ConnectFailed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

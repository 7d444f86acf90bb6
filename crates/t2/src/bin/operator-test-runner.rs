//! Operator Test Runner: runs an operator's integration tests on an
//! ephemeral Kubernetes cluster.
//!
//! Exits with the test script's exit code, or 255 if the configuration is
//! invalid or the cluster could not be created or terminated.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;

use t2::cluster::ProviderRegistry;
use t2::command::CommandRunner;
use t2::config::{RunnerArgs, RunnerConfig};
use t2::logging;
use t2::orchestrator::{TestRun, EXIT_CODE_CLUSTER_FAILED};

async fn run(args: RunnerArgs) -> Result<i32> {
    let verbose = args.verbose;
    let config = RunnerConfig::try_from(args).context("Invalid configuration")?;

    logging::init(verbose, Some(&config.testdriver_log()))
        .with_context(|| format!("Failed to open {}", config.testdriver_log().display()))?;

    let runner: Arc<dyn CommandRunner> = Arc::new(config.shell_runner());
    let registry = ProviderRegistry::with_defaults(&runner, config.poll, &config.kubeconfig);

    Ok(TestRun::new(&config, runner, registry).run().await)
}

#[tokio::main]
async fn main() {
    println!("testing.stackable.tech operator-test-runner");
    println!();
    println!("This app runs an operator integration test.");
    println!();

    let args = match RunnerArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(EXIT_CODE_CLUSTER_FAILED);
        }
    };

    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            EXIT_CODE_CLUSTER_FAILED
        }
    };
    std::process::exit(code);
}

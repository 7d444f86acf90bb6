//! Jenkins Job Builder: generates the operator test jobs from the catalog
//! and uploads them to Jenkins.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use t2::catalog::Catalog;
use t2::command::{CommandRunner, ShellRunner};
use t2::config::{JobBuilderArgs, JobBuilderConfig};
use t2::jobs;
use t2::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let args = JobBuilderArgs::parse();
    logging::init(args.verbose, None).context("Failed to initialize logging")?;
    let config = JobBuilderConfig::try_from(args).context("Invalid configuration")?;

    info!("testing.stackable.tech jenkins-job-builder");

    info!("Reading catalogs...");
    let catalog = Catalog::load(&config.platforms_files, &config.operator_tests_files)
        .context("Error reading catalog, jenkins-job-builder is aborted")?;

    let platforms = jobs::platform_metadata(&catalog);
    info!(
        "Collected platform metadata:\n{}",
        serde_json::to_string_pretty(&platforms).context("Failed to serialize platform metadata")?
    );

    let runner: Arc<dyn CommandRunner> = Arc::new(ShellRunner::new());
    jobs::build_jobs(runner, &config.jenkins, &catalog, &config.jjb_dir, config.dry_run)
        .await
        .context("Failed to configure the Jenkins jobs")?;

    Ok(())
}

//! Jenkins job generation.
//!
//! Renders Jenkins Job Builder (JJB) definitions for the weekly and custom
//! operator test jobs from the catalog and the operator versions published
//! in the Helm repositories, then uploads them with `jenkins-jobs`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, OperatorTest};
use crate::command::{CommandError, CommandRunner, RunOptions};
use crate::config::JenkinsConfig;

/// Slack channel notified by the test jobs.
pub const SLACK_CHANNEL: &str = "#team-testing";

/// Log store the test clusters ship their logs to.
pub const CLUSTER_LOGGING_ENDPOINT: &str = "https://search.t2.stackable.tech";

/// Dashboards linked from the test reports.
pub const OPENSEARCH_DASHBOARDS_URL: &str = "https://logs.t2.stackable.tech";

pub const JJB_CONF: &str = "jjb.conf";
pub const MAINTENANCE_JOBS: &str = "maintenance.yaml";
pub const WEEKLY_TRIGGER: &str = "trigger-weekly-tests.groovy";
pub const WEEKLY_TEST_JOBS: &str = "operator_weekly_tests.yaml";
pub const CUSTOM_TEST_JOBS: &str = "operator_custom_tests.yaml";

/// Job files uploaded to Jenkins, in order.
const JOB_FILES: [&str; 3] = [MAINTENANCE_JOBS, WEEKLY_TEST_JOBS, CUSTOM_TEST_JOBS];

const JENKINS_JOBS_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Error, Debug)]
pub enum JobsError {
    #[error("Failed to read template {}: {source}", path.display())]
    ReadTemplate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to render {name}: {source}")]
    Render {
        name: &'static str,
        source: Box<handlebars::RenderError>,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Display name and supported versions of a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformMetadata {
    pub name: String,
    pub versions: Vec<String>,
}

/// Operator name (without repository prefix) to its chart versions.
pub type OperatorVersions = BTreeMap<String, Vec<String>>;

/// Platform metadata keyed by platform id.
#[must_use]
pub fn platform_metadata(catalog: &Catalog) -> BTreeMap<String, PlatformMetadata> {
    catalog
        .platforms
        .iter()
        .map(|p| {
            (
                p.id.clone(),
                PlatformMetadata {
                    name: p.name.clone(),
                    versions: p.versions.clone(),
                },
            )
        })
        .collect()
}

/// Parse `helm search repo --versions --devel` output.
///
/// Only charts of Stackable repositories named `*-operator` are kept.
/// Versions are sorted lexically and deduplicated across repositories.
#[must_use]
pub fn parse_helm_search<S: AsRef<str>>(lines: &[S]) -> OperatorVersions {
    let mut result = OperatorVersions::new();
    for line in lines {
        let mut columns = line.as_ref().split_whitespace();
        let (Some(chart), Some(version)) = (columns.next(), columns.next()) else {
            continue;
        };
        let Some((repo, operator)) = chart.split_once('/') else {
            continue;
        };
        if !repo.contains("stackable") || !operator.contains("-operator") {
            continue;
        }
        result
            .entry(operator.to_string())
            .or_default()
            .push(version.to_string());
    }
    for versions in result.values_mut() {
        versions.sort();
        versions.dedup();
    }
    result
}

/// Refresh the Helm repositories and read all published operator versions.
///
/// # Errors
/// Returns an error if `helm search` fails.
pub async fn read_helm_operator_versions(runner: &dyn CommandRunner) -> Result<OperatorVersions, JobsError> {
    let opts = RunOptions::default();
    let update = runner.run("helm repo update", "helm repo update", &opts).await;
    if !update.success() {
        warn!(output = ?update.lines, "helm repo update failed, using cached indexes");
    }
    let lines = runner
        .run("helm search repo --versions --devel", "helm search repo", &opts)
        .await
        .into_result("helm search repo")?;
    Ok(parse_helm_search(&lines))
}

#[derive(Serialize)]
struct JenkinsContext<'a> {
    jenkins: &'a JenkinsConfig,
}

#[derive(Serialize)]
struct TestJobsContext<'a> {
    testsuites: &'a [OperatorTest],
    platforms: &'a BTreeMap<String, PlatformMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operator_versions: Option<&'a OperatorVersions>,
    slack_channel: &'static str,
    cluster_logging_endpoint: &'static str,
    opensearch_dashboards_url: &'static str,
}

/// Renders JJB files from `<name>.hbs` templates in a directory.
pub struct JobRenderer<'a> {
    handlebars: Handlebars<'a>,
    jjb_dir: PathBuf,
}

impl JobRenderer<'_> {
    /// Templates are read from, and rendered files written to, `jjb_dir`.
    #[must_use]
    pub fn new(jjb_dir: impl Into<PathBuf>) -> Self {
        let mut handlebars = Handlebars::new();
        // YAML, INI and Groovy, not HTML.
        handlebars.register_escape_fn(handlebars::no_escape);
        Self {
            handlebars,
            jjb_dir: jjb_dir.into(),
        }
    }

    fn render<T: Serialize>(&self, name: &'static str, context: &T) -> Result<PathBuf, JobsError> {
        let template_path = self.jjb_dir.join(format!("{name}.hbs"));
        let template = std::fs::read_to_string(&template_path).map_err(|source| JobsError::ReadTemplate {
            path: template_path.clone(),
            source,
        })?;

        let rendered = self
            .handlebars
            .render_template(&template, context)
            .map_err(|source| JobsError::Render {
                name,
                source: Box::new(source),
            })?;

        let path = self.jjb_dir.join(name);
        std::fs::write(&path, rendered).map_err(|source| JobsError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Rendered JJB file");
        Ok(path)
    }

    /// Render `jjb.conf` and all job files.
    ///
    /// # Errors
    /// Returns an error if a template is missing or fails to render.
    pub fn render_all(
        &self,
        jenkins: &JenkinsConfig,
        catalog: &Catalog,
        operator_versions: &OperatorVersions,
    ) -> Result<(), JobsError> {
        let platforms = platform_metadata(catalog);
        let jenkins_context = JenkinsContext { jenkins };
        let weekly = TestJobsContext {
            testsuites: &catalog.operator_tests,
            platforms: &platforms,
            operator_versions: None,
            slack_channel: SLACK_CHANNEL,
            cluster_logging_endpoint: CLUSTER_LOGGING_ENDPOINT,
            opensearch_dashboards_url: OPENSEARCH_DASHBOARDS_URL,
        };
        let custom = TestJobsContext {
            operator_versions: Some(operator_versions),
            ..weekly
        };

        self.render(JJB_CONF, &jenkins_context)?;
        self.render(MAINTENANCE_JOBS, &jenkins_context)?;
        self.render(WEEKLY_TRIGGER, &weekly)?;
        self.render(WEEKLY_TEST_JOBS, &weekly)?;
        self.render(CUSTOM_TEST_JOBS, &custom)?;
        Ok(())
    }
}

/// Upload the rendered job files with `jenkins-jobs`.
///
/// # Errors
/// Returns an error for the first file Jenkins rejects.
pub async fn update_jenkins_jobs(runner: &dyn CommandRunner, jjb_dir: &Path) -> Result<(), JobsError> {
    let conf = jjb_dir.join(JJB_CONF);
    let opts = RunOptions::default().with_timeout(JENKINS_JOBS_TIMEOUT);
    for file in JOB_FILES {
        info!("Updating jobs from {file}...");
        let command = format!(
            "jenkins-jobs --conf {} update {}",
            conf.display(),
            jjb_dir.join(file).display()
        );
        runner
            .run(&command, "jenkins-jobs update", &opts)
            .await
            .into_result("jenkins-jobs update")?;
    }
    Ok(())
}

/// Generate all job files and, unless `dry_run`, upload them.
///
/// # Errors
/// Returns an error if reading the Helm repositories, rendering or
/// uploading fails.
pub async fn build_jobs(
    runner: Arc<dyn CommandRunner>,
    jenkins: &JenkinsConfig,
    catalog: &Catalog,
    jjb_dir: &Path,
    dry_run: bool,
) -> Result<(), JobsError> {
    info!("Reading current operator versions from Helm repository...");
    let operator_versions = read_helm_operator_versions(runner.as_ref()).await?;
    for (operator, versions) in &operator_versions {
        info!(%operator, "{} versions: [{}]", versions.len(), versions.join(","));
    }

    info!("Generating JJB files...");
    JobRenderer::new(jjb_dir).render_all(jenkins, catalog, &operator_versions)?;

    if dry_run {
        info!("Dry run, not updating Jenkins.");
        return Ok(());
    }

    info!("Running JJB...");
    update_jenkins_jobs(runner.as_ref(), jjb_dir).await?;
    info!("Successfully created Jenkins jobs.");
    Ok(())
}

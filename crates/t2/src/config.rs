//! Configuration of the two binaries.
//!
//! Both binaries are configured through environment variables (they run as
//! containers in Jenkins); every variable is also accepted as a CLI flag.
//! Values are trimmed, and a missing required value is reported with the
//! name of its environment variable.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::cluster_logging::LoggingTarget;
use crate::command::ShellRunner;
use crate::providers::{
    PollConfig, DEFAULT_KUBECONFIG, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS,
};

pub const ENV_REPLICATED_API_TOKEN: &str = "REPLICATED_API_TOKEN";
pub const ENV_IONOS_USERNAME: &str = "IONOS_USERNAME";
pub const ENV_IONOS_PASSWORD: &str = "IONOS_PASSWORD";
pub const ENV_KUBECONFIG: &str = "KUBECONFIG";

const TESTDRIVER_LOG_FILE: &str = "testdriver.log";
const TEST_OUTPUT_LOG_FILE: &str = "test-output.log";
const CLUSTER_INFO_FILE: &str = "cluster-info.txt";
const LOGS_HTML_FILE: &str = "logs.html";

/// Invalid or incomplete configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Please supply {0} as an environment variable.")]
    Missing(&'static str),

    #[error("A target folder volume has to be supplied as mount on {}.", .0.display())]
    TargetFolderMissing(PathBuf),
}

/// Operator Test Runner: runs an operator integration test on a fresh cluster.
#[derive(Parser, Debug, Clone)]
#[command(name = "operator-test-runner")]
#[command(about = "Run an operator integration test on an ephemeral Kubernetes cluster")]
pub struct RunnerArgs {
    /// API token for replicated.com.
    #[arg(long, env = "REPLICATED_API_TOKEN", hide_env_values = true)]
    pub replicated_api_token: Option<String>,

    /// IONOS Cloud user.
    #[arg(long, env = "IONOS_USERNAME")]
    pub ionos_username: Option<String>,

    /// IONOS Cloud password.
    #[arg(long, env = "IONOS_PASSWORD", hide_env_values = true)]
    pub ionos_password: Option<String>,

    /// Platform id or display name from the catalog.
    #[arg(long, env = "PLATFORM")]
    pub platform: Option<String>,

    /// Kubernetes version of the platform.
    #[arg(long, env = "PLATFORM_VERSION")]
    pub platform_version: Option<String>,

    /// Operator repository, e.g. `zookeeper-operator`.
    #[arg(long, env = "OPERATOR")]
    pub operator: Option<String>,

    /// Operator version to install.
    #[arg(long, env = "OPERATOR_VERSION")]
    pub operator_version: Option<String>,

    /// Endpoint of the central log store.
    #[arg(long, env = "CLUSTER_LOGGING_ENDPOINT")]
    pub cluster_logging_endpoint: Option<String>,

    #[arg(long, env = "CLUSTER_LOGGING_USERNAME")]
    pub cluster_logging_username: Option<String>,

    #[arg(long, env = "CLUSTER_LOGGING_PASSWORD", hide_env_values = true)]
    pub cluster_logging_password: Option<String>,

    /// `uid:gid` owning the files written to the target folder.
    #[arg(long, env = "OUTPUT_FILE_USER", default_value = "0:0")]
    pub output_file_user: String,

    /// Branch of the operator repository to test.
    #[arg(long, env = "GIT_BRANCH")]
    pub git_branch: Option<String>,

    /// Extra parameters passed to the test script.
    #[arg(long, env = "TEST_SCRIPT_PARAMS", default_value = "", allow_hyphen_values = true)]
    pub test_script_params: String,

    /// OpenSearch Dashboards base URL; enables `logs.html`.
    #[arg(long, env = "OPENSEARCH_DASHBOARDS_URL")]
    pub opensearch_dashboards_url: Option<String>,

    /// Folder receiving logs and reports (a mounted volume).
    #[arg(long, env = "TARGET_FOLDER", default_value = "/target/")]
    pub target_folder: PathBuf,

    /// Platforms catalog files, merged in order.
    #[arg(long, env = "PLATFORMS_FILES", value_delimiter = ',', default_value = "/platforms.yaml")]
    pub platforms_files: Vec<PathBuf>,

    /// Operator tests catalog files, merged in order.
    #[arg(
        long,
        env = "OPERATOR_TESTS_FILES",
        value_delimiter = ',',
        default_value = "/operator-tests.yaml"
    )]
    pub operator_tests_files: Vec<PathBuf>,

    /// Vector values files and manifests of the cluster logging add-on.
    #[arg(long, env = "CLUSTER_LOGGING_DIR", default_value = "/src/modules/.cluster_logging")]
    pub cluster_logging_dir: PathBuf,

    /// Kubeconfig written by the providers and exported as `KUBECONFIG` to
    /// kubectl, helm and the test script.
    #[arg(long, env = "KUBECONFIG_PATH", default_value = DEFAULT_KUBECONFIG)]
    pub kubeconfig: PathBuf,

    /// File the test command writes its exit code to.
    #[arg(long, env = "TEST_EXIT_CODE_FILE", default_value = "/test_exit_code")]
    pub test_exit_code_file: PathBuf,

    /// Seconds between two provider state polls.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval: u64,

    /// Seconds after which a provider resource is given up on.
    #[arg(long, default_value_t = DEFAULT_POLL_TIMEOUT_SECS)]
    pub poll_timeout: u64,

    /// Seconds to wait for a fresh cluster, the logging add-on and log
    /// processing.
    #[arg(long, default_value_t = 60)]
    pub settle_secs: u64,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,
}

/// Fixed pauses between the steps of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTimes {
    /// After creating the cluster.
    pub cluster_ready: Duration,
    /// After installing cluster logging.
    pub logging_ready: Duration,
    /// After the tests, so their logs reach the log store.
    pub log_processing: Duration,
    /// Before reading the test exit code file.
    pub exit_code: Duration,
}

impl Default for SettleTimes {
    fn default() -> Self {
        Self {
            cluster_ready: Duration::from_secs(60),
            logging_ready: Duration::from_secs(60),
            log_processing: Duration::from_secs(60),
            exit_code: Duration::from_secs(15),
        }
    }
}

/// Provider credentials, handed to spawned CLIs as environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub replicated_api_token: String,
    pub ionos_username: String,
    pub ionos_password: String,
}

/// Validated configuration of the Operator Test Runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub credentials: Credentials,
    pub platform: String,
    pub platform_version: String,
    pub operator: String,
    pub operator_version: String,
    pub logging_target: LoggingTarget,
    pub output_file_user: String,
    pub git_branch: Option<String>,
    pub test_script_params: String,
    pub opensearch_dashboards_url: Option<String>,
    pub target_folder: PathBuf,
    pub platforms_files: Vec<PathBuf>,
    pub operator_tests_files: Vec<PathBuf>,
    pub cluster_logging_dir: PathBuf,
    pub kubeconfig: PathBuf,
    pub test_exit_code_file: PathBuf,
    pub poll: PollConfig,
    pub settle: SettleTimes,
}

fn required(value: Option<String>, env: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(env))
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TryFrom<RunnerArgs> for RunnerConfig {
    type Error = ConfigError;

    fn try_from(args: RunnerArgs) -> Result<Self, Self::Error> {
        let credentials = Credentials {
            replicated_api_token: required(args.replicated_api_token, ENV_REPLICATED_API_TOKEN)?,
            ionos_username: required(args.ionos_username, ENV_IONOS_USERNAME)?,
            ionos_password: required(args.ionos_password, ENV_IONOS_PASSWORD)?,
        };
        let platform = required(args.platform, "PLATFORM")?;
        let platform_version = required(args.platform_version, "PLATFORM_VERSION")?;
        let operator = required(args.operator, "OPERATOR")?;
        let operator_version = required(args.operator_version, "OPERATOR_VERSION")?;
        let logging_target = LoggingTarget {
            endpoint: required(args.cluster_logging_endpoint, "CLUSTER_LOGGING_ENDPOINT")?,
            username: required(args.cluster_logging_username, "CLUSTER_LOGGING_USERNAME")?,
            password: required(args.cluster_logging_password, "CLUSTER_LOGGING_PASSWORD")?,
        };

        if !args.target_folder.is_dir() {
            return Err(ConfigError::TargetFolderMissing(args.target_folder));
        }

        let settle = Duration::from_secs(args.settle_secs);

        Ok(Self {
            credentials,
            platform,
            platform_version,
            operator,
            operator_version,
            logging_target,
            output_file_user: args.output_file_user.trim().to_string(),
            git_branch: optional(args.git_branch),
            test_script_params: args.test_script_params.trim().to_string(),
            opensearch_dashboards_url: optional(args.opensearch_dashboards_url),
            target_folder: args.target_folder,
            platforms_files: args.platforms_files,
            operator_tests_files: args.operator_tests_files,
            cluster_logging_dir: args.cluster_logging_dir,
            kubeconfig: args.kubeconfig,
            test_exit_code_file: args.test_exit_code_file,
            poll: PollConfig {
                interval: Duration::from_secs(args.poll_interval),
                timeout: Duration::from_secs(args.poll_timeout),
            },
            settle: SettleTimes {
                cluster_ready: settle,
                logging_ready: settle,
                log_processing: settle,
                ..SettleTimes::default()
            },
        })
    }
}

impl RunnerConfig {
    /// Shell runner passing the provider credentials and the kubeconfig
    /// location to every CLI it spawns.
    #[must_use]
    pub fn shell_runner(&self) -> ShellRunner {
        ShellRunner::new()
            .with_env(ENV_KUBECONFIG, self.kubeconfig.display().to_string())
            .with_env(ENV_REPLICATED_API_TOKEN, &self.credentials.replicated_api_token)
            .with_env(ENV_IONOS_USERNAME, &self.credentials.ionos_username)
            .with_env(ENV_IONOS_PASSWORD, &self.credentials.ionos_password)
    }

    fn target_file(&self, name: &str) -> PathBuf {
        self.target_folder.join(name)
    }

    #[must_use]
    pub fn testdriver_log(&self) -> PathBuf {
        self.target_file(TESTDRIVER_LOG_FILE)
    }

    #[must_use]
    pub fn test_output_log(&self) -> PathBuf {
        self.target_file(TEST_OUTPUT_LOG_FILE)
    }

    #[must_use]
    pub fn cluster_info_file(&self) -> PathBuf {
        self.target_file(CLUSTER_INFO_FILE)
    }

    #[must_use]
    pub fn logs_html(&self) -> PathBuf {
        self.target_file(LOGS_HTML_FILE)
    }
}

/// Jenkins Job Builder: generates and uploads the Jenkins test jobs.
#[derive(Parser, Debug, Clone)]
#[command(name = "jenkins-job-builder")]
#[command(about = "Configure the Jenkins jobs for the operator tests")]
pub struct JobBuilderArgs {
    #[arg(long, env = "JENKINS_URL")]
    pub jenkins_url: Option<String>,

    #[arg(long, env = "JENKINS_USERNAME")]
    pub jenkins_username: Option<String>,

    #[arg(long, env = "JENKINS_PASSWORD", hide_env_values = true)]
    pub jenkins_password: Option<String>,

    /// Directory with the JJB templates; generated files are written here.
    #[arg(long, env = "JJB_DIR", default_value = "/jjb")]
    pub jjb_dir: PathBuf,

    /// Platforms catalog files, merged in order.
    #[arg(long, env = "PLATFORMS_FILES", value_delimiter = ',', default_value = "/platforms.yaml")]
    pub platforms_files: Vec<PathBuf>,

    /// Operator tests catalog files, merged in order.
    #[arg(
        long,
        env = "OPERATOR_TESTS_FILES",
        value_delimiter = ',',
        default_value = "/operator-tests.yaml"
    )]
    pub operator_tests_files: Vec<PathBuf>,

    /// Render the files but do not run `jenkins-jobs`.
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,
}

/// Jenkins access, rendered into `jjb.conf`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct JenkinsConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

/// Validated configuration of the Jenkins Job Builder.
#[derive(Debug, Clone)]
pub struct JobBuilderConfig {
    pub jenkins: JenkinsConfig,
    pub jjb_dir: PathBuf,
    pub platforms_files: Vec<PathBuf>,
    pub operator_tests_files: Vec<PathBuf>,
    pub dry_run: bool,
}

impl TryFrom<JobBuilderArgs> for JobBuilderConfig {
    type Error = ConfigError;

    fn try_from(args: JobBuilderArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            jenkins: JenkinsConfig {
                url: required(args.jenkins_url, "JENKINS_URL")?,
                username: required(args.jenkins_username, "JENKINS_USERNAME")?,
                password: required(args.jenkins_password, "JENKINS_PASSWORD")?,
            },
            jjb_dir: args.jjb_dir,
            platforms_files: args.platforms_files,
            operator_tests_files: args.operator_tests_files,
            dry_run: args.dry_run,
        })
    }
}

impl JobBuilderConfig {
    #[must_use]
    pub fn jjb_file(&self, name: &str) -> PathBuf {
        self.jjb_dir.join(name)
    }
}

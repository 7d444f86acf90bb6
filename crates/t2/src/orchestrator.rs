//! A single operator test run from cluster creation to teardown.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::catalog::{AutoRetryConfig, Catalog, CatalogError, Platform, AUTO_RETRY_TEST_SCRIPT};
use crate::cluster::{ClusterError, ProviderRegistry};
use crate::cluster_logging::ClusterLogging;
use crate::command::{CommandRunner, RunOptions, EXIT_CODE_TIMEOUT};
use crate::config::RunnerConfig;
use crate::providers::{ClusterSpec, CreateClusterRequest};
use crate::report;

/// Exit code for every failure that is not the test's own: configuration,
/// catalog, cluster creation or termination ("unstable cluster").
pub const EXIT_CODE_CLUSTER_FAILED: i32 = 255;

/// Exit code reported when the test's exit code file cannot be read.
pub const EXIT_CODE_UNKNOWN_TEST_RESULT: i32 = 1;

const GITHUB_ORG_URL: &str = "https://github.com/stackabletech";

const INSTALL_RETRIES: u32 = 10;
const INSTALL_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Errors which abort a run before a cluster exists.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Error reading catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("The platform '{0}' does not exist.")]
    UnknownPlatform(String),

    #[error("The version '{version}' does not exist for platform '{platform}'.")]
    UnsupportedVersion { platform: String, version: String },

    #[error("Cluster could not be created: {0}")]
    Cluster(#[from] ClusterError),
}

/// Fixed pause, e.g. to let a fresh cluster settle.
pub async fn settle(what: &str, duration: Duration) {
    if duration.is_zero() {
        return;
    }
    info!("Waiting {}s for {what}...", duration.as_secs());
    tokio::time::sleep(duration).await;
}

/// Split `TEST_SCRIPT_PARAMS` into the `--parallel` value (default `0`) and
/// the remaining arguments.
#[must_use]
pub fn split_parallel_param(params: &str) -> (String, Vec<String>) {
    let mut parallel = "0".to_string();
    let mut extra = Vec::new();
    let mut tokens = params.split_whitespace();

    while let Some(token) = tokens.next() {
        if token == "--parallel" {
            if let Some(value) = tokens.next() {
                parallel = value.to_string();
            }
        } else if let Some(value) = token.strip_prefix("--parallel=") {
            parallel = value.to_string();
        } else {
            extra.push(token.to_string());
        }
    }
    (parallel, extra)
}

/// Command installing the platform for the operator under test.
#[must_use]
pub fn install_command(operator: &str, operator_version: &str) -> String {
    format!(
        "cd {operator}/ && python ./scripts/run-tests --skip-tests --operator {}={operator_version}",
        operator.replace("-operator", "")
    )
}

/// What the test command runs and where it reports to.
#[derive(Debug, Clone)]
pub struct TestCommand<'a> {
    pub operator: &'a str,
    pub test_script: &'a str,
    pub auto_retry: AutoRetryConfig,
    pub params: &'a str,
    pub exit_code_file: &'a Path,
    pub output_log: &'a Path,
}

impl TestCommand<'_> {
    fn script_invocation(&self) -> Vec<String> {
        if self.test_script == AUTO_RETRY_TEST_SCRIPT {
            let (parallel, extra) = split_parallel_param(self.params);
            let mut parts = vec![
                format!("python ./scripts/{AUTO_RETRY_TEST_SCRIPT}"),
                format!("--parallel {parallel}"),
                format!("--attempts-parallel {}", self.auto_retry.attempts_parallel),
                format!("--attempts-serial {}", self.auto_retry.attempts_serial),
            ];
            if !self.auto_retry.delete_failed_namespaces {
                parts.push("--keep-failed-namespaces".to_string());
            }
            if !extra.is_empty() {
                parts.push("--extra-args".to_string());
                parts.extend(extra);
            }
            parts
        } else {
            let mut parts = vec!["python ./scripts/run-tests --skip-release".to_string()];
            if !self.params.contains("--log-level") {
                parts.push("--log-level debug".to_string());
            }
            if !self.params.is_empty() {
                parts.push(self.params.to_string());
            }
            parts
        }
    }

    /// Shell command running the tests, teeing their output into the
    /// output log and writing the script's exit code to the exit code file.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "(cd {}/ && {} 2>&1; echo $? > {}) | tee {}",
            self.operator,
            self.script_invocation().join(" "),
            self.exit_code_file.display(),
            self.output_log.display()
        )
    }
}

/// Parse the content of the exit code file.
#[must_use]
pub fn parse_exit_code(content: &str) -> Option<i32> {
    content.trim().parse().ok()
}

/// One test run: owns nothing but borrows the validated configuration.
pub struct TestRun<'a> {
    config: &'a RunnerConfig,
    runner: Arc<dyn CommandRunner>,
    registry: ProviderRegistry,
    logging: ClusterLogging,
}

impl<'a> TestRun<'a> {
    #[must_use]
    pub fn new(config: &'a RunnerConfig, runner: Arc<dyn CommandRunner>, registry: ProviderRegistry) -> Self {
        let logging = ClusterLogging::new(runner.clone(), &config.cluster_logging_dir);
        Self {
            config,
            runner,
            registry,
            logging,
        }
    }

    /// Hand the target folder to `OUTPUT_FILE_USER`; the run itself is root.
    async fn chown_target_folder(&self) {
        let command = format!(
            "chown -R {} {}",
            self.config.output_file_user,
            self.config.target_folder.display()
        );
        let output = self.runner.run(&command, "chown", &RunOptions::default()).await;
        if !output.success() {
            warn!(output = ?output.lines, "Failed to change owner of the target folder");
        }
    }

    fn select_platform<'c>(&self, catalog: &'c Catalog) -> Result<(&'c Platform, ClusterSpec), RunError> {
        let platform = catalog
            .find_platform(&self.config.platform)
            .ok_or_else(|| RunError::UnknownPlatform(self.config.platform.clone()))?;

        if !platform.versions.contains(&self.config.platform_version) {
            return Err(RunError::UnsupportedVersion {
                platform: self.config.platform.clone(),
                version: self.config.platform_version.clone(),
            });
        }
        info!(
            "Test running on platform '{}', version {}.",
            platform.id, self.config.platform_version
        );

        let spec = catalog.resolve_spec(&self.config.operator, &platform.id)?;
        Ok((platform, spec))
    }

    async fn clone_git_repo(&self) -> bool {
        let branch = self
            .config
            .git_branch
            .as_ref()
            .map(|b| format!("-b {b} "))
            .unwrap_or_default();
        let command = format!("git clone {branch}{GITHUB_ORG_URL}/{}.git", self.config.operator);
        let output = self.runner.run(&command, "git clone", &RunOptions::default()).await;
        if !output.success() {
            for line in &output.lines {
                error!("{line}");
            }
        }
        output.success()
    }

    async fn run_tests(&self, catalog: &Catalog) -> i32 {
        let operator = self.config.operator.as_str();
        let test_script = catalog.test_script(operator);
        info!("Using test script: {test_script}");

        let install = install_command(operator, &self.config.operator_version);
        info!("Running the following command to install SDP for test:");
        info!("{install}");
        let opts = RunOptions::default().with_retries(INSTALL_RETRIES, INSTALL_RETRY_DELAY);
        let output = self.runner.run(&install, "install sdp", &opts).await;
        if !output.success() {
            for line in &output.lines {
                error!("{line}");
            }
            return output.exit_code;
        }

        let auto_retry = catalog.auto_retry_config(operator);
        if test_script == AUTO_RETRY_TEST_SCRIPT {
            info!(
                "Auto-retry configuration: attempts_parallel={}, attempts_serial={}, delete_failed_namespaces={}",
                auto_retry.attempts_parallel, auto_retry.attempts_serial, auto_retry.delete_failed_namespaces
            );
        }

        let output_log = self.config.test_output_log();
        let command = TestCommand {
            operator,
            test_script,
            auto_retry,
            params: &self.config.test_script_params,
            exit_code_file: &self.config.test_exit_code_file,
            output_log: &output_log,
        }
        .render();
        info!("Running the following test command:");
        info!("{command}");
        if self.runner.stream(&command).await == EXIT_CODE_TIMEOUT {
            warn!("The test command could not be run to completion, ignoring any test exit code file");
            return EXIT_CODE_UNKNOWN_TEST_RESULT;
        }

        settle("the test exit code", self.config.settle.exit_code).await;
        let path = &self.config.test_exit_code_file;
        match std::fs::read_to_string(path).map(|c| parse_exit_code(&c)) {
            Ok(Some(code)) => code,
            Ok(None) => {
                error!(path = %path.display(), "Test exit code file does not contain an exit code");
                EXIT_CODE_UNKNOWN_TEST_RESULT
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read test exit code file");
                EXIT_CODE_UNKNOWN_TEST_RESULT
            }
        }
    }

    /// Run the test and return the process exit code.
    pub async fn run(&self) -> i32 {
        let started = Utc::now();
        self.chown_target_folder().await;

        info!("Reading catalog...");
        let catalog = match Catalog::load(&self.config.platforms_files, &self.config.operator_tests_files) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("{}", RunError::from(e));
                error!("Error reading catalog, operator-test-runner is aborted.");
                return EXIT_CODE_CLUSTER_FAILED;
            }
        };

        let (platform, spec) = match self.select_platform(&catalog) {
            Ok(selected) => selected,
            Err(e) => {
                error!("{e}");
                error!("Cluster spec could not be determined.");
                return EXIT_CODE_CLUSTER_FAILED;
            }
        };

        info!(
            "Test running on Git Branch {} with the test script parameters '{}'...",
            self.config.git_branch.as_deref().unwrap_or("None"),
            self.config.test_script_params
        );

        let cluster_id = uuid::Uuid::new_v4().simple().to_string();
        let request = CreateClusterRequest {
            id: cluster_id.clone(),
            spec,
            platform_version: self.config.platform_version.clone(),
            cluster_info_file: self.config.cluster_info_file(),
        };

        info!(cluster_id = %cluster_id, "Creating cluster...");
        let handle = match self.registry.create_cluster(&platform.provider, &request).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("{}", RunError::from(e));
                return EXIT_CODE_CLUSTER_FAILED;
            }
        };

        info!("Cloning git repo...");
        self.clone_git_repo().await;

        settle("the cluster to become ready", self.config.settle.cluster_ready).await;

        info!("Install Cluster Logging (powered by Vector)...");
        match self.logging.install(&cluster_id, &self.config.logging_target).await {
            Ok(()) => info!("Installed Cluster Logging (powered by Vector)."),
            Err(e) => error!(error = %e, "Error installing Cluster Logging, continuing without it..."),
        }
        self.chown_target_folder().await;

        settle("the cluster logging to become ready", self.config.settle.logging_ready).await;

        info!("Running tests...");
        let test_exit_code = self.run_tests(&catalog).await;
        info!("Test exited with code {test_exit_code}");

        settle("logs to be processed", self.config.settle.log_processing).await;

        let terminated = self.registry.terminate_cluster(&platform.provider, handle).await.is_ok();

        if let Some(url) = &self.config.opensearch_dashboards_url {
            if let Err(e) = report::write_logs_html(&self.config.logs_html(), &cluster_id, started, Utc::now(), url) {
                error!(error = %e, "Failed to write log links");
            }
        }

        // The test script may have left root-owned files behind.
        self.chown_target_folder().await;

        if !terminated {
            error!("Cluster could not be terminated.");
            return EXIT_CODE_CLUSTER_FAILED;
        }
        test_exit_code
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cluster_logging::LoggingTarget;
    use crate::command::fake::ScriptedRunner;
    use crate::command::CommandOutput;
    use crate::config::{Credentials, SettleTimes};
    use crate::providers::{ClusterHandle, ClusterProvider, PollConfig, ProviderError};

    const PLATFORMS: &str = r"
providers:
  - id: fake
platforms:
  - id: fake-k8s
    name: Fake Kubernetes
    provider: fake
    spec:
      nodes: 3
    versions: ['1.31.2']
";

    const OPERATOR_TESTS: &str = r"
- id: zookeeper-operator
  platforms:
    - id: fake-k8s
- id: kafka-operator
  test_script: auto-retry-tests.py
  auto_retry:
    delete_failed_namespaces: false
  platforms:
    - id: fake-k8s
";

    #[derive(Default)]
    struct FakeProvider {
        created: AtomicUsize,
        terminated: AtomicUsize,
        fail_create: bool,
        fail_terminate: bool,
    }

    #[async_trait]
    impl ClusterProvider for Arc<FakeProvider> {
        fn id(&self) -> &'static str {
            "fake"
        }

        async fn create_cluster(&self, req: &CreateClusterRequest) -> Result<ClusterHandle, ProviderError> {
            if self.fail_create {
                return Err(ProviderError::MissingSpecKey("nodes".to_string()));
            }
            assert_eq!(req.spec.arg("nodes").unwrap(), "3");
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(ClusterHandle::Replicated { name: req.id.clone() })
        }

        async fn terminate_cluster(&self, _handle: ClusterHandle) -> Result<(), ProviderError> {
            self.terminated.fetch_add(1, Ordering::SeqCst);
            if self.fail_terminate {
                return Err(ProviderError::MissingSpecKey("gone".to_string()));
            }
            Ok(())
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        config: RunnerConfig,
    }

    fn fixture(operator: &str, platform: &str, version: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(dir.path().join("platforms.yaml"), PLATFORMS).unwrap();
        std::fs::write(dir.path().join("operator-tests.yaml"), OPERATOR_TESTS).unwrap();

        let config = RunnerConfig {
            credentials: Credentials {
                replicated_api_token: "token".to_string(),
                ionos_username: "user".to_string(),
                ionos_password: "pw".to_string(),
            },
            platform: platform.to_string(),
            platform_version: version.to_string(),
            operator: operator.to_string(),
            operator_version: "24.7.0".to_string(),
            logging_target: LoggingTarget {
                endpoint: "https://search.example.com".to_string(),
                username: "t2".to_string(),
                password: "pw".to_string(),
            },
            output_file_user: "1000:1000".to_string(),
            git_branch: Some("main".to_string()),
            test_script_params: String::new(),
            opensearch_dashboards_url: Some("https://logs.example.com".to_string()),
            target_folder: target,
            platforms_files: vec![dir.path().join("platforms.yaml")],
            operator_tests_files: vec![dir.path().join("operator-tests.yaml")],
            cluster_logging_dir: PathBuf::from("/assets"),
            kubeconfig: dir.path().join("kubeconfig"),
            test_exit_code_file: dir.path().join("test_exit_code"),
            poll: PollConfig::default(),
            settle: SettleTimes::default(),
        };
        Fixture { dir, config }
    }

    fn registry(provider: &Arc<FakeProvider>) -> ProviderRegistry {
        ProviderRegistry::new().register(provider.clone())
    }

    #[test]
    fn test_split_parallel_param() {
        assert_eq!(split_parallel_param(""), ("0".to_string(), vec![]));
        assert_eq!(
            split_parallel_param("--parallel 4 --test-suite nightly"),
            ("4".to_string(), vec!["--test-suite".to_string(), "nightly".to_string()])
        );
        assert_eq!(
            split_parallel_param("--skip-delete --parallel=2"),
            ("2".to_string(), vec!["--skip-delete".to_string()])
        );
        assert_eq!(split_parallel_param("--parallel"), ("0".to_string(), vec![]));
    }

    #[test]
    fn test_install_command() {
        assert_eq!(
            install_command("zookeeper-operator", "24.7.0"),
            "cd zookeeper-operator/ && python ./scripts/run-tests --skip-tests --operator zookeeper=24.7.0"
        );
    }

    fn test_command<'a>(script: &'a str, params: &'a str, auto_retry: AutoRetryConfig) -> TestCommand<'a> {
        TestCommand {
            operator: "kafka-operator",
            test_script: script,
            auto_retry,
            params,
            exit_code_file: Path::new("/test_exit_code"),
            output_log: Path::new("/target/test-output.log"),
        }
    }

    #[test]
    fn test_run_tests_command() {
        assert_eq!(
            test_command("run-tests", "", AutoRetryConfig::default()).render(),
            "(cd kafka-operator/ && python ./scripts/run-tests --skip-release --log-level debug 2>&1; \
             echo $? > /test_exit_code) | tee /target/test-output.log"
        );
        assert_eq!(
            test_command("run-tests", "--log-level info --parallel 2", AutoRetryConfig::default()).render(),
            "(cd kafka-operator/ && python ./scripts/run-tests --skip-release --log-level info --parallel 2 2>&1; \
             echo $? > /test_exit_code) | tee /target/test-output.log"
        );
    }

    #[test]
    fn test_auto_retry_command() {
        let keep = AutoRetryConfig {
            delete_failed_namespaces: false,
            ..AutoRetryConfig::default()
        };
        assert_eq!(
            test_command("auto-retry-tests.py", "--parallel 4 --test-suite nightly", keep).render(),
            "(cd kafka-operator/ && python ./scripts/auto-retry-tests.py --parallel 4 --attempts-parallel 2 \
             --attempts-serial 3 --keep-failed-namespaces --extra-args --test-suite nightly 2>&1; \
             echo $? > /test_exit_code) | tee /target/test-output.log"
        );
        assert_eq!(
            test_command("auto-retry-tests.py", "", AutoRetryConfig::default()).render(),
            "(cd kafka-operator/ && python ./scripts/auto-retry-tests.py --parallel 0 --attempts-parallel 2 \
             --attempts-serial 3 2>&1; echo $? > /test_exit_code) | tee /target/test-output.log"
        );
    }

    #[test]
    fn test_parse_exit_code() {
        assert_eq!(parse_exit_code("0\n"), Some(0));
        assert_eq!(parse_exit_code(" 3 "), Some(3));
        assert_eq!(parse_exit_code(""), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_returns_test_exit_code() {
        let f = fixture("zookeeper-operator", "Fake Kubernetes", "1.31.2");
        std::fs::write(&f.config.test_exit_code_file, "3\n").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let provider = Arc::new(FakeProvider::default());

        let code = TestRun::new(&f.config, runner.clone(), registry(&provider)).run().await;

        assert_eq!(code, 3);
        assert_eq!(provider.created.load(Ordering::SeqCst), 1);
        assert_eq!(provider.terminated.load(Ordering::SeqCst), 1);
        assert_eq!(
            runner.calls_starting_with("git clone"),
            vec!["git clone -b main https://github.com/stackabletech/zookeeper-operator.git"]
        );
        assert_eq!(runner.calls_starting_with("chown -R 1000:1000").len(), 3);
        assert_eq!(runner.calls_starting_with("helm install").len(), 2);
        assert_eq!(runner.calls_starting_with("(cd zookeeper-operator/").len(), 1);
        assert!(f.config.logs_html().exists());
        drop(f.dir);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_platform() {
        let f = fixture("zookeeper-operator", "aws-eks", "1.31.2");
        let runner = Arc::new(ScriptedRunner::new());
        let provider = Arc::new(FakeProvider::default());

        let code = TestRun::new(&f.config, runner, registry(&provider)).run().await;

        assert_eq!(code, EXIT_CODE_CLUSTER_FAILED);
        assert_eq!(provider.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_version() {
        let f = fixture("zookeeper-operator", "fake-k8s", "1.25.0");
        let runner = Arc::new(ScriptedRunner::new());
        let provider = Arc::new(FakeProvider::default());

        let code = TestRun::new(&f.config, runner, registry(&provider)).run().await;

        assert_eq!(code, EXIT_CODE_CLUSTER_FAILED);
        assert_eq!(provider.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operator_not_defined() {
        let f = fixture("hdfs-operator", "fake-k8s", "1.31.2");
        let runner = Arc::new(ScriptedRunner::new());
        let provider = Arc::new(FakeProvider::default());

        let code = TestRun::new(&f.config, runner, registry(&provider)).run().await;

        assert_eq!(code, EXIT_CODE_CLUSTER_FAILED);
        assert_eq!(provider.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cluster_creation_failure() {
        let f = fixture("zookeeper-operator", "fake-k8s", "1.31.2");
        let runner = Arc::new(ScriptedRunner::new());
        let provider = Arc::new(FakeProvider {
            fail_create: true,
            ..FakeProvider::default()
        });

        let code = TestRun::new(&f.config, runner.clone(), registry(&provider)).run().await;

        assert_eq!(code, EXIT_CODE_CLUSTER_FAILED);
        assert_eq!(provider.terminated.load(Ordering::SeqCst), 0);
        assert!(runner.calls_starting_with("git clone").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_termination_failure_overrides_test_result() {
        let f = fixture("zookeeper-operator", "fake-k8s", "1.31.2");
        std::fs::write(&f.config.test_exit_code_file, "0").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let provider = Arc::new(FakeProvider {
            fail_terminate: true,
            ..FakeProvider::default()
        });

        let code = TestRun::new(&f.config, runner, registry(&provider)).run().await;

        assert_eq!(code, EXIT_CODE_CLUSTER_FAILED);
        assert_eq!(provider.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_failure_still_terminates() {
        let f = fixture("kafka-operator", "fake-k8s", "1.31.2");
        let runner = Arc::new(ScriptedRunner::new());
        runner.respond("cd kafka-operator/ && python ./scripts/run-tests --skip-tests", CommandOutput::failed(2, &["helm failed"]));
        let provider = Arc::new(FakeProvider::default());

        let code = TestRun::new(&f.config, runner.clone(), registry(&provider)).run().await;

        assert_eq!(code, 2);
        assert!(runner.calls_starting_with("(cd kafka-operator/").is_empty());
        assert_eq!(provider.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logging_failure_is_not_fatal() {
        let f = fixture("kafka-operator", "fake-k8s", "1.31.2");
        std::fs::write(&f.config.test_exit_code_file, "0").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner.respond("kubectl create configmap", CommandOutput::failed(1, &["forbidden"]));
        let provider = Arc::new(FakeProvider::default());

        let code = TestRun::new(&f.config, runner.clone(), registry(&provider)).run().await;

        assert_eq!(code, 0);
        let test_runs = runner.calls_starting_with("(cd kafka-operator/");
        assert_eq!(test_runs.len(), 1);
        assert!(test_runs[0].contains("auto-retry-tests.py"));
        assert!(test_runs[0].contains("--keep-failed-namespaces"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unstartable_test_command_ignores_stale_exit_code() {
        let f = fixture("zookeeper-operator", "fake-k8s", "1.31.2");
        std::fs::write(&f.config.test_exit_code_file, "0\n").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner.stream_exits_with(EXIT_CODE_TIMEOUT);
        let provider = Arc::new(FakeProvider::default());

        let code = TestRun::new(&f.config, runner, registry(&provider)).run().await;

        assert_eq!(code, EXIT_CODE_UNKNOWN_TEST_RESULT);
        assert_eq!(provider.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_exit_code_file() {
        let f = fixture("zookeeper-operator", "fake-k8s", "1.31.2");
        let runner = Arc::new(ScriptedRunner::new());
        let provider = Arc::new(FakeProvider::default());

        let code = TestRun::new(&f.config, runner, registry(&provider)).run().await;

        assert_eq!(code, EXIT_CODE_UNKNOWN_TEST_RESULT);
    }
}

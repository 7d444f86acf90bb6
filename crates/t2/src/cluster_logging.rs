//! Cluster logging add-on.
//!
//! Forwards Kubernetes events and container logs of a test cluster to the
//! central OpenSearch index, tagged with the cluster id. Powered by Vector
//! (agent + aggregator) and eventrouter.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::command::{CommandError, CommandRunner, RunOptions};

/// Vector Helm chart version.
pub const VECTOR_CHART_VERSION: &str = "0.40.0";

/// `helm install --wait` needs longer than the default command timeout.
const HELM_TIMEOUT: Duration = Duration::from_secs(300);

/// Where and as whom logs are shipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingTarget {
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

/// Installs the logging add-on into the cluster the kubeconfig points at.
#[derive(Clone)]
pub struct ClusterLogging {
    runner: Arc<dyn CommandRunner>,
    /// Directory holding the Vector values files and manifests.
    assets_dir: PathBuf,
}

struct Step {
    announce: &'static str,
    description: &'static str,
    command: String,
    opts: RunOptions,
}

impl ClusterLogging {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            assets_dir: assets_dir.into(),
        }
    }

    fn asset(&self, name: &str) -> String {
        self.assets_dir.join(name).display().to_string()
    }

    fn steps(&self, cluster_id: &str, target: &LoggingTarget) -> Vec<Step> {
        let helm = RunOptions::default().with_timeout(HELM_TIMEOUT);
        vec![
            Step {
                announce: "Creating configmap 'cluster-metadata' to be used by Vector aggregator and agent...",
                description: "create configmap cluster-metadata",
                command: format!(
                    "kubectl create configmap cluster-metadata --from-literal=T2_CLUSTER_ID={cluster_id}"
                ),
                opts: RunOptions::default(),
            },
            Step {
                announce: "Creating secret containing the credentials and endpoint for target logging system...",
                description: "create secret for logging target",
                command: format!(
                    "kubectl create secret generic cluster-logging-target --from-literal=endpoint='{}' \
                     --from-literal=user='{}' --from-literal=password='{}'",
                    target.endpoint, target.username, target.password
                ),
                opts: RunOptions::default(),
            },
            Step {
                announce: "Creating configmap for Vector agent containing transformation rules...",
                description: "kubectl apply",
                command: format!("kubectl apply -f {}", self.asset("vector-agent-transforms.yaml")),
                opts: RunOptions::default(),
            },
            Step {
                announce: "Installing Vector agent using Helm...",
                description: "helm install vector-agent",
                command: format!(
                    "helm install vector-agent vector/vector --version {VECTOR_CHART_VERSION} --values {} --wait",
                    self.asset("vector-agent-values.yaml")
                ),
                opts: helm,
            },
            Step {
                announce: "Installing Vector aggregator using Helm...",
                description: "helm install vector-aggregator",
                command: format!(
                    "helm install vector-aggregator vector/vector --version {VECTOR_CHART_VERSION} --values {} --wait",
                    self.asset("vector-aggregator-values.yaml")
                ),
                opts: helm,
            },
            Step {
                announce: "Installing eventrouter to pipe K8s events to stdout to be grabbed by Vector agent...",
                description: "install eventrouter",
                command: format!("kubectl apply -f {}", self.asset("eventrouter.yaml")),
                opts: RunOptions::default(),
            },
        ]
    }

    /// Install the add-on, stopping at the first failing step.
    ///
    /// # Errors
    /// Returns the failing step's [`CommandError`].
    pub async fn install(&self, cluster_id: &str, target: &LoggingTarget) -> Result<(), CommandError> {
        for step in self.steps(cluster_id, target) {
            info!("{}", step.announce);
            let output = self.runner.run(&step.command, step.description, &step.opts).await;
            if let Err(e) = output.into_result(step.description) {
                for line in &e.output {
                    error!("{line}");
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::ScriptedRunner;
    use crate::command::CommandOutput;

    fn target() -> LoggingTarget {
        LoggingTarget {
            endpoint: "https://search.example.com".to_string(),
            username: "t2".to_string(),
            password: "s3cret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_install_runs_all_steps() {
        let runner = Arc::new(ScriptedRunner::new());
        ClusterLogging::new(runner.clone(), "/assets")
            .install("abc123", &target())
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 6);
        assert_eq!(
            calls[0],
            "kubectl create configmap cluster-metadata --from-literal=T2_CLUSTER_ID=abc123"
        );
        assert!(calls[1].contains("--from-literal=password='s3cret'"));
        assert_eq!(calls[2], "kubectl apply -f /assets/vector-agent-transforms.yaml");
        assert_eq!(
            calls[3],
            "helm install vector-agent vector/vector --version 0.40.0 --values /assets/vector-agent-values.yaml --wait"
        );
        assert_eq!(calls[5], "kubectl apply -f /assets/eventrouter.yaml");
    }

    #[tokio::test]
    async fn test_install_stops_at_first_failure() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.respond("helm install vector-agent", CommandOutput::failed(1, &["chart not found"]));

        let err = ClusterLogging::new(runner.clone(), "/assets")
            .install("abc123", &target())
            .await
            .unwrap_err();

        assert_eq!(err.description, "helm install vector-agent");
        assert_eq!(runner.calls().len(), 4);
    }
}

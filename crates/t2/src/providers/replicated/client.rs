//! `replicated` CLI driver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::models::{parse_cluster_list, ReplicatedCluster, CLUSTER_TTL, STATE_RUNNING};
use crate::command::{CommandRunner, RunOptions};
use crate::providers::traits::{
    ClusterHandle, ClusterProvider, CreateClusterRequest, PollConfig, ProviderError,
    DEFAULT_KUBECONFIG,
};

/// Provider id in the catalog.
pub const PROVIDER_ID: &str = "replicated";

/// Replicated compatibility-matrix provider.
#[derive(Clone)]
pub struct Replicated {
    runner: Arc<dyn CommandRunner>,
    poll: PollConfig,
    kubeconfig: PathBuf,
}

impl Replicated {
    /// Create a new Replicated provider.
    ///
    /// `REPLICATED_API_TOKEN` must be visible to the processes spawned by
    /// `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            poll: PollConfig::default(),
            kubeconfig: PathBuf::from(DEFAULT_KUBECONFIG),
        }
    }

    #[must_use]
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set the file the cluster's kubeconfig is written to.
    #[must_use]
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = path.into();
        self
    }

    /// Look up a cluster by name.
    async fn get_cluster(&self, name: &str) -> Result<Option<ReplicatedCluster>, ProviderError> {
        let lines = self
            .runner
            .run("replicated cluster ls", "replicated cluster ls", &RunOptions::default())
            .await
            .into_result("replicated cluster ls")?;
        Ok(parse_cluster_list(&lines).remove(name))
    }

    /// Poll until the named cluster is running.
    async fn wait_for_running_cluster(&self, name: &str) -> Result<ReplicatedCluster, ProviderError> {
        let start = Instant::now();

        loop {
            match self.get_cluster(name).await {
                Ok(Some(cluster)) if cluster.state == STATE_RUNNING => {
                    info!(cluster = %name, "Cluster '{name}' is running");
                    return Ok(cluster);
                }
                Ok(cluster) => {
                    let state = cluster.map_or_else(|| "None".to_string(), |c| c.state);
                    info!(cluster = %name, %state, "Cluster '{name}' is in state {state}");
                }
                Err(e) => warn!(cluster = %name, error = %e, "Failed to list clusters"),
            }

            if start.elapsed() >= self.poll.timeout {
                return Err(ProviderError::Timeout {
                    resource: "Cluster",
                    id: name.to_string(),
                    target: STATE_RUNNING.to_string(),
                    timeout_secs: self.poll.timeout.as_secs(),
                });
            }

            tokio::time::sleep(self.poll.interval).await;
        }
    }

    async fn write_cluster_info_file(&self, path: &Path) {
        let command = format!("kubectl get nodes > {}", path.display());
        let output = self
            .runner
            .run(&command, "kubectl get nodes", &RunOptions::default())
            .await;
        if !output.success() {
            warn!(path = %path.display(), output = ?output.lines, "Failed to write cluster info file");
        }
    }
}

#[async_trait]
impl ClusterProvider for Replicated {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn create_cluster(&self, req: &CreateClusterRequest) -> Result<ClusterHandle, ProviderError> {
        let name = req.id.as_str();

        let command = format!(
            "replicated cluster create --name {name} --distribution {} --instance-type {} \
             --version {} --disk {} --nodes {} --ttl {CLUSTER_TTL}",
            req.spec.arg("distribution")?,
            req.spec.arg("instance-type")?,
            req.platform_version,
            req.spec.arg("disk-size")?,
            req.spec.arg("node-count")?,
        );

        info!(cluster = %name, "Creating cluster {name} on replicated.com...");
        debug!(%command, "System call");
        self.runner
            .run(&command, "replicated cluster create", &RunOptions::default())
            .await
            .into_result("replicated cluster create")
            .inspect_err(|e| error!(cluster = %name, error = %e, "Creating a cluster named '{name}' failed"))?;

        info!("Polling for the cluster to be up and running...");
        let cluster = self.wait_for_running_cluster(name).await?;

        info!("Updating kubeconfig...");
        if let Some(dir) = self.kubeconfig.parent() {
            std::fs::create_dir_all(dir)?;
        }
        self.runner
            .run(
                &format!(
                    "replicated cluster kubeconfig {} --output-path {}",
                    cluster.id,
                    self.kubeconfig.display()
                ),
                "update kubeconfig",
                &RunOptions::default(),
            )
            .await
            .into_result("update kubeconfig")
            .inspect_err(|e| error!(cluster = %name, error = %e, "Error updating kubeconfig"))?;

        self.write_cluster_info_file(&req.cluster_info_file).await;

        Ok(ClusterHandle::Replicated {
            name: name.to_string(),
        })
    }

    async fn terminate_cluster(&self, handle: ClusterHandle) -> Result<(), ProviderError> {
        let name = match handle {
            ClusterHandle::Replicated { name } => name,
            other => {
                return Err(ProviderError::HandleMismatch {
                    expected: PROVIDER_ID,
                    actual: other.provider_id(),
                })
            }
        };

        info!(cluster = %name, "Terminating a cluster named '{name}' on replicated.com...");
        self.runner
            .run(
                &format!("replicated cluster rm --name {name}"),
                "replicated cluster rm",
                &RunOptions::default(),
            )
            .await
            .into_result("replicated cluster rm")
            .inspect_err(|e| error!(cluster = %name, error = %e, "Deleting the cluster named '{name}' failed"))?;

        Ok(())
    }
}

//! `ionosctl` driver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::models::{NodePoolSpec, ResourceKind, CLUSTER_NAME_LEN, STATE_COLUMN};
use crate::command::{CommandRunner, RunOptions};
use crate::providers::traits::{
    ClusterHandle, ClusterProvider, CreateClusterRequest, IonosCluster, PollConfig, ProviderError,
    DEFAULT_KUBECONFIG,
};
use crate::table::{parse_table, Row};

/// Provider id in the catalog.
pub const PROVIDER_ID: &str = "ionos";

/// IONOS Cloud provider.
#[derive(Clone)]
pub struct Ionos {
    runner: Arc<dyn CommandRunner>,
    poll: PollConfig,
    kubeconfig: PathBuf,
}

impl Ionos {
    /// Create a new IONOS provider.
    ///
    /// Credentials (`IONOS_USERNAME`, `IONOS_PASSWORD`) must be visible to
    /// the processes spawned by `runner`.
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

    /// Run a command and parse its output as a table.
    async fn query_table(&self, command: &str, description: &str) -> Result<Vec<Row>, ProviderError> {
        debug!(%command, "ionosctl call");
        let lines = self
            .runner
            .run(command, description, &RunOptions::default())
            .await
            .into_result(description)?;
        Ok(parse_table(&lines))
    }

    /// Issue a create command and return the id of the new resource.
    async fn create_resource(&self, kind: ResourceKind, command: &str) -> Result<String, ProviderError> {
        let rows = self.query_table(command, &format!("create {kind}")).await?;
        rows.first()
            .and_then(|row| row.get(kind.id_column()))
            .filter(|id| !id.is_empty())
            .cloned()
            .ok_or(ProviderError::MissingField {
                resource: kind.label(),
                field: kind.id_column(),
            })
    }

    /// Current state of a resource, `None` if it does not exist.
    async fn resource_state(
        &self,
        kind: ResourceKind,
        id: &str,
        cluster_id: &str,
    ) -> Result<Option<String>, ProviderError> {
        let rows = self
            .query_table(&kind.list_command(cluster_id), &format!("list {kind}s"))
            .await?;

        Ok(rows
            .into_iter()
            .find(|row| row.get(kind.id_column()).is_some_and(|v| v == id))
            .map(|row| row.get(STATE_COLUMN).cloned().unwrap_or_default()))
    }

    /// Poll until the resource is in `target` state, or absent if `target`
    /// is `None`.
    async fn wait_for_state(
        &self,
        kind: ResourceKind,
        id: &str,
        cluster_id: &str,
        target: Option<&str>,
    ) -> Result<(), ProviderError> {
        let start = Instant::now();

        loop {
            match self.resource_state(kind, id, cluster_id).await {
                Ok(state) => {
                    info!(
                        resource = %kind,
                        %id,
                        state = state.as_deref().unwrap_or("None"),
                        "{kind} {id} is in state {}",
                        state.as_deref().unwrap_or("None")
                    );
                    if state.as_deref() == target {
                        return Ok(());
                    }
                }
                // A failed list call says nothing about the resource.
                Err(e) => warn!(resource = %kind, %id, error = %e, "Failed to read state"),
            }

            if start.elapsed() >= self.poll.timeout {
                return Err(ProviderError::Timeout {
                    resource: kind.label(),
                    id: id.to_string(),
                    target: target.unwrap_or("deleted").to_string(),
                    timeout_secs: self.poll.timeout.as_secs(),
                });
            }

            tokio::time::sleep(self.poll.interval).await;
        }
    }

    /// Delete a resource and wait until it is gone.
    async fn delete_resource(&self, kind: ResourceKind, id: &str, cluster_id: &str) -> Result<(), ProviderError> {
        let description = format!("delete {kind}");
        self.runner
            .run(&kind.delete_command(id, cluster_id), &description, &RunOptions::default())
            .await
            .into_result(&description)
            .inspect_err(|e| error!(resource = %kind, %id, error = %e, "Deleting the {kind} {id} failed"))?;

        info!(resource = %kind, %id, "Deleting {kind} {id}...");
        self.wait_for_state(kind, id, cluster_id, None).await?;
        info!(resource = %kind, %id, "{kind} {id} successfully deleted.");
        Ok(())
    }

    async fn update_kubeconfig(&self, cluster_id: &str) -> Result<(), ProviderError> {
        if let Some(dir) = self.kubeconfig.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let command = format!(
            "ionosctl k8s kubeconfig get --cluster-id {cluster_id} > {}",
            self.kubeconfig.display()
        );
        self.runner
            .run(&command, "update kubeconfig", &RunOptions::default())
            .await
            .into_result("update kubeconfig")?;
        Ok(())
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

    /// Create datacenter, cluster and nodepool, recording every created
    /// resource in `created`.
    async fn provision(
        &self,
        name: &str,
        location: &str,
        nodepool: &NodePoolSpec,
        req: &CreateClusterRequest,
        created: &mut Vec<(ResourceKind, String)>,
    ) -> Result<IonosCluster, ProviderError> {
        info!(cluster = %name, "Creating datacenter '{name}'...");
        let datacenter_id = self
            .create_resource(
                ResourceKind::Datacenter,
                &format!("ionosctl datacenter create --name {name} --location {location}"),
            )
            .await?;
        created.push((ResourceKind::Datacenter, datacenter_id.clone()));
        info!(cluster = %name, %datacenter_id, "Created datacenter '{name}' (id={datacenter_id})");
        self.wait_for_state(
            ResourceKind::Datacenter,
            &datacenter_id,
            "",
            Some(ResourceKind::Datacenter.ready_state()),
        )
        .await?;
        info!(cluster = %name, "Datacenter '{name}' (id={datacenter_id}) is ready for use.");

        info!(cluster = %name, "Creating K8s cluster '{name}'...");
        let cluster_id = self
            .create_resource(
                ResourceKind::Cluster,
                &format!(
                    "ionosctl k8s cluster create --name {name} --k8s-version {}",
                    req.platform_version
                ),
            )
            .await?;
        created.push((ResourceKind::Cluster, cluster_id.clone()));
        info!(cluster = %name, %cluster_id, "Created K8s cluster '{name}' (id={cluster_id})");
        self.wait_for_state(
            ResourceKind::Cluster,
            &cluster_id,
            "",
            Some(ResourceKind::Cluster.ready_state()),
        )
        .await?;
        info!(cluster = %name, "K8s cluster '{name}' (id={cluster_id}) is ready for use.");

        info!(cluster = %name, "Creating nodepool '{name}'...");
        let nodepool_id = self
            .create_resource(
                ResourceKind::NodePool,
                &format!(
                    "ionosctl k8s nodepool create --datacenter-id {datacenter_id} --cluster-id {cluster_id} \
                     --name {name} --cores {} --node-count {} --ram {} --storage-type {} --storage-size {}",
                    nodepool.cores, nodepool.node_count, nodepool.ram, nodepool.disk_type, nodepool.disk_size
                ),
            )
            .await?;
        created.push((ResourceKind::NodePool, nodepool_id.clone()));
        info!(cluster = %name, %nodepool_id, "Created nodepool '{name}' (id={nodepool_id})");
        self.wait_for_state(
            ResourceKind::NodePool,
            &nodepool_id,
            &cluster_id,
            Some(ResourceKind::NodePool.ready_state()),
        )
        .await?;
        info!(cluster = %name, "Nodepool '{name}' (id={nodepool_id}) is ready for use.");

        info!("Updating kubeconfig...");
        self.update_kubeconfig(&cluster_id).await?;

        self.write_cluster_info_file(&req.cluster_info_file).await;

        Ok(IonosCluster {
            cluster_name: name.to_string(),
            datacenter_id,
            cluster_id,
            nodepool_id,
        })
    }
}

#[async_trait]
impl ClusterProvider for Ionos {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn create_cluster(&self, req: &CreateClusterRequest) -> Result<ClusterHandle, ProviderError> {
        let name: String = req.id.chars().take(CLUSTER_NAME_LEN).collect();

        // Read the whole spec before anything is created.
        let location = req.spec.arg("location")?;
        let nodepool = NodePoolSpec {
            cores: req.spec.arg("cores")?,
            node_count: req.spec.arg("node-count")?,
            ram: req.spec.arg("ram")?,
            disk_type: req.spec.arg("disk-type")?,
            disk_size: req.spec.arg("disk-size")?,
        };

        info!(cluster = %name, %location, version = %req.platform_version, "Creating cluster {name} on IONOS...");

        let mut created = Vec::new();
        match self.provision(&name, &location, &nodepool, req, &mut created).await {
            Ok(cluster) => Ok(ClusterHandle::Ionos(cluster)),
            Err(e) => {
                error!(cluster = %name, error = %e, "Creating cluster {name} failed");
                for (kind, id) in &created {
                    warn!(resource = %kind, %id, "{kind} {id} was left behind and must be deleted manually");
                }
                Err(e)
            }
        }
    }

    async fn terminate_cluster(&self, handle: ClusterHandle) -> Result<(), ProviderError> {
        let cluster = match handle {
            ClusterHandle::Ionos(cluster) => cluster,
            other => {
                return Err(ProviderError::HandleMismatch {
                    expected: PROVIDER_ID,
                    actual: other.provider_id(),
                })
            }
        };
        let name = &cluster.cluster_name;
        info!(cluster = %name, "Terminating cluster {name} on IONOS...");

        // Children first. Any failure stops the teardown so no parent is
        // deleted while it still owns resources.
        self.delete_resource(ResourceKind::NodePool, &cluster.nodepool_id, &cluster.cluster_id)
            .await?;
        self.delete_resource(ResourceKind::Cluster, &cluster.cluster_id, "")
            .await?;
        self.delete_resource(ResourceKind::Datacenter, &cluster.datacenter_id, "")
            .await?;

        info!(cluster = %name, "Cluster {name} terminated.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::command::fake::ScriptedRunner;
    use crate::command::CommandOutput;
    use crate::providers::ClusterSpec;

    fn table(header: [&str; 4], rows: &[[&str; 4]]) -> CommandOutput {
        let line = |cells: &[&str]| {
            cells
                .iter()
                .map(|c| format!("{c:<40}"))
                .collect::<String>()
                .trim_end()
                .to_string()
        };
        let mut lines = vec![line(&header)];
        lines.extend(rows.iter().map(|r| line(r)));
        CommandOutput::ok(&lines)
    }

    fn datacenters(rows: &[[&str; 4]]) -> CommandOutput {
        table(["DatacenterId", "Name", "Location", "State"], rows)
    }

    fn clusters(rows: &[[&str; 4]]) -> CommandOutput {
        table(["ClusterId", "Name", "K8sVersion", "State"], rows)
    }

    fn nodepools(rows: &[[&str; 4]]) -> CommandOutput {
        table(["NodePoolId", "Name", "NodeCount", "State"], rows)
    }

    fn spec() -> ClusterSpec {
        ClusterSpec::new()
            .with("location", "de/txl")
            .with("cores", 4)
            .with("node-count", 3)
            .with("ram", 8192)
            .with("disk-type", "SSD")
            .with("disk-size", 100)
    }

    fn request(dir: &Path) -> CreateClusterRequest {
        CreateClusterRequest {
            id: "0123456789abcdef".to_string(),
            spec: spec(),
            platform_version: "1.29.5".to_string(),
            cluster_info_file: dir.join("cluster-info.txt"),
        }
    }

    fn provider(runner: &Arc<ScriptedRunner>, dir: &Path) -> Ionos {
        Ionos::new(runner.clone())
            .with_kubeconfig(dir.join(".kube/config"))
            .with_poll_config(PollConfig {
                interval: Duration::from_secs(5),
                timeout: Duration::from_secs(60),
            })
    }

    fn handle() -> ClusterHandle {
        ClusterHandle::Ionos(IonosCluster {
            cluster_name: "0123456789".to_string(),
            datacenter_id: "dc-1".to_string(),
            cluster_id: "c-1".to_string(),
            nodepool_id: "np-1".to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .respond("ionosctl datacenter create", datacenters(&[["dc-1", "0123456789", "de/txl", "BUSY"]]))
            .respond("ionosctl datacenter list", datacenters(&[["dc-1", "0123456789", "de/txl", "BUSY"]]))
            .respond("ionosctl datacenter list", datacenters(&[["dc-1", "0123456789", "de/txl", "AVAILABLE"]]))
            .respond("ionosctl k8s cluster create", clusters(&[["c-1", "0123456789", "1.29.5", "DEPLOYING"]]))
            .respond("ionosctl k8s cluster list", clusters(&[["c-1", "0123456789", "1.29.5", "ACTIVE"]]))
            .respond("ionosctl k8s nodepool create", nodepools(&[["np-1", "0123456789", "3", "DEPLOYING"]]))
            .respond("ionosctl k8s nodepool list", nodepools(&[["np-1", "0123456789", "3", "ACTIVE"]]));

        let handle = provider(&runner, dir.path())
            .create_cluster(&request(dir.path()))
            .await
            .unwrap();

        assert_eq!(handle, self::handle());

        let nodepool_create = runner.calls_starting_with("ionosctl k8s nodepool create");
        assert_eq!(
            nodepool_create,
            vec![
                "ionosctl k8s nodepool create --datacenter-id dc-1 --cluster-id c-1 --name 0123456789 \
                 --cores 4 --node-count 3 --ram 8192 --storage-type SSD --storage-size 100"
            ]
        );
        assert_eq!(runner.calls_starting_with("ionosctl datacenter list").len(), 2);
        assert_eq!(
            runner.calls_starting_with("ionosctl k8s nodepool list"),
            vec!["ionosctl k8s nodepool list --cluster-id c-1"]
        );
        assert_eq!(runner.calls_starting_with("ionosctl k8s kubeconfig get --cluster-id c-1").len(), 1);
        assert_eq!(runner.calls_starting_with("kubectl get nodes").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_cluster_stops_when_datacenter_creation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner.respond("ionosctl datacenter create", CommandOutput::failed(1, &["quota exceeded"]));

        let err = provider(&runner, dir.path())
            .create_cluster(&request(dir.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Command(ref e) if e.exit_code == 1));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_cluster_rejects_incomplete_spec() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let mut req = request(dir.path());
        req.spec = ClusterSpec::new().with("location", "de/txl");

        let err = provider(&runner, dir.path()).create_cluster(&req).await.unwrap_err();

        assert!(matches!(err, ProviderError::MissingSpecKey(ref key) if key == "cores"));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .respond("ionosctl datacenter create", datacenters(&[["dc-1", "0123456789", "de/txl", "BUSY"]]))
            .respond("ionosctl datacenter list", datacenters(&[["dc-1", "0123456789", "de/txl", "BUSY"]]));

        let err = provider(&runner, dir.path())
            .create_cluster(&request(dir.path()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProviderError::Timeout { resource: "Datacenter", ref target, timeout_secs: 60, .. } if target == "AVAILABLE"
        ));
        assert!(runner.calls_starting_with("ionosctl k8s").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_list_is_not_absence() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .respond("ionosctl k8s nodepool delete", CommandOutput::ok::<&str>(&[]))
            .respond("ionosctl k8s nodepool list", CommandOutput::failed(1, &["connection reset"]))
            .respond("ionosctl k8s nodepool list", nodepools(&[["np-1", "0123456789", "3", "DESTROYING"]]))
            .respond("ionosctl k8s nodepool list", nodepools(&[]))
            .respond("ionosctl k8s cluster list", clusters(&[]))
            .respond("ionosctl datacenter list", datacenters(&[]));

        provider(&runner, dir.path()).terminate_cluster(handle()).await.unwrap();

        assert_eq!(runner.calls_starting_with("ionosctl k8s nodepool list").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_cluster_deletes_children_first() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .respond("ionosctl k8s nodepool list", nodepools(&[["np-1", "0123456789", "3", "DESTROYING"]]))
            .respond("ionosctl k8s nodepool list", nodepools(&[]))
            .respond("ionosctl k8s cluster list", clusters(&[["c-2", "other", "1.30.1", "ACTIVE"]]))
            .respond("ionosctl datacenter list", datacenters(&[]));

        provider(&runner, dir.path()).terminate_cluster(handle()).await.unwrap();

        let deletes: Vec<String> = runner
            .calls()
            .into_iter()
            .filter(|c| c.contains(" delete "))
            .collect();
        assert_eq!(
            deletes,
            vec![
                "ionosctl k8s nodepool delete --cluster-id c-1 --nodepool-id np-1 --force",
                "ionosctl k8s cluster delete --cluster-id c-1 --force",
                "ionosctl datacenter delete --datacenter-id dc-1 --force",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_cluster_aborts_on_failed_delete() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner.respond("ionosctl k8s nodepool delete", CommandOutput::failed(2, &["forbidden"]));

        let err = provider(&runner, dir.path())
            .terminate_cluster(handle())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Command(ref e) if e.exit_code == 2));
        assert!(runner.calls_starting_with("ionosctl k8s cluster delete").is_empty());
        assert!(runner.calls_starting_with("ionosctl datacenter delete").is_empty());
    }

    #[tokio::test]
    async fn test_terminate_rejects_foreign_handle() {
        let runner = Arc::new(ScriptedRunner::new());
        let err = Ionos::new(runner.clone())
            .terminate_cluster(ClusterHandle::Replicated { name: "x".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::HandleMismatch { expected: "ionos", actual: "replicated" }
        ));
        assert!(runner.calls().is_empty());
    }
}

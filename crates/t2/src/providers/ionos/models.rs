//! IONOS resource kinds and the `ionosctl` table columns they use.

use std::fmt;

/// Column holding the lifecycle state of every resource kind.
pub const STATE_COLUMN: &str = "State";

/// Ready state of a datacenter.
pub const STATE_AVAILABLE: &str = "AVAILABLE";

/// Ready state of a Kubernetes cluster or nodepool.
pub const STATE_ACTIVE: &str = "ACTIVE";

/// Number of run-id characters used as resource name.
pub const CLUSTER_NAME_LEN: usize = 10;

/// The three resources a test cluster consists of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Datacenter,
    Cluster,
    NodePool,
}

impl ResourceKind {
    /// Column holding the resource id in `ionosctl` output.
    #[must_use]
    pub fn id_column(self) -> &'static str {
        match self {
            Self::Datacenter => "DatacenterId",
            Self::Cluster => "ClusterId",
            Self::NodePool => "NodePoolId",
        }
    }

    /// State in which the resource is ready for use.
    #[must_use]
    pub fn ready_state(self) -> &'static str {
        match self {
            Self::Datacenter => STATE_AVAILABLE,
            Self::Cluster | Self::NodePool => STATE_ACTIVE,
        }
    }

    /// `ionosctl` command listing all resources of this kind.
    ///
    /// Nodepools are listed per cluster.
    #[must_use]
    pub fn list_command(self, cluster_id: &str) -> String {
        match self {
            Self::Datacenter => "ionosctl datacenter list".to_string(),
            Self::Cluster => "ionosctl k8s cluster list".to_string(),
            Self::NodePool => format!("ionosctl k8s nodepool list --cluster-id {cluster_id}"),
        }
    }

    /// `ionosctl` command deleting the resource `id`.
    #[must_use]
    pub fn delete_command(self, id: &str, cluster_id: &str) -> String {
        match self {
            Self::Datacenter => format!("ionosctl datacenter delete --datacenter-id {id} --force"),
            Self::Cluster => format!("ionosctl k8s cluster delete --cluster-id {id} --force"),
            Self::NodePool => format!(
                "ionosctl k8s nodepool delete --cluster-id {cluster_id} --nodepool-id {id} --force"
            ),
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Datacenter => "Datacenter",
            Self::Cluster => "K8s cluster",
            Self::NodePool => "Nodepool",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sizing of the nodepool, taken from the cluster spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePoolSpec {
    pub cores: String,
    pub node_count: String,
    /// RAM per node in MB.
    pub ram: String,
    /// `HDD` or `SSD`.
    pub disk_type: String,
    /// Disk size in GB.
    pub disk_size: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(
            ResourceKind::NodePool.list_command("c1"),
            "ionosctl k8s nodepool list --cluster-id c1"
        );
        assert_eq!(
            ResourceKind::Datacenter.delete_command("dc1", "c1"),
            "ionosctl datacenter delete --datacenter-id dc1 --force"
        );
        assert_eq!(ResourceKind::Datacenter.ready_state(), "AVAILABLE");
        assert_eq!(ResourceKind::NodePool.to_string(), "Nodepool");
    }
}

//! Cluster providers driven through their vendor CLIs.

pub mod ionos;
pub mod replicated;
mod traits;

pub use traits::{
    ClusterHandle, ClusterProvider, ClusterSpec, CreateClusterRequest, IonosCluster, PollConfig,
    ProviderError, DEFAULT_KUBECONFIG, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS,
};

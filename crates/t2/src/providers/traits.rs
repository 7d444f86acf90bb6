//! Provider trait and common types for cluster providers.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;

use crate::command::CommandError;

/// Default polling interval when waiting for a resource state.
/// Default kubeconfig location inside the runner image.
pub const DEFAULT_KUBECONFIG: &str = "/root/.kube/config";

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default deadline for a single wait.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 3600;

/// Errors that can occur during provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// A CLI call failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// A CLI table row lacked an expected column.
    #[error("{resource} output does not contain the column '{field}'")]
    MissingField {
        resource: &'static str,
        field: &'static str,
    },

    /// The cluster spec lacks a key this provider needs.
    #[error("Cluster spec does not contain '{0}'")]
    MissingSpecKey(String),

    /// A resource never reached the requested state.
    #[error("{resource} {id} did not reach state {target} within {timeout_secs} seconds")]
    Timeout {
        resource: &'static str,
        id: String,
        target: String,
        timeout_secs: u64,
    },

    /// The handle was created by a different provider.
    #[error("Cluster handle of provider '{actual}' passed to provider '{expected}'")]
    HandleMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Local file error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Vendor-specific cluster sizing, e.g. `{cores: 4, ram: 8192}`.
///
/// Values are plain YAML scalars taken from the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterSpec(BTreeMap<String, Value>);

impl ClusterSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A new spec with every key of `layer` replacing the same key here.
    #[must_use]
    pub fn overlay(&self, layer: &ClusterSpec) -> ClusterSpec {
        let mut merged = self.0.clone();
        merged.extend(layer.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        ClusterSpec(merged)
    }

    /// The value of `key` rendered as a CLI argument.
    ///
    /// # Errors
    /// Returns [`ProviderError::MissingSpecKey`] if the key is absent or
    /// was unset with a null value in a catalog layer.
    pub fn arg(&self, key: &str) -> Result<String, ProviderError> {
        let value = self
            .get(key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ProviderError::MissingSpecKey(key.to_string()))?;

        Ok(match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => serde_yaml::to_string(other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        })
    }
}

/// Interval and deadline for state polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

/// Request to create a cluster.
#[derive(Debug, Clone)]
pub struct CreateClusterRequest {
    /// Unique id of the test run, used to name the cluster.
    pub id: String,
    /// Resolved cluster spec.
    pub spec: ClusterSpec,
    /// Kubernetes version, e.g. `1.29.5`.
    pub platform_version: String,
    /// File receiving the node listing once the cluster is ready.
    pub cluster_info_file: PathBuf,
}

/// The three IONOS resources making up one test cluster.
///
/// The datacenter owns the cluster which owns the nodepool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IonosCluster {
    pub cluster_name: String,
    pub datacenter_id: String,
    pub cluster_id: String,
    pub nodepool_id: String,
}

/// Provider-specific identification of a created cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ClusterHandle {
    /// Replicated clusters are addressed by name.
    Replicated { name: String },
    Ionos(IonosCluster),
}

impl ClusterHandle {
    /// Id of the provider that created this cluster.
    #[must_use]
    pub fn provider_id(&self) -> &'static str {
        match self {
            Self::Replicated { .. } => "replicated",
            Self::Ionos(_) => "ionos",
        }
    }

    /// Human-readable cluster name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Replicated { name } => name,
            Self::Ionos(cluster) => &cluster.cluster_name,
        }
    }
}

/// A vendor able to create and terminate Kubernetes clusters.
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Provider id as used in the catalog.
    fn id(&self) -> &'static str;

    /// Create a cluster and wait until it is usable.
    ///
    /// On success the kubeconfig points at the new cluster.
    async fn create_cluster(&self, req: &CreateClusterRequest) -> Result<ClusterHandle, ProviderError>;

    /// Terminate a cluster previously returned by `create_cluster`.
    async fn terminate_cluster(&self, handle: ClusterHandle) -> Result<(), ProviderError>;
}

//! Ephemeral Kubernetes test clusters for operator integration tests.
//!
//! This crate provisions a throw-away cluster on one of several providers
//! (IONOS Cloud managed Kubernetes, Replicated compatibility matrix), runs an
//! operator's integration test suite against it and tears it down again.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use t2::catalog::Catalog;
//! use t2::cluster::ProviderRegistry;
//! use t2::command::{CommandRunner, ShellRunner};
//! use t2::providers::{CreateClusterRequest, PollConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = Catalog::load(&["platforms.yaml"], &["operator-tests.yaml"])?;
//!     let platform = catalog.find_platform("ionos-k8s").expect("platform");
//!     let spec = catalog.resolve_spec("zookeeper-operator", &platform.id)?;
//!
//!     let runner: Arc<dyn CommandRunner> = Arc::new(ShellRunner::new());
//!     let registry = ProviderRegistry::with_defaults(&runner, PollConfig::default(), "/root/.kube/config");
//!
//!     let handle = registry
//!         .create_cluster(&platform.provider, &CreateClusterRequest {
//!             id: uuid::Uuid::new_v4().simple().to_string(),
//!             spec,
//!             platform_version: "1.31.2".into(),
//!             cluster_info_file: "/target/cluster-info.txt".into(),
//!         })
//!         .await?;
//!
//!     // ... run tests ...
//!
//!     registry.terminate_cluster(&platform.provider, handle).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod cluster;
pub mod cluster_logging;
pub mod command;
pub mod config;
pub mod jobs;
pub mod logging;
pub mod orchestrator;
pub mod providers;
pub mod report;
pub mod table;

pub use catalog::{Catalog, CatalogError};
pub use cluster::{ClusterError, ProviderRegistry};
pub use command::{CommandError, CommandOutput, CommandRunner, RunOptions, ShellRunner};
pub use providers::{ClusterHandle, ClusterProvider, ClusterSpec, CreateClusterRequest, ProviderError};

//! IONOS Cloud provider.
//!
//! Implements the [`ClusterProvider`](crate::providers::ClusterProvider)
//! trait on top of `ionosctl`. A test cluster consists of a datacenter, a
//! managed Kubernetes cluster and one nodepool, created in that order and
//! deleted in reverse order.

mod client;
mod models;

pub use client::Ionos;
pub use models::*;

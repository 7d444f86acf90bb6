//! Replicated compatibility-matrix provider.
//!
//! Clusters are single resources created with `replicated cluster create`
//! and addressed by name.

mod client;
mod models;

pub use client::Replicated;
pub use models::*;

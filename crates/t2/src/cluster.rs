//! Facade dispatching cluster operations to the registered providers.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::command::CommandRunner;
use crate::providers::ionos::Ionos;
use crate::providers::replicated::Replicated;
use crate::providers::{ClusterHandle, ClusterProvider, CreateClusterRequest, PollConfig, ProviderError};

/// Errors returned by the [`ProviderRegistry`].
#[derive(Error, Debug)]
pub enum ClusterError {
    /// No provider is registered under this id.
    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Cluster providers by id.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, Arc<dyn ClusterProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the IONOS and Replicated providers sharing `runner`.
    #[must_use]
    pub fn with_defaults(
        runner: &Arc<dyn CommandRunner>,
        poll: PollConfig,
        kubeconfig: impl Into<PathBuf>,
    ) -> Self {
        let kubeconfig = kubeconfig.into();
        Self::new()
            .register(
                Replicated::new(runner.clone())
                    .with_poll_config(poll)
                    .with_kubeconfig(kubeconfig.clone()),
            )
            .register(
                Ionos::new(runner.clone())
                    .with_poll_config(poll)
                    .with_kubeconfig(kubeconfig),
            )
    }

    /// Add a provider, replacing any provider with the same id.
    #[must_use]
    pub fn register(mut self, provider: impl ClusterProvider + 'static) -> Self {
        self.providers.insert(provider.id(), Arc::new(provider));
        self
    }

    /// Ids of all registered providers.
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }

    /// Look up a provider.
    ///
    /// # Errors
    /// Returns [`ClusterError::UnknownProvider`] if no provider has this id.
    pub fn get(&self, provider_id: &str) -> Result<&Arc<dyn ClusterProvider>, ClusterError> {
        self.providers
            .get(provider_id)
            .ok_or_else(|| ClusterError::UnknownProvider(provider_id.to_string()))
    }

    /// Create a cluster with the given provider. Blocks until it is usable.
    ///
    /// # Errors
    /// Returns an error if the provider is unknown or creation fails.
    pub async fn create_cluster(
        &self,
        provider_id: &str,
        req: &CreateClusterRequest,
    ) -> Result<ClusterHandle, ClusterError> {
        let provider = self.get(provider_id)?;
        let handle = provider.create_cluster(req).await.inspect_err(|e| {
            error!(provider = provider_id, error = %e, "Cluster could not be created");
        })?;
        info!(provider = provider_id, cluster = handle.name(), "Cluster created");
        Ok(handle)
    }

    /// Terminate a cluster created by [`Self::create_cluster`].
    ///
    /// # Errors
    /// Returns an error if the provider is unknown or termination fails.
    pub async fn terminate_cluster(&self, provider_id: &str, handle: ClusterHandle) -> Result<(), ClusterError> {
        let provider = self.get(provider_id)?;
        let name = handle.name().to_string();
        provider.terminate_cluster(handle).await.inspect_err(|e| {
            error!(provider = provider_id, cluster = %name, error = %e, "Cluster could not be terminated");
        })?;
        info!(provider = provider_id, cluster = %name, "Cluster terminated");
        Ok(())
    }
}

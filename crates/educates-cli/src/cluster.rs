//! Cluster connection configuration.

use std::path::{Path, PathBuf};

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::error::{Error, Result};

const CLIENT_CONTEXT: &str = "unable to create a cluster client";

/// Where to find credentials for the target cluster.
///
/// With no explicit kubeconfig the usual inference applies: `$KUBECONFIG`,
/// then `~/.kube/config`, then the in-cluster service account.
#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    kubeconfig: Option<PathBuf>,
}

impl ClusterConfig {
    #[must_use]
    pub fn new(kubeconfig: Option<PathBuf>) -> Self {
        Self { kubeconfig }
    }

    #[must_use]
    pub fn kubeconfig(&self) -> Option<&Path> {
        self.kubeconfig.as_deref()
    }

    /// Build an authenticated client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClusterUnreachable`] if the configuration cannot be
    /// loaded or the client cannot be constructed.
    pub async fn client(&self) -> Result<Client> {
        let config = match &self.kubeconfig {
            Some(path) => {
                debug!(kubeconfig = %path.display(), "Loading kubeconfig");

                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    Error::unreachable(
                        format!("{CLIENT_CONTEXT}: unable to read {}", path.display()),
                        e,
                    )
                })?;

                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| Error::unreachable(CLIENT_CONTEXT, e))?
            }
            None => Config::infer()
                .await
                .map_err(|e| Error::unreachable(CLIENT_CONTEXT, e))?,
        };

        Client::try_from(config).map_err(|e| Error::unreachable(CLIENT_CONTEXT, e))
    }
}

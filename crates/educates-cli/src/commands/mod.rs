//! CLI subcommands.

use std::path::PathBuf;

use clap::Args;

use crate::cluster::ClusterConfig;

pub mod deploy;
pub mod portal;

/// Cluster connection flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ClusterArgs {
    /// Kubeconfig file to use instead of $KUBECONFIG or $HOME/.kube/config.
    #[arg(long, value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,
}

impl ClusterArgs {
    #[must_use]
    pub fn config(&self) -> ClusterConfig {
        ClusterConfig::new(self.kubeconfig.clone())
    }
}

//! Portal commands - access a deployed training portal.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::ClusterArgs;
use crate::deploy::DEFAULT_PORTAL;
use crate::portal::{open_url, portal_url};
use crate::repository::KubeRepository;
use crate::ui;

/// Manage training portals.
#[derive(Args, Debug)]
pub struct PortalCommand {
    #[command(subcommand)]
    command: PortalSubcommand,
}

#[derive(Subcommand, Debug)]
enum PortalSubcommand {
    /// Open training portal in web browser.
    Open(OpenCommand),
}

#[derive(Args, Debug)]
pub struct OpenCommand {
    #[command(flatten)]
    cluster: ClusterArgs,

    /// Open URL for admin login instead of workshops catalog.
    #[arg(long)]
    admin: bool,

    /// Name of the training portal.
    #[arg(short, long, default_value = DEFAULT_PORTAL)]
    portal: String,
}

impl PortalCommand {
    /// Run the portal command.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal cannot be found or opened.
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            PortalSubcommand::Open(cmd) => cmd.run().await,
        }
    }
}

impl OpenCommand {
    async fn run(&self) -> Result<()> {
        let portal = if self.portal.is_empty() {
            DEFAULT_PORTAL
        } else {
            self.portal.as_str()
        };

        let client = self.cluster.config().client().await?;
        let repository = KubeRepository::new(client);

        let url = portal_url(&repository, portal, self.admin).await?;
        open_url(&url)?;

        ui::print_success(&format!("Opened {url}"));
        Ok(())
    }
}

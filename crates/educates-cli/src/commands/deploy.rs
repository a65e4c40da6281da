//! Deploy command - publish a workshop and add it to a training portal.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::ClusterArgs;
use crate::definition::{
    DefinitionLoader, Overrides, DEFAULT_WORKSHOP_FILE, DEFAULT_WORKSHOP_VERSION,
};
use crate::deploy::{
    deploy_workshop, DeployRequest, DEFAULT_CAPACITY, DEFAULT_ORPHANED, DEFAULT_OVERDUE,
    DEFAULT_PORTAL,
};
use crate::repository::KubeRepository;
use crate::ui;

/// Deploy workshop to Kubernetes.
#[derive(Args, Debug)]
pub struct DeployCommand {
    /// Name to be used for the workshop definition, declared name if not set.
    #[arg(short, long)]
    name: Option<String>,

    /// Path to local workshop directory, definition file, or URL for workshop definition file.
    #[arg(short = 'f', long = "file", default_value = ".")]
    path: String,

    #[command(flatten)]
    cluster: ClusterArgs,

    /// Name to be used for training portal.
    #[arg(short, long, default_value = DEFAULT_PORTAL)]
    portal: String,

    /// Maximum number of current sessions for the workshop.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: u32,

    /// Number of workshop sessions to maintain ready in reserve.
    #[arg(long, default_value_t = 0)]
    reserved: u32,

    /// Number of workshop sessions to create when first deployed.
    #[arg(long, default_value_t = 0)]
    initial: u32,

    /// Time duration before the workshop is expired.
    #[arg(long, default_value = "")]
    expires: String,

    /// Time extension allowed for the workshop.
    #[arg(long, default_value = "")]
    overtime: String,

    /// Maximum time duration allowed for the workshop.
    #[arg(long, default_value = "")]
    deadline: String,

    /// Allowed inactive time before workshop is terminated.
    #[arg(long, default_value = DEFAULT_ORPHANED)]
    orphaned: String,

    /// Allowed startup time before workshop is deemed failed.
    #[arg(long, default_value = DEFAULT_OVERDUE)]
    overdue: String,

    /// Interval after which workshop environment is recreated.
    #[arg(long, default_value = "")]
    refresh: String,

    /// Environment variable overrides for workshop (NAME=VALUE).
    #[arg(short, long = "env", value_name = "NAME=VALUE")]
    env: Vec<String>,

    /// Location of the workshop definition file.
    #[arg(long, default_value = DEFAULT_WORKSHOP_FILE)]
    workshop_file: String,

    /// Version of the workshop being published.
    #[arg(long, default_value = DEFAULT_WORKSHOP_VERSION)]
    workshop_version: String,

    /// The address of the image repository (host[/namespace]).
    #[arg(long)]
    image_repository: Option<String>,

    #[command(flatten)]
    values: DataValuesArgs,
}

/// Override flags applied when rendering the workshop definition.
#[derive(Args, Debug, Clone, Default)]
pub struct DataValuesArgs {
    /// Extract data values (as strings) from prefixed env vars (PREFIX for PREFIX_key__subkey=str).
    #[arg(long = "data-values-env", value_name = "PREFIX")]
    env_strings: Vec<String>,

    /// Extract data values (parsed as YAML) from prefixed env vars.
    #[arg(long = "data-values-env-yaml", value_name = "PREFIX")]
    env_yaml: Vec<String>,

    /// Set specific data value to given value, as string (key.subkey=value).
    #[arg(long = "data-value", value_name = "KEY=VALUE")]
    values: Vec<String>,

    /// Set specific data value to given value, parsed as YAML (key.subkey=value).
    #[arg(long = "data-value-yaml", value_name = "KEY=VALUE")]
    values_yaml: Vec<String>,

    /// Set specific data value to contents of a file (key.subkey={path, URL or -}).
    #[arg(long = "data-value-file", value_name = "KEY=FILE")]
    value_files: Vec<String>,

    /// Set multiple data values via plain YAML files ({path, URL or -}).
    #[arg(long = "data-values-file", value_name = "FILE")]
    values_files: Vec<String>,
}

impl DataValuesArgs {
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        let overrides = self.env_strings.iter().fold(Overrides::new(), |o, prefix| o.env_prefix(prefix));
        let overrides = self.env_yaml.iter().fold(overrides, |o, prefix| o.env_prefix_yaml(prefix));
        let overrides = self.values_files.iter().fold(overrides, |o, file| o.values_file(file));
        let overrides = self.values.iter().fold(overrides, |o, value| o.value(value));
        let overrides = self.values_yaml.iter().fold(overrides, |o, value| o.value_yaml(value));
        self.value_files.iter().fold(overrides, |o, value| o.value_file(value))
    }
}

impl DeployCommand {
    fn request(&self) -> DeployRequest {
        DeployRequest {
            portal: self.portal.clone(),
            capacity: self.capacity,
            reserved: self.reserved,
            initial: self.initial,
            expires: self.expires.clone(),
            overtime: self.overtime.clone(),
            deadline: self.deadline.clone(),
            orphaned: self.orphaned.clone(),
            overdue: self.overdue.clone(),
            refresh: self.refresh.clone(),
            environment: self.env.clone(),
            registry: self.image_repository.clone(),
        }
    }

    /// Run the deploy command.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition cannot be loaded or the cluster
    /// update fails.
    pub async fn run(&self) -> Result<()> {
        let workshop = DefinitionLoader::new(self.path.as_str())
            .name(self.name.clone())
            .portal(self.portal.as_str())
            .workshop_file(self.workshop_file.as_str())
            .version(self.workshop_version.as_str())
            .overrides(self.values.overrides())
            .load()
            .await?;

        let client = self.cluster.config().client().await?;
        let repository = KubeRepository::new(client);

        let outcome = deploy_workshop(&repository, &workshop, &self.request()).await?;
        info!(portal = %outcome.portal, workshop = workshop.name(), "Deploy complete");

        if outcome.created_portal {
            ui::print_info(&format!("Created training portal {}", outcome.portal));
        }
        ui::print_success(&format!(
            "Deployed workshop {} to training portal {}",
            workshop.name(),
            outcome.portal
        ));
        ui::print_entry(&outcome.entry);

        Ok(())
    }
}

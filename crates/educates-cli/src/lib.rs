//! Educates workshop deployment library.
//!
//! Loads workshop definitions, publishes them as `Workshop` resources and
//! merges them into a `TrainingPortal`'s workshop list, and resolves the URL
//! of a deployed portal.
//!
//! # Example
//!
//! ```ignore
//! use educates_cli::cluster::ClusterConfig;
//! use educates_cli::definition::DefinitionLoader;
//! use educates_cli::deploy::{deploy_workshop, DeployRequest};
//! use educates_cli::repository::KubeRepository;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let workshop = DefinitionLoader::new("./lab-demo").load().await?;
//!     let client = ClusterConfig::default().client().await?;
//!     let repository = KubeRepository::new(client);
//!     deploy_workshop(&repository, &workshop, &DeployRequest::default()).await?;
//!     Ok(())
//! }
//! ```

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

pub mod cluster;
pub mod commands;
pub mod definition;
pub mod deploy;
pub mod error;
pub mod portal;
pub mod repository;
pub mod resources;
pub mod ui;

// Re-export commonly used types at the crate root
pub use error::{Error, Result};

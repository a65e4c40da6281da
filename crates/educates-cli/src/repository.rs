//! Typed access to the Educates resources in a cluster.
//!
//! [`ResourceRepository`] is the seam between the deploy/portal logic and
//! the Kubernetes API so that tests can substitute an in-memory store or a
//! mock while production code talks to the API server.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, PostParams};
use kube::Client;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::error::{Error, Result};
use crate::resources::{
    training_portal_api, workshop_api, TrainingPortal, TrainingPortalStatus, WorkshopDefinition,
    FIELD_MANAGER,
};

/// Get, create and update of `TrainingPortal` and `Workshop` resources.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Fetch a portal, returning `None` when it does not exist.
    async fn get_training_portal(&self, name: &str) -> Result<Option<TrainingPortal>>;

    /// Fetch only the operator-written status of a portal.
    ///
    /// Returns `None` when the portal does not exist and a default status
    /// when it exists without one. The spec is not read.
    async fn get_training_portal_status(&self, name: &str) -> Result<Option<TrainingPortalStatus>>;

    async fn create_training_portal(&self, portal: &TrainingPortal) -> Result<()>;

    /// Replace a portal previously read with [`Self::get_training_portal`].
    ///
    /// Fails with [`Error::PortalConflict`] if the portal changed since it
    /// was read.
    async fn update_training_portal(&self, portal: &TrainingPortal) -> Result<()>;

    async fn get_workshop(&self, name: &str) -> Result<Option<WorkshopDefinition>>;

    async fn create_workshop(&self, workshop: &WorkshopDefinition) -> Result<()>;

    async fn update_workshop(&self, workshop: &WorkshopDefinition) -> Result<()>;
}

/// Repository backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeRepository {
    client: Client,
}

impl KubeRepository {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn portals(&self) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), &training_portal_api())
    }

    fn workshops(&self) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), &workshop_api())
    }

    fn post_params() -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(FIELD_MANAGER.to_string()),
        }
    }

    async fn get(
        api: &Api<DynamicObject>,
        name: &str,
        context: String,
    ) -> Result<Option<DynamicObject>> {
        match api.get(name).await {
            Ok(object) => Ok(Some(object)),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
            Err(e) => Err(Error::from_kube(context, e)),
        }
    }
}

#[async_trait]
impl ResourceRepository for KubeRepository {
    async fn get_training_portal(&self, name: &str) -> Result<Option<TrainingPortal>> {
        let object = Self::get(
            &self.portals(),
            name,
            format!("unable to fetch training portal {name:?}"),
        )
        .await?;

        debug!(portal = name, found = object.is_some(), "Fetched training portal");

        object.map(TrainingPortal::try_from).transpose()
    }

    async fn get_training_portal_status(&self, name: &str) -> Result<Option<TrainingPortalStatus>> {
        let object = Self::get(
            &self.portals(),
            name,
            format!("unable to fetch training portal {name:?}"),
        )
        .await?;

        Ok(object.map(|object| TrainingPortalStatus::from_object(&object).unwrap_or_default()))
    }

    async fn create_training_portal(&self, portal: &TrainingPortal) -> Result<()> {
        self.portals()
            .create(&Self::post_params(), &portal.to_dynamic())
            .await
            .map_err(|e| {
                Error::from_kube(format!("unable to update training portal {:?}", portal.name()), e)
            })?;
        Ok(())
    }

    async fn update_training_portal(&self, portal: &TrainingPortal) -> Result<()> {
        self.portals()
            .replace(portal.name(), &Self::post_params(), &portal.to_dynamic())
            .await
            .map_err(|e| {
                Error::from_kube(format!("unable to update training portal {:?}", portal.name()), e)
            })?;
        Ok(())
    }

    async fn get_workshop(&self, name: &str) -> Result<Option<WorkshopDefinition>> {
        Self::get(&self.workshops(), name, format!("unable to fetch workshop {name:?}"))
            .await?
            .map(WorkshopDefinition::try_from)
            .transpose()
    }

    async fn create_workshop(&self, workshop: &WorkshopDefinition) -> Result<()> {
        self.workshops()
            .create(&Self::post_params(), &workshop.to_dynamic())
            .await
            .map_err(|e| Error::from_kube(format!("unable to update workshop {:?}", workshop.name()), e))?;
        Ok(())
    }

    async fn update_workshop(&self, workshop: &WorkshopDefinition) -> Result<()> {
        self.workshops()
            .replace(workshop.name(), &Self::post_params(), &workshop.to_dynamic())
            .await
            .map_err(|e| Error::from_kube(format!("unable to update workshop {:?}", workshop.name()), e))?;
        Ok(())
    }
}

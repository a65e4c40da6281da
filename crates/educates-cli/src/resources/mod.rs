//! Typed models for the Educates custom resources.
//!
//! Both resources are read and written through [`DynamicObject`] so that
//! fields this tool does not model survive a read-modify-write cycle. Each
//! model keeps unknown keys in a flattened `extra` map and converts to and
//! from the wire form explicitly.

use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use serde::{Deserialize, Deserializer};

pub mod training_portal;
pub mod workshop;

pub use training_portal::{
    EnvVar, PortalSettings, RegistryRef, TrainingPortal, TrainingPortalSpec,
    TrainingPortalStatus, WorkshopEntry,
};
pub use workshop::WorkshopDefinition;

/// API group shared by all Educates training resources.
pub const API_GROUP: &str = "training.educates.dev";

/// API version written by this tool.
pub const API_VERSION: &str = "v1beta1";

/// Identity recorded against every write made by this tool.
pub const FIELD_MANAGER: &str = "educates-cli";

fn api_resource(kind: &str, plural: &str) -> ApiResource {
    ApiResource {
        group: API_GROUP.to_string(),
        version: API_VERSION.to_string(),
        api_version: format!("{API_GROUP}/{API_VERSION}"),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

/// `TrainingPortal` API resource definition.
#[must_use]
pub fn training_portal_api() -> ApiResource {
    api_resource("TrainingPortal", "trainingportals")
}

/// `Workshop` API resource definition.
#[must_use]
pub fn workshop_api() -> ApiResource {
    api_resource("Workshop", "workshops")
}

/// Treat an explicit `null` the same as an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Look up a top-level field of a dynamic object's body.
pub(crate) fn body_field<'a>(object: &'a DynamicObject, key: &str) -> Option<&'a serde_json::Value> {
    object.data.get(key).filter(|value| !value.is_null())
}

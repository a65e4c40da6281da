//! `Workshop` resource model, also used as the rendered workshop definition.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{body_field, workshop_api, API_GROUP, API_VERSION, EnvVar};
use crate::error::{Error, Result};

/// Packaging metadata for a reusable workshop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkshopDefinition {
    pub metadata: ObjectMeta,
    pub spec: WorkshopSpec,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkshopSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Opaque duration literal such as `45m`. Kept as written so that a
    /// non-string value is published unchanged and simply not used as the
    /// session expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workshop: Option<ContentSource>,
    /// Older layout for the content image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSpec>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvVar>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl WorkshopDefinition {
    /// Build a definition from a rendered YAML/JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if the document is not a `Workshop` of the
    /// expected API version or its metadata or spec cannot be read.
    pub fn from_document(document: &Value) -> Result<Self> {
        let api_version = document.get("apiVersion").and_then(Value::as_str);
        let kind = document.get("kind").and_then(Value::as_str);

        let expected = format!("{API_GROUP}/{API_VERSION}");

        if api_version != Some(expected.as_str()) || kind != Some("Workshop") {
            return Err(Error::schema("invalid type for workshop definition"));
        }

        let metadata = match document.get("metadata") {
            Some(metadata) if !metadata.is_null() => serde_json::from_value(metadata.clone())
                .map_err(|e| Error::schema(format!("metadata: {e}")))?,
            _ => ObjectMeta::default(),
        };

        let spec = match document.get("spec") {
            Some(spec) if !spec.is_null() => serde_json::from_value(spec.clone())
                .map_err(|e| Error::schema(format!("spec: {e}")))?,
            _ => WorkshopSpec::default(),
        };

        Ok(Self { metadata, spec })
    }

    /// Check the fields every deployable workshop must carry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        if self.name().is_empty() {
            return Err(Error::schema("missing required field metadata.name"));
        }
        if self.content_image().is_none() {
            return Err(Error::schema("missing required field spec.workshop.image"));
        }
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.spec.title.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.spec.description.as_deref()
    }

    #[must_use]
    pub fn duration(&self) -> Option<&str> {
        self.spec
            .duration
            .as_ref()
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
    }

    /// Image holding the packaged workshop content.
    #[must_use]
    pub fn content_image(&self) -> Option<&str> {
        [&self.spec.workshop, &self.spec.content]
            .into_iter()
            .filter_map(|source| source.as_ref()?.image.as_deref())
            .find(|image| !image.is_empty())
    }

    /// Environment variables declared for every session.
    #[must_use]
    pub fn variables(&self) -> &[EnvVar] {
        self.spec
            .session
            .as_ref()
            .and_then(|session| session.env.as_deref())
            .unwrap_or_default()
    }

    pub fn set_annotation(&mut self, key: &str, value: impl Into<String>) {
        self.metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.into());
    }

    #[must_use]
    pub fn to_dynamic(&self) -> DynamicObject {
        let mut object = DynamicObject::new(self.name(), &workshop_api())
            .data(serde_json::json!({ "spec": self.spec }));
        object.metadata = self.metadata.clone();
        object
    }
}

impl TryFrom<DynamicObject> for WorkshopDefinition {
    type Error = Error;

    fn try_from(object: DynamicObject) -> Result<Self> {
        let spec = body_field(&object, "spec")
            .map(|spec| serde_json::from_value(spec.clone()))
            .transpose()
            .map_err(|e| Error::schema(format!("spec: {e}")))?
            .unwrap_or_default();

        Ok(Self {
            metadata: object.metadata,
            spec,
        })
    }
}

//! `TrainingPortal` resource model.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{body_field, null_as_default, training_portal_api};
use crate::error::{Error, Result};

/// A deployed multi-tenant workshop catalog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingPortal {
    pub metadata: ObjectMeta,
    pub spec: TrainingPortalSpec,
    /// Written by the portal operator, never by this tool.
    pub status: Option<TrainingPortalStatus>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingPortalSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal: Option<PortalSettings>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub workshops: Vec<WorkshopEntry>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Portal-wide settings under `spec.portal`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updates: Option<UpdatePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<SessionLimits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workshop: Option<PortalWorkshopSettings>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdatePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workshop: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortalWorkshopSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<WorkshopDefaults>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkshopDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One workshop hosted by a portal, with its session-pool policy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkshopEntry {
    pub name: String,
    /// Absent means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphaned: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overdue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvVar>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Image registry a workshop pulls its content from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryRef {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RegistryRef {
    /// Parse `host[/namespace]`, splitting on the first `/`.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        let (host, namespace) = match reference.split_once('/') {
            Some((host, namespace)) => (host, Some(namespace.to_string())),
            None => (reference, None),
        };

        Self {
            host: host.to_string(),
            namespace,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingPortalStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub educates: Option<EducatesStatus>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EducatesStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TrainingPortalStatus {
    /// Read the status of a portal without interpreting its spec.
    ///
    /// A missing or unreadable status yields `None`.
    #[must_use]
    pub fn from_object(object: &DynamicObject) -> Option<Self> {
        body_field(object, "status").and_then(|status| serde_json::from_value(status.clone()).ok())
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.educates
            .as_ref()
            .and_then(|educates| educates.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

impl TrainingPortal {
    /// Build the portal created on first deploy to `name`.
    pub fn with_defaults(name: &str, password: String) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: TrainingPortalSpec {
                portal: Some(PortalSettings {
                    password: Some(password),
                    registration: Some(Registration {
                        kind: Some("anonymous".to_string()),
                        ..Default::default()
                    }),
                    updates: Some(UpdatePolicy {
                        workshop: Some(true),
                        ..Default::default()
                    }),
                    sessions: Some(SessionLimits {
                        maximum: Some(1),
                        ..Default::default()
                    }),
                    workshop: Some(PortalWorkshopSettings {
                        defaults: Some(WorkshopDefaults {
                            reserved: Some(0),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    extra: BTreeMap::new(),
                }),
                workshops: Vec::new(),
                extra: BTreeMap::new(),
            },
            status: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Portal-wide ceiling on concurrent sessions, if declared.
    #[must_use]
    pub fn sessions_maximum(&self) -> Option<i64> {
        self.spec
            .portal
            .as_ref()
            .and_then(|portal| portal.sessions.as_ref())
            .and_then(|sessions| sessions.maximum)
    }

    /// Public URL published by the portal operator once the portal is up.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.status.as_ref().and_then(TrainingPortalStatus::url)
    }

    #[must_use]
    pub fn find_workshop(&self, name: &str) -> Option<&WorkshopEntry> {
        self.spec.workshops.iter().find(|entry| entry.name == name)
    }

    /// Wire form used for create and update requests.
    ///
    /// Metadata and any status read from the cluster are carried over so
    /// that an update keeps the `resourceVersion` and the operator's URL.
    #[must_use]
    pub fn to_dynamic(&self) -> DynamicObject {
        let mut body = serde_json::json!({ "spec": self.spec });
        if let Some(status) = &self.status {
            body["status"] = serde_json::json!(status);
        }

        let mut object = DynamicObject::new(self.name(), &training_portal_api()).data(body);
        object.metadata = self.metadata.clone();
        object
    }
}

impl TryFrom<DynamicObject> for TrainingPortal {
    type Error = Error;

    fn try_from(object: DynamicObject) -> Result<Self> {
        let portal = object.metadata.name.clone().unwrap_or_default();

        let spec = match body_field(&object, "spec") {
            Some(spec) => {
                if let Some(workshops) = spec.get("workshops") {
                    if !workshops.is_array() && !workshops.is_null() {
                        return Err(Error::Read {
                            portal,
                            message: "workshops is not a list".to_string(),
                        });
                    }
                }
                serde_json::from_value(spec.clone()).map_err(|e| Error::Read {
                    portal: portal.clone(),
                    message: e.to_string(),
                })?
            }
            None => TrainingPortalSpec::default(),
        };

        let status = TrainingPortalStatus::from_object(&object);

        Ok(Self {
            metadata: object.metadata,
            spec,
            status,
        })
    }
}

//! Workshop deployment into a training portal.
//!
//! A deploy is a single read-modify-write of the target `TrainingPortal`:
//! read it (or synthesize a new one), merge the workshop's entry into its
//! workshop list and write it back once. There is no retry; a concurrent
//! change to the portal makes the write fail with
//! [`Error::PortalConflict`].

use rand::rngs::OsRng;
use rand::Rng;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::repository::ResourceRepository;
use crate::resources::{EnvVar, RegistryRef, TrainingPortal, WorkshopDefinition, WorkshopEntry};

/// Portal used when none is named.
pub const DEFAULT_PORTAL: &str = "educates-cli";

pub const DEFAULT_CAPACITY: u32 = 1;
pub const DEFAULT_ORPHANED: &str = "5m";
pub const DEFAULT_OVERDUE: &str = "2m";

/// Expiry used when neither the request nor the definition gives one.
pub const DEFAULT_EXPIRES: &str = "60m";

pub const PASSWORD_LENGTH: usize = 12;

/// Password characters, without glyphs that are easy to confuse.
pub const PASSWORD_ALPHABET: &[u8] =
    b"!#%+23456789:=?@ABCDEFGHJKLMNPRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Requested session parameters for one deploy.
///
/// Duration fields are opaque literals passed through to the portal; an
/// empty string means "not set".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub portal: String,
    /// Zero means unlimited.
    pub capacity: u32,
    pub reserved: u32,
    pub initial: u32,
    pub expires: String,
    pub overtime: String,
    pub deadline: String,
    pub orphaned: String,
    pub overdue: String,
    pub refresh: String,
    /// `NAME=VALUE` assignments.
    pub environment: Vec<String>,
    /// `host[/namespace]`.
    pub registry: Option<String>,
}

impl Default for DeployRequest {
    fn default() -> Self {
        Self {
            portal: DEFAULT_PORTAL.to_string(),
            capacity: DEFAULT_CAPACITY,
            reserved: 0,
            initial: 0,
            expires: String::new(),
            overtime: String::new(),
            deadline: String::new(),
            orphaned: DEFAULT_ORPHANED.to_string(),
            overdue: DEFAULT_OVERDUE.to_string(),
            refresh: String::new(),
            environment: Vec::new(),
            registry: None,
        }
    }
}

/// What the portal looked like before the deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalState {
    /// Portal is being created by this deploy.
    New,
    /// Portal already existed with this declared session maximum.
    Existing { sessions_maximum: Option<i64> },
}

/// Session pool sizing after clamping to the portal's limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounts {
    /// `None` means unlimited.
    pub capacity: Option<u32>,
    pub reserved: u32,
    pub initial: u32,
}

impl SessionCounts {
    /// Clamp requested counts against the portal.
    ///
    /// A new portal always gets capacity 1. An existing portal caps capacity
    /// at its non-negative session maximum. Reserved and initial never exceed
    /// the capacity, or the session maximum when capacity is unlimited.
    #[must_use]
    pub fn clamp(capacity: u32, reserved: u32, initial: u32, state: PortalState) -> Self {
        let (capacity, maximum) = match state {
            PortalState::New => (1, Some(1)),
            PortalState::Existing { sessions_maximum } => {
                let capacity = match sessions_maximum.map(u32::try_from) {
                    Some(Ok(maximum)) if maximum < capacity => maximum,
                    _ => capacity,
                };
                (capacity, sessions_maximum)
            }
        };

        let limit = if capacity != 0 {
            Some(capacity)
        } else {
            maximum
                .filter(|maximum| *maximum > 0)
                .map(|maximum| u32::try_from(maximum).unwrap_or(u32::MAX))
        };

        let (reserved, initial) = match limit {
            Some(limit) => (reserved.min(limit), initial.min(limit)),
            None => (reserved, initial),
        };

        Self {
            capacity: (capacity != 0).then_some(capacity),
            reserved,
            initial,
        }
    }
}

/// Field values written to the workshop's entry in the portal.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySettings {
    pub counts: SessionCounts,
    pub expires: String,
    pub overtime: String,
    pub deadline: String,
    pub orphaned: String,
    pub overdue: String,
    pub refresh: String,
    pub environment: Vec<EnvVar>,
    pub registry: Option<RegistryRef>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl EntrySettings {
    /// Overwrite `entry` so that each optional field is present only when a
    /// non-empty value was supplied.
    pub fn apply(&self, entry: &mut WorkshopEntry) {
        entry.capacity = self.counts.capacity;
        entry.reserved = Some(self.counts.reserved);
        entry.initial = Some(self.counts.initial);
        entry.expires = non_empty(&self.expires);
        entry.overtime = non_empty(&self.overtime);
        entry.deadline = non_empty(&self.deadline);
        entry.orphaned = non_empty(&self.orphaned);
        entry.overdue = non_empty(&self.overdue);
        entry.refresh = non_empty(&self.refresh);
        entry.env = (!self.environment.is_empty()).then(|| self.environment.clone());
        entry.registry = self.registry.clone();
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> WorkshopEntry {
        let mut entry = WorkshopEntry {
            name: name.to_string(),
            ..Default::default()
        };
        self.apply(&mut entry);
        entry
    }
}

/// Result of a successful deploy.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployOutcome {
    pub portal: String,
    pub created_portal: bool,
    pub entry: WorkshopEntry,
}

/// Split `NAME=VALUE` assignments on the first `=`.
///
/// # Errors
///
/// Returns [`Error::Input`] for an assignment without `=`.
pub fn parse_environment(assignments: &[String]) -> Result<Vec<EnvVar>> {
    assignments
        .iter()
        .map(|assignment| {
            assignment
                .split_once('=')
                .map(|(name, value)| EnvVar::new(name, value))
                .ok_or_else(|| Error::input(assignment.as_str(), "expected NAME=VALUE"))
        })
        .collect()
}

/// Expiry for the entry: the requested one, else the workshop's duration.
#[must_use]
pub fn resolve_expires(requested: &str, workshop: &WorkshopDefinition) -> String {
    if !requested.is_empty() {
        return requested.to_string();
    }
    workshop.duration().unwrap_or(DEFAULT_EXPIRES).to_string()
}

/// Random portal password drawn from [`PASSWORD_ALPHABET`].
pub fn generate_password<R: Rng>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())]))
        .collect()
}

/// Merge the entry for `name` into `entries`.
///
/// Entries for other workshops are left untouched. Returns `true` when an
/// existing entry was rewritten and `false` when a new one was appended.
pub fn merge_workshop_entry(
    entries: &mut Vec<WorkshopEntry>,
    name: &str,
    settings: &EntrySettings,
) -> bool {
    let mut found = false;

    for entry in entries.iter_mut().filter(|entry| entry.name == name) {
        settings.apply(entry);
        found = true;
    }

    if !found {
        entries.push(settings.entry(name));
    }

    found
}

/// Create or replace the `Workshop` resource for a definition.
///
/// # Errors
///
/// Returns the repository error if the read or write fails.
pub async fn publish_workshop<R>(repository: &R, workshop: &WorkshopDefinition) -> Result<()>
where
    R: ResourceRepository + ?Sized,
{
    match repository.get_workshop(workshop.name()).await? {
        Some(existing) => {
            let mut updated = workshop.clone();
            updated.metadata.resource_version = existing.metadata.resource_version;
            repository.update_workshop(&updated).await?;
            info!(workshop = workshop.name(), "Updated workshop definition");
        }
        None => {
            repository.create_workshop(workshop).await?;
            info!(workshop = workshop.name(), "Created workshop definition");
        }
    }
    Ok(())
}

/// Publish the workshop and add or update its entry in the portal.
///
/// The portal is read and the merge computed before anything is written.
///
/// # Errors
///
/// Returns [`Error::Input`] for malformed environment overrides before
/// anything is written, [`Error::Read`] if the portal's workshop list is
/// unreadable, and the repository's error if a read or write fails. A
/// concurrent change to the portal surfaces as [`Error::PortalConflict`].
pub async fn deploy_workshop<R>(
    repository: &R,
    workshop: &WorkshopDefinition,
    request: &DeployRequest,
) -> Result<DeployOutcome>
where
    R: ResourceRepository + ?Sized,
{
    let environment = parse_environment(&request.environment)?;
    let portal_name = if request.portal.is_empty() {
        DEFAULT_PORTAL
    } else {
        request.portal.as_str()
    };

    info!(
        portal = portal_name,
        workshop = workshop.name(),
        "Deploying workshop"
    );

    let (mut portal, state) = match repository.get_training_portal(portal_name).await? {
        Some(portal) => {
            let sessions_maximum = portal.sessions_maximum();
            (portal, PortalState::Existing { sessions_maximum })
        }
        None => {
            let password = generate_password(&mut OsRng, PASSWORD_LENGTH);
            (
                TrainingPortal::with_defaults(portal_name, password),
                PortalState::New,
            )
        }
    };

    let counts = SessionCounts::clamp(request.capacity, request.reserved, request.initial, state);
    debug!(
        portal = portal_name,
        capacity = ?counts.capacity,
        reserved = counts.reserved,
        initial = counts.initial,
        "Computed session counts"
    );

    let settings = EntrySettings {
        counts,
        expires: resolve_expires(&request.expires, workshop),
        overtime: request.overtime.clone(),
        deadline: request.deadline.clone(),
        orphaned: request.orphaned.clone(),
        overdue: request.overdue.clone(),
        refresh: request.refresh.clone(),
        environment,
        registry: request
            .registry
            .as_deref()
            .filter(|registry| !registry.is_empty())
            .map(RegistryRef::parse),
    };

    let updated = merge_workshop_entry(&mut portal.spec.workshops, workshop.name(), &settings);
    debug!(portal = portal_name, updated, "Merged workshop entry");

    publish_workshop(repository, workshop).await?;

    let created_portal = state == PortalState::New;
    if created_portal {
        repository.create_training_portal(&portal).await?;
        info!(portal = portal_name, "Created training portal");
    } else {
        repository.update_training_portal(&portal).await?;
        info!(portal = portal_name, "Updated training portal");
    }

    let entry = portal
        .find_workshop(workshop.name())
        .cloned()
        .unwrap_or_else(|| settings.entry(workshop.name()));

    Ok(DeployOutcome {
        portal: portal_name.to_string(),
        created_portal,
        entry,
    })
}

#[cfg(test)]
mod tests {
    use kube::api::DynamicObject;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};

    use super::*;
    use crate::repository::memory::{api_error, InMemoryRepository};
    use crate::repository::MockResourceRepository;
    use crate::resources::training_portal_api;

    fn workshop(name: &str, duration: Option<&str>) -> WorkshopDefinition {
        let mut document = json!({
            "apiVersion": "training.educates.dev/v1beta1",
            "kind": "Workshop",
            "metadata": { "name": name },
            "spec": { "workshop": { "image": "ghcr.io/educates/lab:latest" } },
        });
        if let Some(duration) = duration {
            document["spec"]["duration"] = json!(duration);
        }
        WorkshopDefinition::from_document(&document).unwrap()
    }

    fn request(portal: &str) -> DeployRequest {
        DeployRequest {
            portal: portal.to_string(),
            ..Default::default()
        }
    }

    fn existing_portal(name: &str, spec: Value) -> DynamicObject {
        DynamicObject::new(name, &training_portal_api()).data(json!({ "spec": spec }))
    }

    fn stored_spec(repository: &InMemoryRepository, portal: &str) -> Value {
        repository.portal_object(portal).unwrap().data["spec"].clone()
    }

    fn stored_entry(repository: &InMemoryRepository, portal: &str, name: &str) -> Value {
        stored_spec(repository, portal)["workshops"]
            .as_array()
            .unwrap()
            .iter()
            .find(|entry| entry["name"] == name)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_clamp_to_existing_maximum() {
        let counts = SessionCounts::clamp(
            10,
            8,
            7,
            PortalState::Existing {
                sessions_maximum: Some(5),
            },
        );
        assert_eq!(
            counts,
            SessionCounts {
                capacity: Some(5),
                reserved: 5,
                initial: 5
            }
        );
    }

    #[test]
    fn test_clamp_reserved_and_initial_to_capacity() {
        let counts = SessionCounts::clamp(
            3,
            4,
            9,
            PortalState::Existing {
                sessions_maximum: Some(10),
            },
        );
        assert_eq!(counts.capacity, Some(3));
        assert_eq!(counts.reserved, 3);
        assert_eq!(counts.initial, 3);
    }

    #[test]
    fn test_new_portal_forces_capacity_one() {
        let counts = SessionCounts::clamp(0, 2, 2, PortalState::New);
        assert_eq!(
            counts,
            SessionCounts {
                capacity: Some(1),
                reserved: 1,
                initial: 1
            }
        );
    }

    #[test]
    fn test_unlimited_capacity_clamps_to_maximum() {
        let counts = SessionCounts::clamp(
            0,
            9,
            2,
            PortalState::Existing {
                sessions_maximum: Some(4),
            },
        );
        assert_eq!(counts.capacity, None);
        assert_eq!(counts.reserved, 4);
        assert_eq!(counts.initial, 2);
    }

    #[test]
    fn test_no_maximum_leaves_counts() {
        let counts = SessionCounts::clamp(
            0,
            9,
            9,
            PortalState::Existing {
                sessions_maximum: None,
            },
        );
        assert_eq!(counts.capacity, None);
        assert_eq!(counts.reserved, 9);

        let counts = SessionCounts::clamp(
            6,
            2,
            1,
            PortalState::Existing {
                sessions_maximum: Some(-1),
            },
        );
        assert_eq!(counts.capacity, Some(6));
    }

    #[test]
    fn test_zero_maximum_makes_capacity_unlimited() {
        let counts = SessionCounts::clamp(
            3,
            1,
            1,
            PortalState::Existing {
                sessions_maximum: Some(0),
            },
        );
        assert_eq!(counts.capacity, None);
        assert_eq!(counts.reserved, 1);
    }

    #[test]
    fn test_parse_environment() {
        let env = parse_environment(&["A=1".to_string(), "B=x=y".to_string(), "C=".to_string()])
            .unwrap();
        assert_eq!(
            env,
            vec![
                EnvVar::new("A", "1"),
                EnvVar::new("B", "x=y"),
                EnvVar::new("C", "")
            ]
        );

        let err = parse_environment(&["BROKEN".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Input { .. }));
    }

    #[test]
    fn test_resolve_expires() {
        assert_eq!(resolve_expires("15m", &workshop("w", Some("45m"))), "15m");
        assert_eq!(resolve_expires("", &workshop("w", Some("45m"))), "45m");
        assert_eq!(resolve_expires("", &workshop("w", None)), "60m");
    }

    #[test]
    fn test_password_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        let password = generate_password(&mut rng, PASSWORD_LENGTH);
        assert_eq!(password.len(), PASSWORD_LENGTH);
        assert!(password.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));
        for ambiguous in ['0', 'O', '1', 'l', 'I'] {
            assert!(!PASSWORD_ALPHABET.contains(&(ambiguous as u8)));
        }

        let mut again = StdRng::seed_from_u64(7);
        assert_eq!(generate_password(&mut again, PASSWORD_LENGTH), password);
    }

    #[tokio::test]
    async fn test_end_to_end_new_portal() {
        let repository = InMemoryRepository::default();
        let request = DeployRequest {
            portal: "train1".to_string(),
            capacity: 3,
            reserved: 1,
            initial: 1,
            orphaned: String::new(),
            overdue: String::new(),
            ..Default::default()
        };

        let outcome = deploy_workshop(&repository, &workshop("lab-demo", Some("45m")), &request)
            .await
            .unwrap();
        assert!(outcome.created_portal);
        assert_eq!(outcome.entry.capacity, Some(1));

        let spec = stored_spec(&repository, "train1");
        assert_eq!(
            spec["workshops"],
            json!([{
                "name": "lab-demo",
                "capacity": 1,
                "reserved": 1,
                "initial": 1,
                "expires": "45m",
            }])
        );
        assert_eq!(spec["portal"]["sessions"]["maximum"], 1);
        assert_eq!(spec["portal"]["registration"]["type"], "anonymous");
        assert_eq!(spec["portal"]["updates"]["workshop"], true);
        assert_eq!(spec["portal"]["workshop"]["defaults"]["reserved"], 0);
        let password = spec["portal"]["password"].as_str().unwrap();
        assert_eq!(password.len(), PASSWORD_LENGTH);

        assert!(repository.workshop_object("lab-demo").is_some());
    }

    #[tokio::test]
    async fn test_redeploy_keeps_portal_status() {
        let repository = InMemoryRepository::default();
        repository.seed_portal(
            DynamicObject::new("p", &training_portal_api()).data(json!({
                "spec": { "portal": { "sessions": { "maximum": 2 } }, "workshops": [] },
                "status": { "educates": { "url": "https://x", "phase": "Running" } },
            })),
        );

        deploy_workshop(&repository, &workshop("w", None), &request("p"))
            .await
            .unwrap();

        let stored = repository.portal_object("p").unwrap();
        assert_eq!(stored.data["status"]["educates"]["url"], "https://x");
        assert_eq!(stored.data["status"]["educates"]["phase"], "Running");
        assert_eq!(
            crate::portal::portal_url(&repository, "p", false).await.unwrap(),
            "https://x"
        );
    }

    #[tokio::test]
    async fn test_default_request_fields() {
        let repository = InMemoryRepository::default();
        deploy_workshop(&repository, &workshop("w", None), &request(""))
            .await
            .unwrap();

        let entry = stored_entry(&repository, DEFAULT_PORTAL, "w");
        assert_eq!(entry["orphaned"], "5m");
        assert_eq!(entry["overdue"], "2m");
        assert_eq!(entry["expires"], "60m");
        assert!(entry.get("overtime").is_none());
        assert!(entry.get("registry").is_none());
        assert!(entry.get("env").is_none());
    }

    #[tokio::test]
    async fn test_redeploy_is_idempotent() {
        let repository = InMemoryRepository::default();
        repository.seed_portal(existing_portal(
            "p",
            json!({ "portal": { "sessions": { "maximum": 10 } }, "workshops": [] }),
        ));

        let request = DeployRequest {
            portal: "p".to_string(),
            capacity: 4,
            reserved: 2,
            overtime: "10m".to_string(),
            environment: vec!["A=1".to_string()],
            registry: Some("reg.example/team".to_string()),
            ..Default::default()
        };
        let definition = workshop("w", Some("30m"));

        deploy_workshop(&repository, &definition, &request).await.unwrap();
        let first = serde_json::to_vec(&stored_entry(&repository, "p", "w")).unwrap();

        let outcome = deploy_workshop(&repository, &definition, &request).await.unwrap();
        assert!(!outcome.created_portal);
        let second = serde_json::to_vec(&stored_entry(&repository, "p", "w")).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            stored_spec(&repository, "p")["workshops"].as_array().unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_clamps_against_existing_portal() {
        let repository = InMemoryRepository::default();
        repository.seed_portal(existing_portal(
            "p",
            json!({ "portal": { "sessions": { "maximum": 2 } } }),
        ));

        let request = DeployRequest {
            portal: "p".to_string(),
            capacity: 5,
            reserved: 4,
            initial: 3,
            ..Default::default()
        };
        deploy_workshop(&repository, &workshop("w", None), &request)
            .await
            .unwrap();

        let entry = stored_entry(&repository, "p", "w");
        assert_eq!(entry["capacity"], 2);
        assert_eq!(entry["reserved"], 2);
        assert_eq!(entry["initial"], 2);
    }

    #[tokio::test]
    async fn test_empty_value_clears_field() {
        let repository = InMemoryRepository::default();
        repository.seed_portal(existing_portal(
            "p",
            json!({ "portal": { "sessions": { "maximum": 3 } } }),
        ));
        let definition = workshop("w", None);

        let mut request = DeployRequest {
            portal: "p".to_string(),
            overtime: "10m".to_string(),
            refresh: "1h".to_string(),
            registry: Some("reg.example".to_string()),
            environment: vec!["A=1".to_string()],
            ..Default::default()
        };
        deploy_workshop(&repository, &definition, &request).await.unwrap();

        let entry = stored_entry(&repository, "p", "w");
        assert_eq!(entry["overtime"], "10m");
        assert_eq!(entry["refresh"], "1h");
        assert_eq!(entry["registry"], json!({ "host": "reg.example" }));
        assert_eq!(entry["env"], json!([{ "name": "A", "value": "1" }]));

        request.overtime = String::new();
        request.refresh = String::new();
        request.registry = None;
        request.environment = vec!["B=2".to_string()];
        request.capacity = 0;
        deploy_workshop(&repository, &definition, &request).await.unwrap();

        let entry = stored_entry(&repository, "p", "w");
        assert!(entry.get("overtime").is_none());
        assert!(entry.get("refresh").is_none());
        assert!(entry.get("registry").is_none());
        assert!(entry.get("capacity").is_none());
        assert_eq!(entry["env"], json!([{ "name": "B", "value": "2" }]));
    }

    #[tokio::test]
    async fn test_registry_parsing() {
        let repository = InMemoryRepository::default();
        let request = DeployRequest {
            portal: "p".to_string(),
            registry: Some("reg.example/team".to_string()),
            ..Default::default()
        };
        deploy_workshop(&repository, &workshop("w", None), &request)
            .await
            .unwrap();

        assert_eq!(
            stored_entry(&repository, "p", "w")["registry"],
            json!({ "host": "reg.example", "namespace": "team" })
        );
    }

    #[tokio::test]
    async fn test_other_entries_pass_through() {
        let repository = InMemoryRepository::default();
        let other = json!({
            "name": "other",
            "capacity": 7,
            "expires": "2h",
            "env": [{ "name": "X", "valueFrom": { "configMapKeyRef": { "name": "cm", "key": "x" } } }],
            "labels": [{ "name": "team", "value": "a" }],
        });
        repository.seed_portal(existing_portal(
            "p",
            json!({
                "portal": { "sessions": { "maximum": 10 }, "title": "Kept" },
                "workshops": [other.clone()],
            }),
        ));

        deploy_workshop(&repository, &workshop("w", None), &request("p"))
            .await
            .unwrap();

        let spec = stored_spec(&repository, "p");
        assert_eq!(spec["workshops"][0], other);
        assert_eq!(spec["workshops"][1]["name"], "w");
        assert_eq!(spec["portal"]["title"], "Kept");
    }

    #[tokio::test]
    async fn test_invalid_environment_writes_nothing() {
        let repository = InMemoryRepository::default();
        let request = DeployRequest {
            portal: "p".to_string(),
            environment: vec!["NOVALUE".to_string()],
            ..Default::default()
        };

        let err = deploy_workshop(&repository, &workshop("w", None), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Input { .. }));
        assert!(repository.portal_object("p").is_none());
        assert!(repository.workshop_object("w").is_none());
    }

    #[tokio::test]
    async fn test_unreadable_workshop_list() {
        let repository = InMemoryRepository::default();
        repository.seed_portal(existing_portal("p", json!({ "workshops": "lab" })));

        let err = deploy_workshop(&repository, &workshop("w", None), &request("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(repository.workshop_object("w").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_change_fails_without_retry() {
        let mut repository = MockResourceRepository::new();
        let portal = TrainingPortal::try_from(existing_portal(
            "p",
            json!({ "portal": { "sessions": { "maximum": 2 } } }),
        ))
        .unwrap();

        repository.expect_get_workshop().returning(|_| Ok(None));
        repository.expect_create_workshop().returning(|_| Ok(()));
        repository
            .expect_get_training_portal()
            .times(1)
            .returning(move |_| Ok(Some(portal.clone())));
        repository
            .expect_update_training_portal()
            .times(1)
            .returning(|_| {
                Err(Error::from_kube(
                    "unable to update training portal \"p\"",
                    api_error(409, "Conflict"),
                ))
            });
        repository.expect_create_training_portal().never();

        let err = deploy_workshop(&repository, &workshop("w", None), &request("p"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err
            .to_string()
            .starts_with("unable to update training portal \"p\""));
    }

    #[tokio::test]
    async fn test_unreachable_cluster_writes_nothing() {
        let mut repository = MockResourceRepository::new();
        repository.expect_get_training_portal().returning(|_| {
            Err(Error::from_kube(
                "unable to fetch training portal \"p\"",
                api_error(401, "Unauthorized"),
            ))
        });
        repository.expect_get_workshop().never();
        repository.expect_create_workshop().never();
        repository.expect_update_workshop().never();
        repository.expect_create_training_portal().never();
        repository.expect_update_training_portal().never();

        let err = deploy_workshop(&repository, &workshop("w", None), &request("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ClusterUnreachable { .. }));
    }

    #[tokio::test]
    async fn test_publish_updates_existing_workshop() {
        let repository = InMemoryRepository::default();
        let mut definition = workshop("w", Some("30m"));
        publish_workshop(&repository, &definition).await.unwrap();

        definition.spec.duration = Some(json!("40m"));
        publish_workshop(&repository, &definition).await.unwrap();

        let stored = repository.workshop_object("w").unwrap();
        assert_eq!(stored.data["spec"]["duration"], "40m");
        assert_eq!(stored.metadata.resource_version.as_deref(), Some("2"));
    }
}

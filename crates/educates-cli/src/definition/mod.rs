//! Workshop definition loading.
//!
//! A definition is read from a local directory, a local file or an HTTP(S)
//! URL, rendered with any overrides and checked for the fields needed to
//! deploy it.

use std::path::PathBuf;

use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::resources::WorkshopDefinition;

mod overrides;

pub use overrides::{merge, Overrides, RenderContext};

/// Definition file looked up beneath a workshop directory.
pub const DEFAULT_WORKSHOP_FILE: &str = "resources/workshop.yaml";

/// Version meaning "do not stamp a version on the definition".
pub const DEFAULT_WORKSHOP_VERSION: &str = "latest";

/// Annotation recording the name the definition declared.
pub const WORKSHOP_ANNOTATION: &str = "training.educates.dev/workshop";

/// Annotation recording where the definition was loaded from.
pub const SOURCE_ANNOTATION: &str = "training.educates.dev/source";

/// Annotation recording the portal the definition was deployed for.
pub const PORTAL_ANNOTATION: &str = "training.educates.dev/portal";

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Local(PathBuf),
    Remote(Url),
}

impl Source {
    fn locate(location: &str, workshop_file: &str) -> Result<Self> {
        let mut path = PathBuf::from(if location.is_empty() { "." } else { location });

        if let Ok(url) = Url::parse(location) {
            match url.scheme() {
                "http" | "https" => return Ok(Self::Remote(url)),
                "file" => {
                    path = url
                        .to_file_path()
                        .map_err(|()| Error::definition_not_found(location, "invalid file URL"))?;
                }
                _ => {}
            }
        }

        let path = std::path::absolute(&path)
            .map_err(|e| Error::definition_not_found(path.display().to_string(), e))?;

        let metadata = std::fs::metadata(&path)
            .map_err(|e| Error::definition_not_found(path.display().to_string(), e))?;

        if metadata.is_dir() {
            Ok(Self::Local(path.join(workshop_file)))
        } else {
            Ok(Self::Local(path))
        }
    }

    fn annotation(&self) -> String {
        match self {
            Self::Local(path) => format!("file://{}", path.display()),
            Self::Remote(url) => url.to_string(),
        }
    }

    fn base_url(&self) -> Option<Url> {
        match self {
            Self::Local(_) => None,
            Self::Remote(url) => Some(url.clone()),
        }
    }

    async fn read(&self) -> Result<String> {
        match self {
            Self::Local(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| Error::definition_not_found(path.display().to_string(), e)),
            Self::Remote(url) => {
                let response = reqwest::get(url.clone())
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(|e| Error::definition_not_found(url.as_str(), e))?;
                response
                    .text()
                    .await
                    .map_err(|e| Error::definition_not_found(url.as_str(), e))
            }
        }
    }
}

/// Builder collecting everything needed to produce a [`WorkshopDefinition`].
///
/// ```ignore
/// let workshop = DefinitionLoader::new("./lab-demo")
///     .portal("train1")
///     .overrides(Overrides::new().value("spec.duration=45m"))
///     .load()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct DefinitionLoader {
    location: String,
    workshop_file: String,
    name: Option<String>,
    portal: Option<String>,
    version: String,
    overrides: Overrides,
    environment: Option<Vec<(String, String)>>,
}

impl DefinitionLoader {
    /// Start from a directory, file path or HTTP(S) URL.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            workshop_file: DEFAULT_WORKSHOP_FILE.to_string(),
            name: None,
            portal: None,
            version: DEFAULT_WORKSHOP_VERSION.to_string(),
            overrides: Overrides::default(),
            environment: None,
        }
    }

    /// Definition file used when the location is a directory.
    #[must_use]
    pub fn workshop_file(mut self, workshop_file: impl Into<String>) -> Self {
        self.workshop_file = workshop_file.into();
        self
    }

    /// Publish under this name instead of the declared one.
    #[must_use]
    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|name| !name.is_empty());
        self
    }

    #[must_use]
    pub fn portal(mut self, portal: impl Into<String>) -> Self {
        self.portal = Some(portal.into()).filter(|portal| !portal.is_empty());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Environment visible to prefix extraction; the process environment
    /// when not set.
    #[must_use]
    pub fn environment(mut self, environment: impl IntoIterator<Item = (String, String)>) -> Self {
        self.environment = Some(environment.into_iter().collect());
        self
    }

    /// Read, render and validate the definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DefinitionNotFound`] if nothing can be read at the
    /// location, [`Error::Render`] or [`Error::Input`] if the document or an
    /// override is malformed, and [`Error::Schema`] if the rendered document
    /// is not a deployable `Workshop`.
    pub async fn load(self) -> Result<WorkshopDefinition> {
        let source = Source::locate(&self.location, &self.workshop_file)?;
        debug!(source = %source.annotation(), "Reading workshop definition");

        let content = source.read().await?;
        let document: Value = serde_yaml::from_str(&content)
            .map_err(|e| Error::render_with("couldn't parse workshop definition", e))?;

        let context = RenderContext {
            base_url: source.base_url(),
            environment: self
                .environment
                .unwrap_or_else(|| std::env::vars().collect()),
        };
        let document = self.overrides.render(document, &context).await?;

        let mut workshop = WorkshopDefinition::from_document(&document)?;

        let declared = workshop.name().to_string();
        if !declared.is_empty() {
            workshop.set_annotation(WORKSHOP_ANNOTATION, declared);
        }
        workshop.set_annotation(SOURCE_ANNOTATION, source.annotation());
        if let Some(portal) = &self.portal {
            workshop.set_annotation(PORTAL_ANNOTATION, portal.as_str());
        }

        if let Some(name) = self.name {
            workshop.metadata.name = Some(name);
        }

        if workshop.spec.version.is_none() && self.version != DEFAULT_WORKSHOP_VERSION {
            workshop.spec.version = Some(self.version);
        }

        workshop.validate()?;

        info!(
            workshop = workshop.name(),
            image = workshop.content_image().unwrap_or_default(),
            "Loaded workshop definition"
        );

        Ok(workshop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEFINITION: &str = r"
apiVersion: training.educates.dev/v1beta1
kind: Workshop
metadata:
  name: lab-demo
spec:
  title: Demo
  duration: 45m
  workshop:
    image: ghcr.io/educates/lab-demo-files:latest
";

    fn workshop_dir(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("resources")).unwrap();
        std::fs::write(dir.path().join("resources/workshop.yaml"), content).unwrap();
        dir
    }

    fn loader(location: impl Into<String>) -> DefinitionLoader {
        DefinitionLoader::new(location).environment(Vec::new())
    }

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = workshop_dir(DEFINITION);
        let workshop = loader(dir.path().display().to_string())
            .load()
            .await
            .unwrap();

        assert_eq!(workshop.name(), "lab-demo");
        assert_eq!(workshop.duration(), Some("45m"));
        assert_eq!(workshop.spec.version, None);

        let annotations = workshop.metadata.annotations.unwrap();
        assert_eq!(annotations[WORKSHOP_ANNOTATION], "lab-demo");
        assert!(annotations[SOURCE_ANNOTATION].starts_with("file://"));
        assert!(annotations[SOURCE_ANNOTATION].ends_with("resources/workshop.yaml"));
    }

    #[tokio::test]
    async fn test_load_from_file_with_custom_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lab.yaml");
        std::fs::write(&file, DEFINITION).unwrap();

        let workshop = loader(file.display().to_string())
            .name(Some("renamed".to_string()))
            .portal("train1")
            .version("1.2.0")
            .load()
            .await
            .unwrap();

        assert_eq!(workshop.name(), "renamed");
        assert_eq!(workshop.spec.version.as_deref(), Some("1.2.0"));
        let annotations = workshop.metadata.annotations.unwrap();
        assert_eq!(annotations[WORKSHOP_ANNOTATION], "lab-demo");
        assert_eq!(annotations[PORTAL_ANNOTATION], "train1");
    }

    #[tokio::test]
    async fn test_empty_name_uses_declared_name() {
        let dir = workshop_dir(DEFINITION);
        let workshop = loader(dir.path().display().to_string())
            .name(Some(String::new()))
            .load()
            .await
            .unwrap();
        assert_eq!(workshop.name(), "lab-demo");
    }

    #[tokio::test]
    async fn test_declared_version_is_kept() {
        let dir = workshop_dir(&format!("{DEFINITION}  version: \"0.9\"\n"));
        let workshop = loader(dir.path().display().to_string())
            .version("2.0")
            .load()
            .await
            .unwrap();
        assert_eq!(workshop.spec.version.as_deref(), Some("0.9"));
    }

    #[tokio::test]
    async fn test_custom_workshop_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("custom.yaml"), DEFINITION).unwrap();

        let workshop = loader(dir.path().display().to_string())
            .workshop_file("custom.yaml")
            .load()
            .await
            .unwrap();
        assert_eq!(workshop.name(), "lab-demo");
    }

    #[tokio::test]
    async fn test_missing_definition() {
        let dir = tempfile::tempdir().unwrap();
        let err = loader(dir.path().display().to_string())
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DefinitionNotFound { .. }));

        let err = loader(dir.path().join("nope").display().to_string())
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DefinitionNotFound { .. }));
        let cause = std::error::Error::source(&err).unwrap();
        assert!(cause.downcast_ref::<std::io::Error>().is_some());
    }

    #[tokio::test]
    async fn test_malformed_definition_is_render_error() {
        let dir = workshop_dir("apiVersion: [unclosed\n");
        let err = loader(dir.path().display().to_string())
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
    }

    #[tokio::test]
    async fn test_missing_image_is_schema_error() {
        let dir = workshop_dir(&DEFINITION.replace("    image: ghcr.io/educates/lab-demo-files:latest\n", "    files: []\n"));
        let err = loader(dir.path().display().to_string())
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[tokio::test]
    async fn test_overrides_can_supply_required_fields() {
        let dir = workshop_dir(&DEFINITION.replace("  name: lab-demo\n", "  labels: {}\n"));

        let workshop = loader(dir.path().display().to_string())
            .overrides(Overrides::new().value("metadata.name=from-override"))
            .load()
            .await
            .unwrap();
        assert_eq!(workshop.name(), "from-override");
    }

    #[tokio::test]
    async fn test_numeric_duration_override_still_loads() {
        let dir = workshop_dir(DEFINITION);

        let workshop = loader(dir.path().display().to_string())
            .overrides(Overrides::new().value_yaml("spec.duration=45"))
            .load()
            .await
            .unwrap();
        assert_eq!(workshop.duration(), None);
        assert_eq!(crate::deploy::resolve_expires("", &workshop), "60m");
    }

    #[tokio::test]
    async fn test_environment_overrides() {
        let dir = workshop_dir(DEFINITION);

        let workshop = DefinitionLoader::new(dir.path().display().to_string())
            .environment(vec![("LAB_spec__duration".to_string(), "90m".to_string())])
            .overrides(Overrides::new().env_prefix("LAB"))
            .load()
            .await
            .unwrap();
        assert_eq!(workshop.duration(), Some("90m"));
    }

    #[tokio::test]
    async fn test_load_from_url_with_relative_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lab/workshop.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DEFINITION))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/lab/values.yaml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("spec:\n  title: Remote values\n"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/lab/workshop.yaml", server.uri());
        let workshop = loader(url.clone())
            .overrides(Overrides::new().values_file("values.yaml"))
            .load()
            .await
            .unwrap();

        assert_eq!(workshop.title(), Some("Remote values"));
        assert_eq!(
            workshop.metadata.annotations.unwrap()[SOURCE_ANNOTATION],
            url
        );
    }

    #[tokio::test]
    async fn test_url_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = loader(format!("{}/missing.yaml", server.uri()))
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DefinitionNotFound { .. }));
    }
}

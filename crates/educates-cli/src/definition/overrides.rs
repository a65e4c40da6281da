//! Layered override rendering for workshop definitions.
//!
//! Overrides are collected into [`Overrides`] and folded onto the base
//! document in increasing precedence: environment-derived values, then bulk
//! values files, then single-key assignments. Mappings merge recursively;
//! any other value replaces what was there.

use std::path::Path;

use reqwest::Url;
use serde_json::{Map, Value};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{Error, Result};

/// Separator between nesting levels in environment variable names.
const ENV_PATH_SEPARATOR: &str = "__";

/// Accumulated override sources, applied by [`Overrides::render`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    env_strings: Vec<String>,
    env_yaml: Vec<String>,
    values_files: Vec<String>,
    values: Vec<String>,
    values_yaml: Vec<String>,
    value_files: Vec<String>,
}

/// Where override references are resolved and which environment is visible.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Base for relative file references when the definition was fetched.
    pub base_url: Option<Url>,
    pub environment: Vec<(String, String)>,
}

impl Overrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take string values from variables named `PREFIX_key__subkey`.
    #[must_use]
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_strings.push(prefix.into());
        self
    }

    /// Like [`Self::env_prefix`] but values are parsed as YAML.
    #[must_use]
    pub fn env_prefix_yaml(mut self, prefix: impl Into<String>) -> Self {
        self.env_yaml.push(prefix.into());
        self
    }

    /// Merge a whole YAML mapping from a path, URL or `-` for stdin.
    #[must_use]
    pub fn values_file(mut self, reference: impl Into<String>) -> Self {
        self.values_files.push(reference.into());
        self
    }

    /// Set `key.path=value` with the value taken as a string.
    #[must_use]
    pub fn value(mut self, assignment: impl Into<String>) -> Self {
        self.values.push(assignment.into());
        self
    }

    /// Set `key.path=value` with the value parsed as YAML.
    #[must_use]
    pub fn value_yaml(mut self, assignment: impl Into<String>) -> Self {
        self.values_yaml.push(assignment.into());
        self
    }

    /// Set `key.path=reference` to the contents of a file, URL or stdin.
    #[must_use]
    pub fn value_file(mut self, assignment: impl Into<String>) -> Self {
        self.value_files.push(assignment.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold every override layer onto `document`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for an assignment without `=` or with an
    /// empty key, and [`Error::Render`] when a value does not parse or a
    /// referenced file cannot be read.
    pub async fn render(&self, document: Value, context: &RenderContext) -> Result<Value> {
        let mut layers = Vec::new();

        for prefix in &self.env_strings {
            layers.extend(env_layers(prefix, &context.environment, false)?);
        }
        for prefix in &self.env_yaml {
            layers.extend(env_layers(prefix, &context.environment, true)?);
        }

        for reference in &self.values_files {
            let content = read_reference(reference, context.base_url.as_ref()).await?;
            let values: Value = parse_yaml(&content, reference)?;
            match values {
                Value::Null => {}
                Value::Object(_) => layers.push(values),
                _ => {
                    return Err(Error::render(format!(
                        "values file {reference} must contain a mapping"
                    )))
                }
            }
        }

        for assignment in &self.values {
            let (key, value) = split_assignment(assignment)?;
            layers.push(nest(key, Value::String(value.to_string())));
        }
        for assignment in &self.values_yaml {
            let (key, value) = split_assignment(assignment)?;
            layers.push(nest(key, parse_yaml(value, key)?));
        }
        for assignment in &self.value_files {
            let (key, reference) = split_assignment(assignment)?;
            let content = read_reference(reference, context.base_url.as_ref()).await?;
            layers.push(nest(key, Value::String(content)));
        }

        debug!(layers = layers.len(), "Rendering workshop definition overrides");

        Ok(layers.into_iter().fold(document, |mut merged, layer| {
            merge(&mut merged, layer);
            merged
        }))
    }
}

/// Deep-merge `overlay` into `base`.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| Error::input(assignment, "expected key=value"))?;

    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(Error::input(assignment, "key must be a dotted path"));
    }

    Ok((key, value))
}

/// Wrap `value` in mappings following the dotted `path`.
fn nest(path: &str, value: Value) -> Value {
    path.rsplit('.').fold(value, |inner, key| {
        let mut map = Map::new();
        map.insert(key.to_string(), inner);
        Value::Object(map)
    })
}

fn env_layers(prefix: &str, environment: &[(String, String)], yaml: bool) -> Result<Vec<Value>> {
    let lead = format!("{prefix}_");
    let mut layers = Vec::new();

    for (name, raw) in environment {
        let Some(rest) = name.strip_prefix(&lead) else {
            continue;
        };
        if rest.is_empty() || rest.split(ENV_PATH_SEPARATOR).any(str::is_empty) {
            return Err(Error::input(name.as_str(), "environment variable does not name a key"));
        }

        let value = if yaml {
            parse_yaml(raw, name)?
        } else {
            Value::String(raw.clone())
        };

        layers.push(nest(&rest.replace(ENV_PATH_SEPARATOR, "."), value));
    }

    Ok(layers)
}

fn parse_yaml(content: &str, origin: &str) -> Result<Value> {
    serde_yaml::from_str(content)
        .map_err(|e| Error::render_with(format!("unable to parse {origin} as YAML"), e))
}

/// Read a file path, HTTP(S) URL or `-` (stdin).
///
/// Relative paths resolve against `base` when the definition itself was
/// fetched from a URL.
pub(crate) async fn read_reference(reference: &str, base: Option<&Url>) -> Result<String> {
    if reference == "-" {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .map_err(|e| Error::render_with("unable to read standard input", e))?;
        return Ok(content);
    }

    if let Ok(url) = Url::parse(reference) {
        match url.scheme() {
            "http" | "https" => return fetch(&url).await,
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| Error::render(format!("invalid file reference {reference}")))?;
                return read_file(&path).await;
            }
            _ => {}
        }
    }

    let path = Path::new(reference);
    match base {
        Some(base) if path.is_relative() => {
            let url = base
                .join(reference)
                .map_err(|e| Error::render_with(format!("unable to resolve {reference}"), e))?;
            fetch(&url).await
        }
        _ => read_file(path).await,
    }
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::render_with(format!("unable to read {}", path.display()), e))
}

async fn fetch(url: &Url) -> Result<String> {
    debug!(url = %url, "Fetching override values");

    let response = reqwest::get(url.clone())
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| Error::render_with(format!("unable to fetch {url}"), e))?;

    response
        .text()
        .await
        .map_err(|e| Error::render_with(format!("unable to read {url}"), e))
}

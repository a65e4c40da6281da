//! Error types for workshop deployment and portal lookup.

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures surfaced by the deploy and portal commands.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument {argument:?}: {message}")]
    Input { argument: String, message: String },

    #[error("no workshop definition found at {location}")]
    DefinitionNotFound {
        location: String,
        #[source]
        source: BoxError,
    },

    #[error("unable to process workshop definition: {message}")]
    Render {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("invalid workshop definition: {message}")]
    Schema { message: String },

    #[error("{context}")]
    ClusterUnreachable {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("{context}")]
    ClusterRejected {
        context: String,
        #[source]
        source: kube::Error,
    },

    #[error("no workshops deployed")]
    PortalNotFound { portal: String },

    #[error("workshops not available")]
    PortalNotReady { portal: String },

    #[error("{context}: resource was modified concurrently")]
    PortalConflict {
        context: String,
        #[source]
        source: kube::Error,
    },

    #[error("unable to retrieve workshops from training portal {portal:?}: {message}")]
    Read { portal: String, message: String },

    #[error("unsupported platform {platform:?}")]
    UnsupportedPlatform { platform: String },

    #[error("unable to open {url}")]
    Launch {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn input(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Input {
            argument: argument.into(),
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Error::Render {
            message: message.into(),
            source: None,
        }
    }

    pub fn render_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Render {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema {
            message: message.into(),
        }
    }

    pub fn definition_not_found(location: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::DefinitionNotFound {
            location: location.into(),
            source: source.into(),
        }
    }

    pub fn unreachable(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::ClusterUnreachable {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Classify a kube client error raised while performing `context`.
    ///
    /// Conflicts (HTTP 409) become [`Error::PortalConflict`]. Rejected
    /// credentials (HTTP 401) and transport errors become
    /// [`Error::ClusterUnreachable`]. Any other API refusal, forbidden
    /// requests included, becomes [`Error::ClusterRejected`].
    pub fn from_kube(context: impl Into<String>, source: kube::Error) -> Self {
        let context = context.into();
        match &source {
            kube::Error::Api(response) if response.code == 409 => {
                Error::PortalConflict { context, source }
            }
            kube::Error::Api(response) if response.code == 401 => {
                Error::unreachable(context, source)
            }
            kube::Error::Api(_) => Error::ClusterRejected { context, source },
            _ => Error::unreachable(context, source),
        }
    }

    /// Whether the error is a rejected write caused by a concurrent change.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::PortalConflict { .. })
    }
}

use thiserror::Error;

/// Crate-wide result type for rules loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while fetching or validating a rules file.
///
/// `Syntax` and `Schema` are validation failures the resolver recovers from
/// locally; everything else propagates to the refresh caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The document is not well-formed YAML.
    #[error("rules file syntax error: {0}")]
    Syntax(#[from] serde_yaml::Error),

    /// The document parsed but violates the rules schema.
    #[error("rules file schema error at {path}: {message}")]
    Schema { path: String, message: String },

    /// Fetching the file bytes failed.
    #[error("failed to fetch rules file from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The file endpoint answered with a non-success status.
    #[error("rules file endpoint returned HTTP {status} for {url}")]
    FetchStatus { status: u16, url: String },
}

impl Error {
    #[must_use]
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this is a validation failure (recoverable by the resolver)
    /// rather than a transport-level one.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Syntax(_) | Self::Schema { .. })
    }

    /// Short class name for user-facing error reports.
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "SyntaxError",
            Self::Schema { .. } => "SchemaError",
            Self::Fetch { .. } | Self::FetchStatus { .. } => "FetchError",
        }
    }
}

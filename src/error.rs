use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid format of root `streetpress.toml`: {0}")]
    InvalidRootTomlFile(#[from] toml::de::Error),
    #[error("Invalid WordPress url `{0}`: {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("Duplicated section slug `{0}`")]
    DuplicatedSection(String),
    #[error("Home block refers to an unknown section `{0}`")]
    UnknownSection(String),
    #[error("Failed to find the root `streetpress.toml` file")]
    RootNotFound,
}

/// Errors from talking to the WordPress REST API.
#[derive(Error, Debug)]
pub enum WpError {
    #[error("Invalid request uri `{0}`")]
    InvalidUri(String),
    #[error("Request to WordPress failed: {0}")]
    Http(#[from] hyper::Error),
    #[error("Request to `{0}` timed out")]
    Timeout(String),
    #[error("WordPress responded {status} for `{url}`")]
    Status { status: StatusCode, url: String },
    #[error("Unexpected JSON from `{url}`: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} not found")]
    NotFound(String),
}

impl WpError {
    /// Whether the error means the resource simply doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WpError::NotFound(_))
            || matches!(self, WpError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

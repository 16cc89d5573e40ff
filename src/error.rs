use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpdraftError>;

#[derive(Error, Debug)]
pub enum UpdraftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("download from '{url}' failed: {message}")]
    Transport { url: String, message: String },

    #[error("server returned status {status} for '{url}'")]
    Status { url: String, status: u16 },

    #[error("download cancelled")]
    Cancelled,

    #[error("invalid file name returned by the server: '{name}'")]
    InvalidFileName { name: String },

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("plugin manifest error: {message}")]
    ManifestError { message: String },

    #[error("plugin '{id}' is not installed")]
    PluginNotInstalled { id: String },

    #[error("unsupported archive format: {name}")]
    UnsupportedArchive { name: String },

    #[error("no update source for plugin '{id}': configure repository_url or pass --url")]
    NoUpdateSource { id: String },

    #[error("target '{path}' already exists")]
    AlreadyExists { path: PathBuf },

    #[error("{message}")]
    InstallFailed { message: String },

    #[error("configuration error: {message}")]
    ConfigError { message: String },

    #[error("home directory not found")]
    HomeDirectoryNotFound,

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },
}

impl UpdraftError {
    pub fn transport(url: impl Into<String>, error: &reqwest::Error) -> Self {
        UpdraftError::Transport {
            url: url.into(),
            message: error.to_string(),
        }
    }

    pub fn manifest_error<S: Into<String>>(message: S) -> Self {
        UpdraftError::ManifestError {
            message: message.into(),
        }
    }

    pub fn config_error<S: Into<String>>(message: S) -> Self {
        UpdraftError::ConfigError {
            message: message.into(),
        }
    }

    /// True for the failure kinds that abort a fetch: used by callers that
    /// distinguish infrastructure failures from plan rejections.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            UpdraftError::Io(_)
                | UpdraftError::Transport { .. }
                | UpdraftError::Status { .. }
                | UpdraftError::Cancelled
                | UpdraftError::InvalidFileName { .. }
        )
    }
}

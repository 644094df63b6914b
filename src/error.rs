//! Error types shared by every stage of a sync run.

use std::path::PathBuf;

/// Every failure is terminal: the binary reports it and exits non-zero.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The download directory or resolution could not be determined.
    #[error("configuration error: {0}")]
    Config(String),
    /// Bing could not be reached, or answered with an error status.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The metadata JSON or the image `urlbase` could not be understood.
    #[error("parse error: {0}")]
    Parse(String),
    /// The metadata response listed no images.
    #[error("image not found in Bing response")]
    EmptyResult,
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to set wallpaper: {0}")]
    Wallpaper(String),
}

impl SyncError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(format!("JSON parsing error: {err}"))
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        Self::Parse(format!("url parse error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_display() {
        let msg = SyncError::EmptyResult.to_string();
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_filesystem_display_names_path() {
        let err = SyncError::fs(
            "/tmp/bing/x.jpg",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/bing/x.jpg"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_json_error_maps_to_parse() {
        let err: SyncError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, SyncError::Parse(_)));
    }
}

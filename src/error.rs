use std::{io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "service")]
use notify::{Error as NotifyError, ErrorKind as NotifyErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum GraphCacheError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Path not found: {0}")]
    PathNotFound(String),
    #[error("Encountered duplicate id '{id}' while processing file '{rejected_uri}' (first defined in '{existing_uri}')")]
    DuplicateIdentifier {
        id: String,
        existing_uri: String,
        rejected_uri: String,
    },
    #[error("While processing line {} in file {uri}: {message}", display_line(.line))]
    Extraction {
        uri: String,
        line: Option<u32>,
        message: String,
    },
    #[error("Graph build failed: {0}")]
    Build(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("File watcher error: {0}")]
    Watch(String),
}

fn display_line(line: &Option<u32>) -> String {
    match line {
        Some(line) => line.to_string(),
        None => "-1".to_string(),
    }
}

impl GraphCacheError {
    /// Errors that are reported in a build's diagnostics without failing the build.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GraphCacheError::DuplicateIdentifier { .. } | GraphCacheError::Extraction { .. }
        )
    }

    pub(crate) fn extraction<P: AsRef<Path>>(
        path: P,
        line: Option<u32>,
        message: impl Into<String>,
    ) -> Self {
        GraphCacheError::Extraction {
            uri: path.as_ref().to_string_lossy().into_owned(),
            line,
            message: message.into(),
        }
    }
}

impl From<io::Error> for GraphCacheError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => GraphCacheError::PathNotFound(format!("{x}")),
            _ => GraphCacheError::Io(format!("IOError: {x}")),
        }
    }
}

impl From<toml::de::Error> for GraphCacheError {
    fn from(src: toml::de::Error) -> GraphCacheError {
        GraphCacheError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<walkdir::Error> for GraphCacheError {
    fn from(src: walkdir::Error) -> GraphCacheError {
        let path = src
            .path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        match src.io_error().map(|e| e.kind()) {
            Some(io::ErrorKind::NotFound) => GraphCacheError::PathNotFound(path),
            _ => GraphCacheError::Io(format!("Directory traversal failed at '{path}': {src}")),
        }
    }
}

#[cfg(feature = "service")]
impl From<NotifyError> for GraphCacheError {
    fn from(notify_error: NotifyError) -> Self {
        match notify_error.kind {
            NotifyErrorKind::Generic(msg) => GraphCacheError::Watch(format!(
                "notify: {}, paths: {:?}",
                msg, notify_error.paths
            )),
            NotifyErrorKind::Io(io_error) => GraphCacheError::Watch(format!(
                "notify: io error {}, paths: {:?}",
                io_error.kind(),
                notify_error.paths
            )),
            NotifyErrorKind::PathNotFound => GraphCacheError::PathNotFound(format!(
                "notify: path(s) not found: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::WatchNotFound => GraphCacheError::Watch(format!(
                "notify: watch not found, paths: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::InvalidConfig(_) => {
                GraphCacheError::Watch("notify: invalid config".to_string())
            }
            NotifyErrorKind::MaxFilesWatch => {
                GraphCacheError::Watch("notify: max file watch limit reached".to_string())
            }
        }
    }
}

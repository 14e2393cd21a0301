//! Error type shared by every pipeline stage.

use reqwest::StatusCode;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Coarse classification of [`InstallerError`], one per failure family
/// the command can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    MissingDependency,
    Network,
    Io,
    InvalidArchive,
    Subprocess,
}

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("Application already exists! ({})", .0.display())]
    AlreadyExists(PathBuf),

    #[error("'{program}' could not be found. Please install it and try again.")]
    MissingDependency { program: String },

    #[error("Failed to download {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not initialise the HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Request to {url} failed: {status}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("Release pointer {url} does not contain a download URL (got '{body}')")]
    InvalidPointer { url: String, body: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write installer output: {0}")]
    Output(#[source] io::Error),

    #[error("Invalid archive {}: {source}", .path.display())]
    InvalidArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Archive {} has no single top-level folder to unpack", .path.display())]
    MissingWrapper { path: PathBuf },

    #[error("`{command}` {}", exit_description(.code))]
    Subprocess { command: String, code: Option<i32> },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

impl InstallerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InstallerError::AlreadyExists(_) => ErrorKind::Precondition,
            InstallerError::MissingDependency { .. } => ErrorKind::MissingDependency,
            InstallerError::Network { .. }
            | InstallerError::HttpClient(_)
            | InstallerError::HttpStatus { .. }
            | InstallerError::InvalidPointer { .. } => ErrorKind::Network,
            InstallerError::Io { .. } | InstallerError::Output(_) => ErrorKind::Io,
            InstallerError::InvalidArchive { .. } | InstallerError::MissingWrapper { .. } => {
                ErrorKind::InvalidArchive
            }
            InstallerError::Subprocess { .. } => ErrorKind::Subprocess,
        }
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        InstallerError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn network(url: &str, source: reqwest::Error) -> Self {
        InstallerError::Network {
            url: url.to_string(),
            source,
        }
    }
}

pub type Result<T, E = InstallerError> = std::result::Result<T, E>;

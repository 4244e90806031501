use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShrinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("Not a PNG image: {path} (detected {mime})")]
    NotPng { path: PathBuf, mime: String },

    #[error("Invalid service URL: {0}")]
    InvalidServiceUrl(String),

    #[error("Service unreachable: {0}")]
    ServiceUnreachable(String),

    #[error("Service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("No output URL found in the service response")]
    MissingOutputUrl,

    #[error("Could not determine the home directory")]
    NoHomeDirectory,

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(PathBuf),
}

pub type Result<T> = std::result::Result<T, ShrinkError>;

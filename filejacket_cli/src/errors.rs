use std::io;
use std::path::PathBuf;
use thiserror::Error;

use filejacket::content::ContentError;
use filejacket::{FileError, SerializeError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("The provided path is not a file: {0}")]
    NotAFile(PathBuf),

    #[error("The file is not a recognized archive: {0}")]
    NotAnArchive(PathBuf),

    #[error("No archive backend could unpack: {0}")]
    UnpackRejected(PathBuf),

    #[error("No recorded digests were found for: {0}")]
    NoDigests(PathBuf),

    #[error("Content does not match its recorded digests: {0}")]
    IntegrityFailure(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("File operation failed: {0}")]
    File(#[from] FileError),

    #[error("Content access failed: {0}")]
    Content(#[from] ContentError),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] SerializeError),

    #[error("JSON handling failed: {0}")]
    Json(#[from] serde_json::Error),
}

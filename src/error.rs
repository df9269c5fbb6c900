//! Unified error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::directory::DirectoryError;

/// The error type returned by brewgate's fallible startup operations.
///
/// Application-level failures (400, 401, 404 and so on) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// startup and infrastructure failures: loading configuration or the catalog
/// file, seeding the user directory, binding to a port.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("directory: {0}")]
    Directory(#[from] DirectoryError),

    #[error("catalog file: {0}")]
    Catalog(#[from] serde_json::Error),
}

//! Server startup and command errors.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors surfaced by the `carekeeper` binary.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is invalid or unreadable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No administrator password was given on the command line or in the
    /// environment.
    #[error("no password given: pass --password or set CAREKEEPER_ADMIN_PASSWORD")]
    MissingPassword,

    /// The platform data directory could not be determined and no
    /// `storage.path` was configured.
    #[error("no data directory found; set storage.path in the config")]
    NoDataDir,

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// An error occurred in the identity provider.
    #[error(transparent)]
    Identity(#[from] identity::Error),

    /// The route table could not be built.
    #[error(transparent)]
    Policy(#[from] policy::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

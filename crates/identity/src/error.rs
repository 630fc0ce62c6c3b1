use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Unknown username or wrong password. Deliberately does not say which.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("username already exists: {0}")]
    UsernameTaken(String),

    /// The provider could not answer, e.g. a poisoned lock.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// A configured period pushed a timestamp past what can be represented.
    #[error("{0} is out of range")]
    OutOfRange(&'static str),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Storage(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Identity provider for carekeeper.
//!
//! Verifies credentials, issues session tokens, and resolves a token back to
//! the account it belongs to. The HTTP layer talks to it through the
//! [`IdentityProvider`] trait; [`LocalIdentityProvider`] is the implementation
//! backed by the `storage` crate.

mod error;
mod password;
mod provider;
mod session;

pub use error::{Error, Result};
pub use password::{hash_password, verify_password};
pub use provider::{Credentials, IdentityProvider, LocalIdentityProvider, Registration};
pub use session::{SessionTable, SessionToken};

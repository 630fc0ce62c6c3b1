//! carekeeper HTTP server.
//!
//! Wires the `policy` gate and route table, the `identity` provider and the
//! `storage` crate into an axum application.
//!
//! ```ignore
//! use std::sync::Arc;
//! use identity::LocalIdentityProvider;
//! use server::{AppState, build_router};
//! use storage::Store;
//!
//! let store = Store::open("carekeeper.db")?.shared();
//! let provider = LocalIdentityProvider::new(store.clone(), session_ttl, trial_period);
//! let state = AppState::new(store, Arc::new(provider))?;
//! axum::serve(listener, build_router(state)).await?;
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod response;
pub mod router;
pub mod state;
pub mod validate;

pub use config::Config;
pub use error::{Error, Result};
pub use router::build_router;
pub use state::AppState;

//! Route handlers.
//!
//! Handlers run only after the access gate has allowed the request and
//! checked its body, so they read the caller from [`CurrentIdentity`] and
//! placeholders from [`RouteParams`].
//!
//! [`CurrentIdentity`]: crate::gate::CurrentIdentity
//! [`RouteParams`]: crate::gate::RouteParams

pub mod admin;
pub mod auth;
pub mod care;

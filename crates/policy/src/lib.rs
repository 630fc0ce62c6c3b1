//! Access control for carekeeper.
//!
//! Two pieces live here:
//!
//! - the **gate** ([`evaluate`]), a pure function deciding whether an identity
//!   may reach a route of a given [`SensitivityClass`] at a given instant;
//! - the **route table** ([`RouteTable`]), the static mapping from
//!   `(method, path)` to the class each route requires.
//!
//! Neither performs I/O. The server resolves the identity, looks the route up,
//! and asks the gate on every request.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use policy::{Decision, Denial, Principal, Role, SensitivityClass, evaluate};
//!
//! let now = Utc::now();
//! let member = Principal::new(Role::Standard, false, now + Duration::days(30));
//! assert!(evaluate(Some(&member), SensitivityClass::StandardGated, now).is_allowed());
//!
//! let blocked = Principal { blocked: true, ..member };
//! assert_eq!(
//!     evaluate(Some(&blocked), SensitivityClass::StandardGated, now),
//!     Decision::Deny(Denial::Blocked),
//! );
//! ```

mod class;
mod error;
mod gate;
mod route;

pub use class::{Principal, Role, SensitivityClass};
pub use error::{Error, Result};
pub use gate::{Decision, Denial, evaluate};
pub use route::{Method, Params, PathPattern, Resolved, Route, RouteTable, RouteTableBuilder};

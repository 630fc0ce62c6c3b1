//! SQLite-backed persistence for carekeeper.
//!
//! This crate stores accounts and the care records that belong to them:
//! medications, appointments, and panic-button presses.
//!
//! # Overview
//!
//! The access gate in the `policy` crate reads three attributes of an account
//! (role, blocked flag, subscription end). This crate is where those attributes
//! live, and the only place they change:
//!
//! - **Registration** inserts an unblocked, standard account with a trial
//!   subscription window chosen by the caller.
//! - **Block toggle** flips the blocked flag ([`Store::set_blocked`]).
//!
//! Nothing here caches. Callers read the account fresh for each request so
//! a toggle takes effect on the very next request.
//!
//! # Core Concepts
//!
//! ## Store
//!
//! [`Store`] wraps a single SQLite connection. It is not `Sync`; share it
//! between request tasks through [`SharedStore`], which serializes access
//! behind a mutex.
//!
//! ## Records
//!
//! - [`User`] / [`NewUser`]: accounts. The password hash is never serialized.
//! - [`Medication`] / [`NewMedication`]: reminders, scoped to their owner.
//! - [`Appointment`] / [`NewAppointment`]: dated visits, scoped to their owner.
//! - [`PanicLog`]: one row per panic-button press.
//!
//! # Example
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use policy::Role;
//! use storage::{NewUser, Store};
//!
//! let store = Store::open("carekeeper.db")?;
//! let now = Utc::now();
//! let user = store.create_user(
//!     &NewUser {
//!         username: "maria".into(),
//!         password_hash: "...".into(),
//!         full_name: "Maria Silva".into(),
//!     },
//!     Role::Standard,
//!     now,
//!     now + Duration::days(30),
//! )?;
//!
//! store.set_blocked(user.id, true)?;
//! assert!(store.get_user(user.id)?.unwrap().blocked);
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod record;
mod store;

pub use error::{Error, Result};
pub use record::{
    Appointment, Medication, NewAppointment, NewMedication, NewUser, PanicLog, User,
};
pub use store::{SharedStore, Store};

//! Session management module.
//!
//! This module provides session identifiers and their generators, the
//! concurrent session table, and the per-deployment manager that ties a
//! table to the session cookie.

mod id;
mod manager;
mod store;

pub use id::{IdGenerator, RandomIdGenerator, SeededIdGenerator, SessionId, ID_BYTES, ID_LEN};
pub use manager::SessionManager;
pub use store::{Resolved, Session, SessionHandle, SessionStore, DEFAULT_IDLE_TIMEOUT};

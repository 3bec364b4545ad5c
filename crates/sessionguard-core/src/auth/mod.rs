//! Authentication module for managing the user session lifecycle.
//!
//! This module provides:
//! - `SessionManager`: login, resume, automatic expiry and logout
//! - `SessionState`: the in-memory session record
//! - `PersistedSession`: the durable mirror that survives restarts
//!
//! A session is either anonymous or authenticated with a known expiry; at
//! most one expiry timer is armed at any time.

pub mod manager;
pub mod persisted;
pub mod state;
pub mod timer;

pub use manager::{ResumeOutcome, Routes, SessionManager, SessionManagerBuilder};
pub use persisted::PersistedSession;
pub use state::{ActiveSession, SessionSnapshot, SessionState, UserProfile};
pub use timer::ExpiryTimer;

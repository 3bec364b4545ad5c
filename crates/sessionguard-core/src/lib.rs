//! Core library for sessionguard.
//!
//! Authenticates a user against a remote credential endpoint, keeps the
//! resulting token across restarts, logs out automatically when the token
//! expires and exposes the current authentication state to the host
//! application.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod navigator;
pub mod store;

pub use api::{
    CredentialExchange, Credentials, ExchangeError, HttpChannel, HttpCredentialExchange,
    NullChannel, OutboundChannel, SessionGrant,
};
pub use auth::{
    ResumeOutcome, Routes, SessionManager, SessionManagerBuilder, SessionSnapshot, SessionState,
    UserProfile,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SessionConfig, StoreBackend};
pub use error::SessionError;
pub use navigator::Navigator;
pub use store::{open_store, DurableStore, FileStore, KeyringStore, MemoryStore, StoreError};

//! HTTP-facing collaborators of the session manager.
//!
//! This module provides:
//! - `CredentialExchange`: the remote login call, with a reqwest implementation
//! - `OutboundChannel`: where the session token is attached for later requests
//!
//! The login endpoint answers with a token and its validity in milliseconds;
//! subsequent requests carry the token in a `Token` header.

pub mod channel;
pub mod error;
pub mod exchange;

pub use channel::{HttpChannel, NullChannel, OutboundChannel, TOKEN_HEADER};
pub use error::ExchangeError;
pub use exchange::{CredentialExchange, Credentials, HttpCredentialExchange, SessionGrant};

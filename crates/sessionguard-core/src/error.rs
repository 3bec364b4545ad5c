//! Error taxonomy for the session lifecycle.
//!
//! Every failure surfaced by [`SessionManager`](crate::SessionManager)
//! degrades to "remain or become anonymous"; none of these are fatal.

use thiserror::Error;

use crate::api::ExchangeError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Credentials rejected: {0}")]
    CredentialRejected(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Corrupt persisted session: {0}")]
    CorruptPersistedSession(String),

    #[error("Login discarded - session was logged out while the request was pending")]
    LoginSuperseded,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ExchangeError> for SessionError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::CredentialRejected(msg) => SessionError::CredentialRejected(msg),
            ExchangeError::TransportFailure(msg) => SessionError::TransportFailure(msg),
        }
    }
}

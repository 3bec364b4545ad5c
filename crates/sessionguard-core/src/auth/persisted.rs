//! Durable mirror of the authenticated session.
//!
//! The expiry is written as epoch milliseconds and compared numerically on
//! read. Anything else under `expirationTime` is treated as corruption.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::warn;

use crate::error::SessionError;
use crate::store::{DurableStore, StoreError};

pub const TOKEN_KEY: &str = "token";
pub const USER_ID_KEY: &str = "userID";
pub const EXPIRATION_KEY: &str = "expirationTime";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub token: String,
    pub user_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl PersistedSession {
    /// Read the persisted session, if any.
    ///
    /// Returns `Ok(None)` when nothing is stored and
    /// `Err(SessionError::CorruptPersistedSession)` when the token and
    /// expiry are not both present and well-formed.
    pub fn load(store: &dyn DurableStore) -> Result<Option<Self>, SessionError> {
        let token = non_empty(store.get(TOKEN_KEY)?);
        let user_id = non_empty(store.get(USER_ID_KEY)?);
        let expiration = non_empty(store.get(EXPIRATION_KEY)?);

        match (token, expiration) {
            (None, None) if user_id.is_none() => Ok(None),
            (None, None) => Err(SessionError::CorruptPersistedSession(
                "user id stored without a token".into(),
            )),
            (Some(_), None) => Err(SessionError::CorruptPersistedSession(
                "token stored without an expiration time".into(),
            )),
            (None, Some(_)) => Err(SessionError::CorruptPersistedSession(
                "expiration time stored without a token".into(),
            )),
            (Some(token), Some(raw)) => {
                let expires_at = parse_expiration(&raw).ok_or_else(|| {
                    SessionError::CorruptPersistedSession(format!(
                        "unparseable expiration time {:?}",
                        raw
                    ))
                })?;
                Ok(Some(Self {
                    token,
                    user_id,
                    expires_at,
                }))
            }
        }
    }

    /// Write all three keys. A missing user id removes any stale one.
    pub fn save(&self, store: &dyn DurableStore) -> Result<(), StoreError> {
        store.set(TOKEN_KEY, &self.token)?;
        match self.user_id {
            Some(ref user_id) => store.set(USER_ID_KEY, user_id)?,
            None => store.delete(USER_ID_KEY)?,
        }
        store.set(EXPIRATION_KEY, &self.expires_at.timestamp_millis().to_string())?;
        Ok(())
    }

    /// Delete every key, attempting all of them even if one fails.
    pub fn clear(store: &dyn DurableStore) -> Result<(), StoreError> {
        let mut first_error = None;
        for key in [TOKEN_KEY, USER_ID_KEY, EXPIRATION_KEY] {
            if let Err(e) = store.delete(key) {
                warn!(key, error = %e, "Failed to delete persisted session key");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Remaining validity at `now`, or `None` if the expiry is not strictly
    /// in the future.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let left = self.expires_at - now;
        (left > Duration::zero()).then_some(left)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = raw.trim().parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

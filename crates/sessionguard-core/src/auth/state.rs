use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Cached profile of the logged-in user. Never fetched by login or resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Token, user and expiry of an authenticated session. They only exist
/// together, so a token can never be present without its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    token: String,
    user_id: Option<String>,
    expires_at: DateTime<Utc>,
}

impl ActiveSession {
    pub fn new(token: String, user_id: Option<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            user_id,
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// In-memory state of the current session. Owned by the session manager.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    active: Option<ActiveSession>,
    profile: Option<UserProfile>,
}

impl SessionState {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub(crate) fn authenticate(&mut self, active: ActiveSession) {
        self.active = Some(active);
    }

    pub(crate) fn set_profile(&mut self, profile: Option<UserProfile>) {
        self.profile = profile;
    }

    pub(crate) fn clear(&mut self) {
        self.active = None;
        self.profile = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.active.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.token())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.active.as_ref().and_then(|a| a.user_id())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|a| a.expires_at())
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Time left before expiry, clamped at zero. `None` when anonymous.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at()
            .map(|expiry| (expiry - now).max(Duration::zero()))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            authenticated: self.is_authenticated(),
            user_id: self.user_id().map(str::to_string),
            expires_at_millis: self.expires_at().map(|e| e.timestamp_millis()),
            profile: self.profile.clone(),
        }
    }
}

/// Token-free view of the session, safe to hand to a UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub expires_at_millis: Option<i64>,
    pub profile: Option<UserProfile>,
}

//! The session lifecycle: login, resume, expiry and logout.
//!
//! `SessionManager` is a cheap, cloneable handle. All state sits behind one
//! lock that is never held across an `.await`; collaborators that may call
//! back into the manager (the navigator) are only notified after the lock
//! is released.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{CredentialExchange, Credentials, ExchangeError, NullChannel, OutboundChannel};
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::navigator::Navigator;
use crate::store::{DurableStore, StoreError};

use super::persisted::PersistedSession;
use super::state::{ActiveSession, SessionSnapshot, SessionState, UserProfile};
use super::timer::ExpiryTimer;

/// Routes announced to the navigator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    /// Where to go after a successful login
    pub landing: String,
    /// Where to go after logout
    pub login: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for Routes {
    fn from(config: &SessionConfig) -> Self {
        Self {
            landing: config.landing_route.clone(),
            login: config.login_route.clone(),
        }
    }
}

/// What `try_resume` found in the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// Nothing was persisted
    NoSession,
    /// The persisted session was restored with this much time left
    Resumed { remaining: Duration },
    /// The persisted session had already expired and was cleared
    Expired,
    /// The persisted entries were inconsistent and were cleared
    Corrupt,
    /// The store could not be read; nothing was changed
    StoreUnavailable,
}

struct ManagerState {
    session: SessionState,
    /// Bumped on every logout. A login only applies its grant if the
    /// generation it started under is still current.
    generation: u64,
    next_timer_id: u64,
    expiry: Option<ExpiryTimer>,
}

struct Inner {
    state: Mutex<ManagerState>,
    store: Arc<dyn DurableStore>,
    exchange: Arc<dyn CredentialExchange>,
    navigator: Arc<dyn Navigator>,
    channel: Arc<dyn OutboundChannel>,
    clock: Arc<dyn Clock>,
    routes: Routes,
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

pub struct SessionManagerBuilder {
    store: Arc<dyn DurableStore>,
    exchange: Arc<dyn CredentialExchange>,
    navigator: Arc<dyn Navigator>,
    channel: Arc<dyn OutboundChannel>,
    clock: Arc<dyn Clock>,
    routes: Routes,
}

impl SessionManagerBuilder {
    pub fn channel(mut self, channel: Arc<dyn OutboundChannel>) -> Self {
        self.channel = channel;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    pub fn build(self) -> SessionManager {
        SessionManager {
            inner: Arc::new(Inner {
                state: Mutex::new(ManagerState {
                    session: SessionState::anonymous(),
                    generation: 0,
                    next_timer_id: 0,
                    expiry: None,
                }),
                store: self.store,
                exchange: self.exchange,
                navigator: self.navigator,
                channel: self.channel,
                clock: self.clock,
                routes: self.routes,
            }),
        }
    }
}

impl SessionManager {
    pub fn builder(
        store: Arc<dyn DurableStore>,
        exchange: Arc<dyn CredentialExchange>,
        navigator: Arc<dyn Navigator>,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            store,
            exchange,
            navigator,
            channel: Arc::new(NullChannel),
            clock: Arc::new(SystemClock),
            routes: Routes::default(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Exchange credentials for a session.
    ///
    /// On success the session is persisted, the token is attached to the
    /// outbound channel, an expiry timer is armed and the navigator is sent
    /// to the landing route. On failure nothing changes.
    ///
    /// If `logout` runs while the exchange is pending, the grant is dropped
    /// and `SessionError::LoginSuperseded` is returned.
    pub async fn login(&self, credentials: Credentials) -> Result<(), SessionError> {
        let generation = self.inner.state.lock().generation;
        info!(user = %credentials.user, "Attempting login");

        let grant = match self.inner.exchange.login(&credentials).await {
            Ok(grant) => grant,
            Err(e) => {
                error!(user = %credentials.user, error = %e, "Login failed");
                return Err(e.into());
            }
        };

        let expires_at = expiry_after(self.inner.clock.now(), grant.expires_in_millis)?;

        {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                warn!(user = %grant.user_id, "Discarding login grant - logged out while pending");
                return Err(SessionError::LoginSuperseded);
            }

            let persisted = PersistedSession {
                token: grant.token.clone(),
                user_id: Some(grant.user_id.clone()),
                expires_at,
            };
            if let Err(e) = persisted.save(self.inner.store.as_ref()) {
                // A partial write may pair the new token with a stale expiry
                warn!(error = %e, "Failed to persist session, clearing stored entries");
                if let Err(e) = PersistedSession::clear(self.inner.store.as_ref()) {
                    warn!(error = %e, "Failed to clear partially persisted session");
                }
            }

            self.inner.channel.attach(&grant.token);
            state.session.authenticate(ActiveSession::new(
                grant.token.clone(),
                Some(grant.user_id.clone()),
                expires_at,
            ));
            self.arm_expiry(&mut state, grant.expires_in());
        }

        info!(user = %grant.user_id, %expires_at, "Login successful");
        self.inner.navigator.replace(&self.inner.routes.landing);
        Ok(())
    }

    /// Run `login` on a spawned task so the caller does not wait for it.
    pub fn login_in_background(
        &self,
        credentials: Credentials,
    ) -> JoinHandle<Result<(), SessionError>> {
        let manager = self.clone();
        tokio::spawn(async move { manager.login(credentials).await })
    }

    /// Restore a persisted session at startup.
    ///
    /// A valid session is restored with a timer for the time it has left,
    /// not its original duration. Expired or corrupt entries are cleared.
    /// The navigator is never notified.
    ///
    /// Must be called from within a Tokio runtime, since a restored session
    /// arms its expiry timer on a spawned task.
    pub fn try_resume(&self) -> ResumeOutcome {
        debug!("Trying to resume persisted session");
        let mut state = self.inner.state.lock();

        let persisted = match PersistedSession::load(self.inner.store.as_ref()) {
            Ok(Some(persisted)) => persisted,
            Ok(None) => {
                debug!("No persisted session found");
                return ResumeOutcome::NoSession;
            }
            Err(SessionError::CorruptPersistedSession(reason)) => {
                warn!(%reason, "Persisted session is corrupt, discarding it");
                self.clear_locked(&mut state);
                return ResumeOutcome::Corrupt;
            }
            Err(SessionError::Store(StoreError::Format(e))) => {
                warn!(error = %e, "Session store contents are unreadable, discarding them");
                self.clear_locked(&mut state);
                return ResumeOutcome::Corrupt;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return ResumeOutcome::StoreUnavailable;
            }
        };

        let now = self.inner.clock.now();
        let remaining = match persisted.remaining(now).and_then(|r| r.to_std().ok()) {
            Some(remaining) => remaining,
            None => {
                warn!(expired_at = %persisted.expires_at, "Persisted session expired, discarding it");
                self.clear_locked(&mut state);
                return ResumeOutcome::Expired;
            }
        };

        self.inner.channel.attach(&persisted.token);
        state.session.authenticate(ActiveSession::new(
            persisted.token,
            persisted.user_id,
            persisted.expires_at,
        ));
        self.arm_expiry(&mut state, remaining);

        info!(
            user = ?state.session.user_id(),
            remaining_secs = remaining.as_secs(),
            "Resumed persisted session"
        );
        ResumeOutcome::Resumed { remaining }
    }

    /// End the session. Safe to call at any time, any number of times.
    pub fn logout(&self) {
        {
            let mut state = self.inner.state.lock();
            self.clear_locked(&mut state);
        }
        info!("Logged out");
        self.inner.navigator.replace(&self.inner.routes.login);
    }

    /// Arm a timer that logs out after `duration`, replacing any armed one.
    pub(crate) fn set_logout_timer(&self, duration: Duration) {
        let mut state = self.inner.state.lock();
        self.arm_expiry(&mut state, duration);
    }

    fn arm_expiry(&self, state: &mut ManagerState, duration: Duration) {
        state.next_timer_id += 1;
        let id = state.next_timer_id;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let timer = ExpiryTimer::spawn(id, duration, move || {
            if let Some(inner) = weak.upgrade() {
                SessionManager { inner }.expire(id);
            }
        });

        if let Some(previous) = state.expiry.replace(timer) {
            debug!(previous = previous.id(), "Replacing armed expiry timer");
            previous.cancel();
        }
        debug!(timer = id, ?duration, "Expiry timer armed");
    }

    fn expire(&self, timer_id: u64) {
        {
            let mut state = self.inner.state.lock();
            if state.expiry.as_ref().map(ExpiryTimer::id) != Some(timer_id) {
                debug!(timer = timer_id, "Ignoring stale expiry timer");
                return;
            }
            // The firing task is finishing on its own
            state.expiry = None;
            info!(user = ?state.session.user_id(), "Session expired");
            self.clear_locked(&mut state);
        }
        self.inner.navigator.replace(&self.inner.routes.login);
    }

    fn clear_locked(&self, state: &mut ManagerState) {
        state.generation += 1;
        state.session.clear();
        if let Some(timer) = state.expiry.take() {
            timer.cancel();
        }
        self.inner.channel.clear();
        if let Err(e) = PersistedSession::clear(self.inner.store.as_ref()) {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Cache the user's profile. Cleared again by logout.
    pub fn store_user(&self, profile: UserProfile) {
        self.inner.state.lock().session.set_profile(Some(profile));
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().session.is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.state.lock().session.profile().cloned()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.lock().session.token().map(str::to_string)
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.state.lock().session.user_id().map(str::to_string)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().session.expires_at()
    }

    pub fn time_until_expiry(&self) -> Option<chrono::Duration> {
        let now = self.inner.clock.now();
        self.inner.state.lock().session.time_until_expiry(now)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.time_until_expiry().map(|d| d.num_minutes())
    }

    /// Whether an expiry timer is currently armed.
    pub fn expiry_armed(&self) -> bool {
        self.inner.state.lock().expiry.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().session.snapshot()
    }
}

fn expiry_after(now: DateTime<Utc>, millis: u64) -> Result<DateTime<Utc>, SessionError> {
    i64::try_from(millis)
        .ok()
        .and_then(chrono::Duration::try_milliseconds)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| {
            ExchangeError::TransportFailure(format!("grant expiry of {}ms is out of range", millis))
                .into()
        })
}

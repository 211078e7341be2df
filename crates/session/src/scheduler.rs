//! Session expiry scheduler for the admin layout
//!
//! Reads the expiry claim of the stored access token and arms two timers: a
//! warning some lead time before expiry and the expiry itself. Every re-arm
//! bumps a version counter; callbacks armed under an older version are
//! ignored even if they slip past cancellation.

use crate::context::AuthContext;
use crate::error::SessionError;
use crate::guard::LOGIN;
use crate::timer::{TimerHandle, Timers};
use chrono::{DateTime, Utc};
use kuteera_core::decode_expiry;
use kuteera_http::KuteeraClient;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Why the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The access token expired
    Expired,
    /// The user chose to log out
    UserRequested,
    /// "Stay signed in" could not refresh the session
    RefreshFailed,
}

/// Events for the host UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Show the "session about to expire" dialog
    WarningShown { expires_at: DateTime<Utc> },
    /// The session was extended
    Refreshed { expires_at: Option<DateTime<Utc>> },
    /// Transient message for the user
    Notification(String),
    /// Local session state was cleared
    LoggedOut { reason: LogoutReason },
    /// Navigate to this location
    Navigate(String),
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    /// No token, or a token without a readable expiry
    #[default]
    Idle,
    /// Warning and expiry timers are pending
    Armed {
        expires_at: DateTime<Utc>,
        version: u64,
    },
    /// The warning dialog is open, expiry timer still pending
    WarningShown {
        expires_at: DateTime<Utc>,
        version: u64,
    },
}

struct Inner {
    context: AuthContext,
    client: KuteeraClient,
    timers: Timers,
    clock: Arc<dyn Clock>,
    warning_lead: Duration,
    state: Mutex<SchedulerState>,
    armed: Mutex<Vec<TimerHandle>>,
    version: AtomicU64,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Inner {
    fn set_state(&self, state: SchedulerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Session event dropped, no listener");
        }
    }

    fn disarm(&self) {
        let handles: Vec<_> = self
            .armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            self.timers.cancel(handle);
        }
    }

    fn remember(&self, handle: TimerHandle) {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    fn current(&self, version: u64) -> bool {
        self.version.load(Ordering::SeqCst) == version
    }

    fn show_warning(&self, expires_at: DateTime<Utc>, version: u64) {
        info!(%expires_at, "Session about to expire");
        self.set_state(SchedulerState::WarningShown {
            expires_at,
            version,
        });
        self.emit(SessionEvent::WarningShown { expires_at });
    }

    fn end_session(&self, reason: LogoutReason) {
        self.disarm();
        self.version.fetch_add(1, Ordering::SeqCst);
        self.context.logout();
        self.set_state(SchedulerState::Idle);
        info!(?reason, "Session ended");
        self.emit(SessionEvent::LoggedOut { reason });
        self.emit(SessionEvent::Navigate(LOGIN.to_string()));
    }
}

/// Warning and expiry timers for one mounted admin layout
#[derive(Clone)]
pub struct SessionScheduler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScheduler")
            .field("state", &self.inner.state())
            .field("version", &self.version())
            .field("warning_lead", &self.inner.warning_lead)
            .finish_non_exhaustive()
    }
}

impl SessionScheduler {
    pub fn new(
        context: AuthContext,
        client: KuteeraClient,
        timers: Timers,
        clock: Arc<dyn Clock>,
        warning_lead: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let inner = Inner {
            context,
            client,
            timers,
            clock,
            warning_lead,
            state: Mutex::new(SchedulerState::Idle),
            armed: Mutex::new(Vec::new()),
            version: AtomicU64::new(0),
            events,
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            receiver,
        )
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.state()
    }

    /// Number of times the timers were re-armed or torn down
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Re-read the stored token and re-arm both timers.
    ///
    /// An expired token ends the session on the spot. A token whose expiry is
    /// closer than the warning lead shows the warning immediately.
    pub fn hydrate(&self) -> SchedulerState {
        let inner = &self.inner;
        inner.disarm();
        let version = inner.version.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(expires_at) = inner
            .context
            .access_token()
            .and_then(|token| decode_expiry(&token))
        else {
            debug!("No token expiry to track");
            inner.set_state(SchedulerState::Idle);
            return SchedulerState::Idle;
        };

        let now = inner.clock.now();
        let Ok(remaining) = (expires_at - now).to_std() else {
            inner.end_session(LogoutReason::Expired);
            return SchedulerState::Idle;
        };
        if remaining.is_zero() {
            inner.end_session(LogoutReason::Expired);
            return SchedulerState::Idle;
        }

        let warn_in = remaining.saturating_sub(inner.warning_lead);
        if warn_in.is_zero() {
            inner.show_warning(expires_at, version);
        } else {
            inner.set_state(SchedulerState::Armed {
                expires_at,
                version,
            });
            let weak = Arc::downgrade(inner);
            let handle = inner.timers.arm(warn_in, move || {
                with_current(&weak, version, |inner| {
                    inner.show_warning(expires_at, version);
                });
            });
            inner.remember(handle);
        }

        let weak = Arc::downgrade(inner);
        let handle = inner.timers.arm(remaining, move || {
            with_current(&weak, version, |inner| {
                inner.end_session(LogoutReason::Expired);
            });
        });
        inner.remember(handle);

        debug!(%expires_at, ?warn_in, version, "Session timers armed");
        inner.state()
    }

    /// "Stay signed in": refresh the access token, reload the identity and
    /// re-arm. Any failure is reported once and ends the session.
    ///
    /// If the session ends while the refresh is in flight, the refreshed
    /// token is dropped and [`SessionError::Ended`] is returned.
    pub async fn stay_signed_in(&self) -> Result<SchedulerState, SessionError> {
        let inner = &self.inner;
        let version = inner.version.load(Ordering::SeqCst);
        let refreshed = async {
            inner.client.refresh_access_token().await?;
            if !inner.current(version) {
                return Err(SessionError::Ended);
            }
            let identity = inner.client.me().await?;
            if identity.is_admin() {
                Ok(identity)
            } else {
                Err(SessionError::WrongRole(identity.role.to_string()))
            }
        }
        .await;

        // Expiry or logout landed while the refresh was in flight
        if !inner.current(version) {
            info!("Session ended during refresh, discarding the new token");
            inner.context.logout();
            return Err(SessionError::Ended);
        }

        match refreshed {
            Ok(identity) => {
                inner.context.set_admin(true);
                inner.context.set_user(Some(identity));
                let state = self.hydrate();
                let expires_at = match state {
                    SchedulerState::Armed { expires_at, .. }
                    | SchedulerState::WarningShown { expires_at, .. } => Some(expires_at),
                    SchedulerState::Idle => None,
                };
                inner.emit(SessionEvent::Refreshed { expires_at });
                Ok(state)
            }
            Err(err) => {
                warn!("Session refresh failed: {err}");
                inner.emit(SessionEvent::Notification(
                    "Your session could not be renewed. Please sign in again.".to_string(),
                ));
                inner.end_session(LogoutReason::RefreshFailed);
                Err(err)
            }
        }
    }

    /// Log out on the user's request
    pub async fn log_out(&self) {
        let inner = &self.inner;
        inner.disarm();
        if let Err(err) = inner.client.logout_remote().await {
            debug!("Server logout failed: {err}");
        }
        inner.end_session(LogoutReason::UserRequested);
    }

    /// Cancel both timers without touching the session
    pub fn disarm(&self) {
        self.inner.disarm();
        self.inner.version.fetch_add(1, Ordering::SeqCst);
        self.inner.set_state(SchedulerState::Idle);
    }
}

fn with_current(weak: &Weak<Inner>, version: u64, f: impl FnOnce(&Inner)) {
    if let Some(inner) = weak.upgrade()
        && inner.current(version)
    {
        f(&inner);
    }
}

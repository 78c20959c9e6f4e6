//! Session gate: the authentication check every MEDONE page runs.
//!
//! The gate reads two storage areas (tab-scoped and durable), decides whether
//! the visitor holds a valid session, and tells the caller where to navigate.
//! It never navigates or shows dialogs itself; pages do that with the
//! [`GateDecision`] they get back.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::GateConfig;
use crate::storage::{StoragePort, StorageError, StorageScope};
use crate::types::{
    Page, Redirect, SessionRecord, AUTHENTICATED_MARKER, KEY_AUTHENTICATED, KEY_LAST_ACTIVITY,
    KEY_LOGIN_TIME, KEY_NAMESPACE, KEY_SESSION,
};

/// Alert shown before redirecting an expired session.
pub const EXPIRED_NOTICE: &str = "Session expired. Please log in again.";

/// The single accepted credential pair.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub user_role: String,
}

impl Credentials {
    /// Plaintext comparison against the configured pair.
    fn matches(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}

/// Why a check did not grant access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Nothing in either store
    Missing,
    /// Stored data could not be parsed
    Malformed,
    /// Session older than the timeout
    Expired,
}

/// A session that passed the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub login_time: i64,
    /// Timestamp just written to `medone_last_activity`
    pub last_activity: i64,
    /// Store the session was read from
    pub source: StorageScope,
    /// Parsed `medone_session` blob, when one was stored
    pub record: Option<SessionRecord>,
}

/// Outcome of [`SessionGate::check_authentication`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Granted(ActiveSession),
    Denied {
        reason: DenyReason,
        redirect: Redirect,
    },
}

impl GateDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, GateDecision::Granted(_))
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            GateDecision::Granted(_) => None,
            GateDecision::Denied { redirect, .. } => Some(redirect),
        }
    }
}

/// Login failures. The message is what the login form shows inline.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Please enter both username and password")]
    MissingCredentials,

    #[error("Invalid username or password. Please try again.")]
    InvalidCredentials,

    #[error("Could not store session: {0}")]
    Storage(#[from] StorageError),
}

/// A freshly issued session and where to go next.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub record: SessionRecord,
    pub redirect: Redirect,
}

/// Session fields as found in one store.
#[derive(Debug)]
struct StoredSession {
    scope: StorageScope,
    login_time: i64,
    /// Exact `medone_login_time` text, mirrored verbatim on sync
    raw_login_time: String,
    raw_record: Option<String>,
    record: Option<SessionRecord>,
}

#[derive(Debug)]
enum Lookup {
    Absent,
    Malformed(StorageScope, String),
    Found(StoredSession),
}

/// Session gate over a tab-scoped and a durable storage area.
pub struct SessionGate {
    tab: Arc<dyn StoragePort>,
    durable: Arc<dyn StoragePort>,
    clock: Arc<dyn Clock>,
    credentials: Credentials,
    session_timeout: Duration,
}

impl SessionGate {
    pub fn new(
        config: &GateConfig,
        tab: Arc<dyn StoragePort>,
        durable: Arc<dyn StoragePort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tab,
            durable,
            clock,
            credentials: Credentials {
                username: config.username.clone(),
                password: config.password.clone(),
                user_role: config.user_role.clone(),
            },
            session_timeout: config.session_timeout,
        }
    }

    /// Decide whether the visitor may see a gated page.
    ///
    /// Run on page load and on every periodic tick. Never fails: unreadable or
    /// corrupt storage is treated as "not logged in".
    pub fn check_authentication(&self) -> GateDecision {
        match self.evaluate() {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Session storage unavailable, treating as logged out: {}", e);
                Self::deny(DenyReason::Missing)
            }
        }
    }

    fn evaluate(&self) -> Result<GateDecision, StorageError> {
        let now = self.clock.now_ms();

        let stored = match self.locate()? {
            Lookup::Absent => {
                debug!("No valid authentication found, redirecting to login");
                return Ok(Self::deny(DenyReason::Missing));
            }
            Lookup::Malformed(scope, why) => {
                debug!("Malformed session in {} store ({}), redirecting to login", scope, why);
                return Ok(Self::deny(DenyReason::Malformed));
            }
            Lookup::Found(stored) => stored,
        };

        let age = match session_age(now, stored.login_time) {
            Some(age) => age,
            None => {
                debug!(
                    "Login time {} is unusable at {}, redirecting to login",
                    stored.login_time, now
                );
                return Ok(Self::deny(DenyReason::Malformed));
            }
        };
        if !self.within_timeout(age) {
            info!("Session expired after {} ms, clearing and redirecting", age);
            self.clear_all();
            return Ok(GateDecision::Denied {
                reason: DenyReason::Expired,
                redirect: Redirect::with_notice(Page::Login, EXPIRED_NOTICE),
            });
        }

        if stored.scope == StorageScope::Durable {
            debug!("Mirroring durable session into tab store");
            self.tab.set(KEY_AUTHENTICATED, AUTHENTICATED_MARKER)?;
            self.tab.set(KEY_LOGIN_TIME, &stored.raw_login_time)?;
            if let Some(raw) = &stored.raw_record {
                self.tab.set(KEY_SESSION, raw)?;
            }
        }
        self.tab.set(KEY_LAST_ACTIVITY, &now.to_string())?;

        Ok(GateDecision::Granted(ActiveSession {
            login_time: stored.login_time,
            last_activity: now,
            source: stored.scope,
            record: stored.record,
        }))
    }

    /// Login-page pre-check. A still-valid session sends the visitor straight
    /// to the dashboard; an expired one is cleared. Malformed data is left
    /// alone and shows the form.
    pub fn existing_session(&self) -> Option<Redirect> {
        let stored = match self.locate() {
            Ok(Lookup::Found(stored)) => stored,
            Ok(_) => return None,
            Err(e) => {
                warn!("Session storage unavailable on login page: {}", e);
                return None;
            }
        };

        let now = self.clock.now_ms();
        match session_age(now, stored.login_time) {
            Some(age) if self.within_timeout(age) => {
                info!("Existing session found, redirecting to dashboard");
                Some(Redirect::to(Page::Dashboard))
            }
            Some(_) => {
                debug!("Stale session found on login page, clearing it");
                self.clear_all();
                None
            }
            None => {
                debug!("Ignoring session with unusable login time {}", stored.login_time);
                None
            }
        }
    }

    /// Issue a new session for a matching credential pair.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<LoginSuccess, LoginError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }
        if !self.credentials.matches(username, password) {
            info!("Rejected login for {:?}", username);
            return Err(LoginError::InvalidCredentials);
        }

        // Stale records from an earlier login must not shadow the new one.
        self.tab.remove_prefixed(KEY_NAMESPACE)?;
        self.durable.remove_prefixed(KEY_NAMESPACE)?;

        let record = SessionRecord::issue(
            &self.credentials.username,
            &self.credentials.user_role,
            self.clock.now_ms(),
            remember_me,
        );
        let blob = record.to_json().map_err(StorageError::from)?;
        let login_time = record.login_time.to_string();

        write_session(self.tab.as_ref(), &blob, &login_time)?;
        if remember_me {
            write_session(self.durable.as_ref(), &blob, &login_time)?;
        }

        info!(
            "Login succeeded for {} (session {}, remember_me={})",
            record.username, record.session_id, remember_me
        );
        Ok(LoginSuccess {
            record,
            redirect: Redirect::to(Page::Dashboard),
        })
    }

    /// Destroy the session in both stores. Confirmation, if any, is the
    /// caller's job and happens before this is called.
    pub fn logout(&self) -> Redirect {
        self.clear_all();
        info!("Logged out");
        Redirect::to(Page::Login)
    }

    fn within_timeout(&self, age_ms: i64) -> bool {
        (age_ms as u128) < self.session_timeout.as_millis()
    }

    /// Tab store first; the durable store is only consulted when the tab
    /// store holds no authenticated marker.
    fn locate(&self) -> Result<Lookup, StorageError> {
        match read_scope(self.tab.as_ref(), StorageScope::Tab)? {
            Lookup::Absent => read_scope(self.durable.as_ref(), StorageScope::Durable),
            found => Ok(found),
        }
    }

    fn clear_all(&self) {
        for (scope, store) in [
            (StorageScope::Tab, &self.tab),
            (StorageScope::Durable, &self.durable),
        ] {
            if let Err(e) = store.remove_prefixed(KEY_NAMESPACE) {
                warn!("Failed to clear {} session store: {}", scope, e);
            }
        }
    }

    fn deny(reason: DenyReason) -> GateDecision {
        GateDecision::Denied {
            reason,
            redirect: Redirect::to(Page::Login),
        }
    }
}

/// Milliseconds since `login_time`, or `None` when the login time lies in the
/// future or is far enough out of range that the subtraction overflows.
fn session_age(now: i64, login_time: i64) -> Option<i64> {
    now.checked_sub(login_time).filter(|age| *age >= 0)
}

fn write_session(
    store: &dyn StoragePort,
    blob: &str,
    login_time: &str,
) -> Result<(), StorageError> {
    store.set(KEY_SESSION, blob)?;
    store.set(KEY_AUTHENTICATED, AUTHENTICATED_MARKER)?;
    store.set(KEY_LOGIN_TIME, login_time)?;
    Ok(())
}

fn read_scope(store: &dyn StoragePort, scope: StorageScope) -> Result<Lookup, StorageError> {
    let flag = store.get(KEY_AUTHENTICATED)?;
    let raw_login_time = match (flag.as_deref(), store.get(KEY_LOGIN_TIME)?) {
        (Some(AUTHENTICATED_MARKER), Some(t)) => t,
        _ => return Ok(Lookup::Absent),
    };

    let login_time = match raw_login_time.trim().parse::<i64>() {
        Ok(t) => t,
        Err(e) => {
            return Ok(Lookup::Malformed(
                scope,
                format!("login time {:?}: {}", raw_login_time, e),
            ))
        }
    };

    let raw_record = store.get(KEY_SESSION)?;
    let record = match raw_record.as_deref().map(SessionRecord::from_json) {
        None => None,
        Some(Ok(record)) => Some(record),
        Some(Err(e)) => return Ok(Lookup::Malformed(scope, format!("session record: {}", e))),
    };

    Ok(Lookup::Found(StoredSession {
        scope,
        login_time,
        raw_login_time,
        raw_record,
        record,
    }))
}

//! Core types shared by the session gate and the pages that call it

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every session key. Login and logout clear everything under it.
pub const KEY_NAMESPACE: &str = "medone_";
/// `"true"` when a login succeeded, absent otherwise.
pub const KEY_AUTHENTICATED: &str = "medone_authenticated";
/// Login timestamp as decimal milliseconds since the epoch.
pub const KEY_LOGIN_TIME: &str = "medone_login_time";
/// Serialized [`SessionRecord`].
pub const KEY_SESSION: &str = "medone_session";
/// Timestamp of the last successful check. Only ever written to the tab store.
pub const KEY_LAST_ACTIVITY: &str = "medone_last_activity";

/// The only value of `medone_authenticated` that counts as logged in.
pub const AUTHENTICATED_MARKER: &str = "true";

/// Length of the random suffix of a session id.
const SESSION_ID_SUFFIX_LEN: usize = 13;

/// Session data bundle written at login.
///
/// Field names serialize in camelCase so the blob matches what the dashboard
/// pages have always stored under `medone_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub username: String,
    /// Milliseconds since the epoch.
    pub login_time: i64,
    pub remember_me: bool,
    /// Opaque identifier, never verified.
    pub session_id: String,
    pub user_role: String,
}

impl SessionRecord {
    /// Mint a fresh record for a login happening at `now_ms`.
    pub fn issue(username: &str, user_role: &str, now_ms: i64, remember_me: bool) -> Self {
        Self {
            username: username.to_string(),
            login_time: now_ms,
            remember_me,
            session_id: generate_session_id(now_ms),
            user_role: user_role.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Generate a session id of the form `medone_<ms>_<13 base36 chars>`.
pub fn generate_session_id(now_ms: i64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SESSION_ID_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..36u8);
            match idx {
                0..=9 => (b'0' + idx) as char,
                _ => (b'a' + idx - 10) as char,
            }
        })
        .collect();
    format!("{}{}_{}", KEY_NAMESPACE, now_ms, suffix)
}

/// Every page of the MEDONE dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Login,
    Dashboard,
    Analytics,
    Deploy,
    Operations,
    Network,
    About,
    Compliance,
}

impl Page {
    pub const ALL: [Page; 8] = [
        Page::Login,
        Page::Dashboard,
        Page::Analytics,
        Page::Deploy,
        Page::Operations,
        Page::Network,
        Page::About,
        Page::Compliance,
    ];

    /// Relative URL of the page. No query string or fragment is ever carried.
    pub fn entry_url(&self) -> &'static str {
        match self {
            Page::Login => "login.html",
            Page::Dashboard => "dashboard.html",
            Page::Analytics => "analytics.html",
            Page::Deploy => "deploy.html",
            Page::Operations => "operations.html",
            Page::Network => "network.html",
            Page::About => "about.html",
            Page::Compliance => "compliance.html",
        }
    }

    /// Everything except the login page sits behind the session gate.
    pub fn requires_session(&self) -> bool {
        !matches!(self, Page::Login)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Page::Login => "login",
            Page::Dashboard => "dashboard",
            Page::Analytics => "analytics",
            Page::Deploy => "deploy",
            Page::Operations => "operations",
            Page::Network => "network",
            Page::About => "about",
            Page::Compliance => "compliance",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown page: {0}")]
pub struct UnknownPage(String);

impl FromStr for Page {
    type Err = UnknownPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_end_matches(".html").to_ascii_lowercase();
        Page::ALL
            .into_iter()
            .find(|page| page.name() == wanted)
            .ok_or_else(|| UnknownPage(s.to_string()))
    }
}

/// A navigation the caller must perform, with an optional blocking notice to
/// show first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: Page,
    pub notice: Option<String>,
}

impl Redirect {
    pub fn to(target: Page) -> Self {
        Self {
            target,
            notice: None,
        }
    }

    pub fn with_notice(target: Page, notice: impl Into<String>) -> Self {
        Self {
            target,
            notice: Some(notice.into()),
        }
    }
}

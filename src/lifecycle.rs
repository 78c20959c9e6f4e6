//! Per-page session lifecycle.
//!
//! ```text
//! UNKNOWN --check valid--> ACTIVE --tick valid--> ACTIVE
//! UNKNOWN --check denied--> REDIRECTING
//! ACTIVE  --tick denied--> EXPIRED --> REDIRECTING
//! ACTIVE  --logout------> LOGGED_OUT --> REDIRECTING
//! ```
//!
//! REDIRECTING is terminal: a full navigation tears the page down.

use std::fmt;
use tracing::debug;

use crate::types::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Unknown,
    Active,
    Expired,
    LoggedOut,
    Redirecting,
}

impl PageState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PageState::Redirecting)
    }

    /// Transition function. Events that make no sense in a state leave it
    /// unchanged.
    pub fn next(self, event: PageEvent) -> PageState {
        use PageEvent::*;
        use PageState::*;

        match (self, event) {
            (Redirecting, _) => Redirecting,
            (Unknown | Active, CheckGranted) => Active,
            (Unknown, CheckDenied) => Redirecting,
            (Active, CheckDenied) => Expired,
            (Active, Logout) => LoggedOut,
            (Expired | LoggedOut, Navigated) => Redirecting,
            (state, _) => state,
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageState::Unknown => "UNKNOWN",
            PageState::Active => "ACTIVE",
            PageState::Expired => "EXPIRED",
            PageState::LoggedOut => "LOGGED_OUT",
            PageState::Redirecting => "REDIRECTING",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    CheckGranted,
    CheckDenied,
    Logout,
    Navigated,
}

/// Lifecycle of one page instance.
#[derive(Debug)]
pub struct Lifecycle {
    page: Page,
    state: PageState,
}

impl Lifecycle {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            state: PageState::Unknown,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn advance(&mut self, event: PageEvent) -> PageState {
        let next = self.state.next(event);
        if next != self.state {
            debug!(page = %self.page, "{} -> {} on {:?}", self.state, next, event);
        }
        self.state = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::PageEvent::*;
    use super::PageState::*;
    use super::*;

    #[test]
    fn test_valid_load_then_ticks_stay_active() {
        let mut lc = Lifecycle::new(Page::Dashboard);
        assert_eq!(lc.advance(CheckGranted), Active);
        assert_eq!(lc.advance(CheckGranted), Active);
    }

    #[test]
    fn test_denied_load_redirects_immediately() {
        assert_eq!(Unknown.next(CheckDenied), Redirecting);
    }

    #[test]
    fn test_expiry_path() {
        assert_eq!(Active.next(CheckDenied), Expired);
        assert_eq!(Expired.next(Navigated), Redirecting);
    }

    #[test]
    fn test_logout_path() {
        assert_eq!(Active.next(Logout), LoggedOut);
        assert_eq!(LoggedOut.next(Navigated), Redirecting);
    }

    #[test]
    fn test_redirecting_is_terminal() {
        for event in [CheckGranted, CheckDenied, Logout, Navigated] {
            assert_eq!(Redirecting.next(event), Redirecting);
        }
    }

    #[test]
    fn test_logout_before_load_is_ignored() {
        assert_eq!(Unknown.next(Logout), Unknown);
    }
}

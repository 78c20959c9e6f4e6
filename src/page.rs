//! Page runtime: the thin callers of the session gate.
//!
//! Gated pages check on load and then on a fixed interval until they navigate
//! away. The login page pre-checks for an existing session and handles form
//! submission.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{GateConfig, LogoutPolicy};
use crate::lifecycle::{Lifecycle, PageEvent, PageState};
use crate::session::{GateDecision, LoginError, SessionGate};
use crate::types::{Page, Redirect, SessionRecord};

/// Prompt shown when logout needs confirmation.
pub const LOGOUT_PROMPT: &str = "Are you sure you want to logout?";

/// The browser surface a page acts on.
pub trait Viewport: Send + Sync {
    /// Leave the current page for `url`
    fn navigate(&self, url: &str);

    /// Blocking notice
    fn alert(&self, message: &str);

    /// Blocking yes/no prompt
    fn confirm(&self, message: &str) -> bool;

    /// Inline, non-blocking error next to the login form
    fn show_error(&self, message: &str);

    /// Put the cursor back in the login form's password field
    fn focus_password(&self);
}

impl<V: Viewport + ?Sized> Viewport for Arc<V> {
    fn navigate(&self, url: &str) {
        (**self).navigate(url)
    }

    fn alert(&self, message: &str) {
        (**self).alert(message)
    }

    fn confirm(&self, message: &str) -> bool {
        (**self).confirm(message)
    }

    fn show_error(&self, message: &str) {
        (**self).show_error(message)
    }

    fn focus_password(&self) {
        (**self).focus_password()
    }
}

fn follow<V: Viewport>(viewport: &V, redirect: &Redirect) {
    if let Some(notice) = &redirect.notice {
        viewport.alert(notice);
    }
    viewport.navigate(redirect.target.entry_url());
}

/// A page that sits behind the session gate.
pub struct GuardedPage<V> {
    page: Page,
    gate: Arc<SessionGate>,
    viewport: V,
    lifecycle: Lifecycle,
    logout_policy: LogoutPolicy,
    check_interval: Duration,
}

impl<V: Viewport> GuardedPage<V> {
    pub fn new(page: Page, gate: Arc<SessionGate>, viewport: V, config: &GateConfig) -> Self {
        Self {
            page,
            gate,
            viewport,
            lifecycle: Lifecycle::new(page),
            logout_policy: config.logout_policy,
            check_interval: config.check_interval,
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn state(&self) -> PageState {
        self.lifecycle.state()
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    /// Initial check when the page loads.
    pub fn load(&mut self) -> PageState {
        info!(page = %self.page, "Page loaded, checking authentication");
        self.check()
    }

    /// Periodic re-check. No-op once the page is navigating away.
    pub fn tick(&mut self) -> PageState {
        if self.state().is_terminal() {
            return self.state();
        }
        self.check()
    }

    fn check(&mut self) -> PageState {
        match self.gate.check_authentication() {
            GateDecision::Granted(_) => self.lifecycle.advance(PageEvent::CheckGranted),
            GateDecision::Denied { reason, redirect } => {
                debug!(page = %self.page, "Access denied: {:?}", reason);
                self.lifecycle.advance(PageEvent::CheckDenied);
                follow(&self.viewport, &redirect);
                self.lifecycle.advance(PageEvent::Navigated)
            }
        }
    }

    /// Log out, asking first when the policy says so. A declined prompt
    /// leaves the page active.
    pub fn logout(&mut self) -> PageState {
        if self.state() != PageState::Active {
            debug!(page = %self.page, "Ignoring logout in state {}", self.state());
            return self.state();
        }
        if self.logout_policy == LogoutPolicy::Confirm && !self.viewport.confirm(LOGOUT_PROMPT) {
            debug!(page = %self.page, "Logout cancelled");
            return self.state();
        }

        let redirect = self.gate.logout();
        self.lifecycle.advance(PageEvent::Logout);
        follow(&self.viewport, &redirect);
        self.lifecycle.advance(PageEvent::Navigated)
    }

    /// Load, then re-check every `check_interval` until the page redirects.
    pub async fn run(&mut self) -> PageState {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Like [`run`](Self::run), but also stops when `shutdown` completes.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) -> PageState {
        if self.load().is_terminal() {
            return self.state();
        }

        let mut interval = tokio::time::interval(self.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the load check already covered it.
        interval.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.tick().is_terminal() {
                        return self.state();
                    }
                }
                _ = &mut shutdown => {
                    info!(page = %self.page, "Page closed in state {}", self.state());
                    return self.state();
                }
            }
        }
    }
}

/// Contents of the login form.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub remember_me: bool,
}

/// The login entry page.
pub struct LoginPage<V> {
    gate: Arc<SessionGate>,
    viewport: V,
    redirect_delay: Duration,
    failed_attempts: u32,
}

impl<V: Viewport> LoginPage<V> {
    pub fn new(gate: Arc<SessionGate>, viewport: V, config: &GateConfig) -> Self {
        Self {
            gate,
            viewport,
            redirect_delay: config.login_redirect_delay,
            failed_attempts: 0,
        }
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    /// Failed attempts since this page loaded. Never persisted.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// On load, skip the form when a valid session already exists.
    /// Returns true if the page navigated away.
    pub fn load(&self) -> bool {
        match self.gate.existing_session() {
            Some(redirect) => {
                follow(&self.viewport, &redirect);
                true
            }
            None => false,
        }
    }

    /// Submit the form. On success the page waits `redirect_delay` and then
    /// navigates to the dashboard. On bad credentials the password field is
    /// cleared and refocused after the error is shown.
    pub async fn submit(&mut self, form: &mut LoginForm) -> Result<SessionRecord, LoginError> {
        match self
            .gate
            .login(&form.username, &form.password, form.remember_me)
        {
            Ok(success) => {
                tokio::time::sleep(self.redirect_delay).await;
                follow(&self.viewport, &success.redirect);
                Ok(success.record)
            }
            Err(err) => {
                self.viewport.show_error(&err.to_string());
                match err {
                    LoginError::InvalidCredentials => {
                        self.failed_attempts += 1;
                        form.password.clear();
                        self.viewport.focus_password();
                        debug!("Failed login attempt #{}", self.failed_attempts);
                    }
                    LoginError::Storage(ref e) => warn!("Login could not be stored: {}", e),
                    LoginError::MissingCredentials => {}
                }
                Err(err)
            }
        }
    }
}

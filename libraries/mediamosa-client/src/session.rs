//! Session cookie shared by all calls made through one client.

use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Holds the session cookie issued by the server.
///
/// An empty cookie means "not authenticated". Re-authentication goes through
/// [`Session::begin_login`] so that concurrent callers run one handshake.
#[derive(Debug, Default)]
pub struct Session {
    cookie: RwLock<String>,
    login_gate: Mutex<()>,
}

/// Exclusive right to run the login handshake.
pub(crate) struct LoginGuard<'a> {
    session: &'a Session,
    _gate: MutexGuard<'a, ()>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cookie, empty when unauthenticated.
    pub async fn cookie(&self) -> String {
        self.cookie.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        !self.cookie.read().await.is_empty()
    }

    pub async fn set(&self, cookie: impl Into<String>) {
        *self.cookie.write().await = cookie.into();
    }

    pub async fn clear(&self) {
        self.cookie.write().await.clear();
    }

    /// Wait for the login gate.
    ///
    /// Returns `Err(cookie)` when, by the time the gate was acquired, the
    /// cookie was already replaced by another caller with something other
    /// than `stale`; that cookie should be used instead of logging in again.
    pub(crate) async fn begin_login(&self, stale: &str) -> Result<LoginGuard<'_>, String> {
        let gate = self.login_gate.lock().await;

        let current = self.cookie().await;
        if !current.is_empty() && current != stale {
            return Err(current);
        }

        Ok(LoginGuard {
            session: self,
            _gate: gate,
        })
    }
}

impl LoginGuard<'_> {
    /// Commit a freshly issued cookie.
    pub(crate) async fn commit(self, cookie: String) {
        self.session.set(cookie).await;
    }

    /// Record a failed login.
    pub(crate) async fn fail(self) {
        self.session.clear().await;
    }
}

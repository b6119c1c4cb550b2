//! Session collaborator interface.
//!
//! Supplied by the host's auth layer. No user means no sync — local
//! mutations still land in the outbox and upload once a session exists.

use std::sync::RwLock;

/// Gates whether sync may run and supplies credentials for the transport.
pub trait SessionProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user_id(&self) -> Option<String>;

    /// Bearer token for the relay, if the session has one.
    fn auth_token(&self) -> Option<String>;
}

/// A fixed in-process session, for tests and single-user hosts.
pub struct StaticSession {
    inner: RwLock<(Option<String>, Option<String>)>,
}

impl StaticSession {
    /// A session signed in as the given user, without a token.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new((Some(user_id.into()), None)),
        }
    }

    /// A session with a user and bearer token.
    pub fn with_token(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new((Some(user_id.into()), Some(token.into()))),
        }
    }

    /// A signed-out session.
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            inner: RwLock::new((None, None)),
        }
    }

    /// Signs the session out (e.g. to simulate logout mid-test).
    pub fn sign_out(&self) {
        *self.inner.write().unwrap() = (None, None);
    }
}

impl SessionProvider for StaticSession {
    fn current_user_id(&self) -> Option<String> {
        self.inner.read().unwrap().0.clone()
    }

    fn auth_token(&self) -> Option<String> {
        self.inner.read().unwrap().1.clone()
    }
}

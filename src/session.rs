//! Signed-in user and "last visited" state.
//!
//! The session lives behind a cloneable [`SessionHandle`] that is handed to
//! whatever needs it. It is populated on sign-in and wiped on sign-out.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{DeskError, Result};
use crate::types::Id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub name: String,
}

pub struct Session {
    user: User,
    token: SecretString,
    last_project: Option<Id>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .field("last_project", &self.last_project)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that is already signed in, for tools and tests.
    pub fn signed_in(user: User, token: &str) -> Self {
        let handle = Self::new();
        handle.sign_in(user, token);
        handle
    }

    pub fn sign_in(&self, user: User, token: &str) {
        tracing::debug!(user = %user.name, "signed in");
        *self.inner.write() = Some(Session {
            user,
            token: SecretString::from(token.to_string()),
            last_project: None,
        });
    }

    pub fn sign_out(&self) {
        if self.inner.write().take().is_some() {
            tracing::debug!("signed out");
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.read().as_ref().map(|s| s.user.clone())
    }

    /// The signed-in user, or an auth error.
    pub fn require_user(&self) -> Result<User> {
        self.user()
            .ok_or_else(|| DeskError::Auth("not signed in".to_string()))
    }

    /// Run `f` with the bearer token, if signed in.
    pub fn with_token<T>(&self, f: impl FnOnce(&str) -> T) -> Option<T> {
        self.inner
            .read()
            .as_ref()
            .map(|s| f(s.token.expose_secret()))
    }

    pub fn remember_project(&self, project_id: Id) {
        if let Some(session) = self.inner.write().as_mut() {
            session.last_project = Some(project_id);
        }
    }

    pub fn last_project(&self) -> Option<Id> {
        self.inner.read().as_ref().and_then(|s| s.last_project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: 1,
            name: "alice".to_string(),
        }
    }

    #[test]
    fn test_lifecycle() {
        let handle = SessionHandle::new();
        assert!(handle.require_user().is_err());
        assert_eq!(handle.last_project(), None);

        handle.sign_in(alice(), "tok");
        handle.remember_project(7);
        assert_eq!(handle.user(), Some(alice()));
        assert_eq!(handle.last_project(), Some(7));

        handle.sign_out();
        assert!(!handle.is_signed_in());
        assert_eq!(handle.last_project(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let handle = SessionHandle::new();
        let other = handle.clone();
        handle.sign_in(alice(), "tok");
        assert!(other.is_signed_in());
        assert_eq!(other.with_token(|t| t.len()), Some(3));
    }

    #[test]
    fn test_debug_redacts_token() {
        let handle = SessionHandle::signed_in(alice(), "super-secret");
        let debug = format!("{handle:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_remember_project_requires_session() {
        let handle = SessionHandle::new();
        handle.remember_project(3);
        assert_eq!(handle.last_project(), None);
    }
}

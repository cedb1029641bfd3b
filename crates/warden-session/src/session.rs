//! Authenticated sessions.
//!
//! A [`Session`] tracks at most one authenticated principal, the
//! single-user model of an interactive shell. [`SessionRegistry`] keys
//! several sessions by an opaque [`SessionId`] for multi-user hosts.

use std::collections::HashMap;
use std::fmt::{self, Display};

use tracing::{info, warn};
use warden_types::PrincipalId;

use crate::directory::Directory;
use crate::error::AuthError;
use crate::principal::Principal;

/// Outcome of [`Session::end`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The named principal was logged out.
    Ended(Principal),
    /// Nobody was logged in; nothing changed.
    NoActiveSession,
}

/// At most one authenticated principal.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Option<Principal>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies `secret` for `id` and makes that principal current.
    ///
    /// A failed attempt leaves the session as it was.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UnknownPrincipal`] if `id` is not in the directory
    /// - [`AuthError::Inactive`] if the principal is deactivated
    /// - [`AuthError::BadCredential`] if the secret does not match
    pub fn authenticate(
        &mut self,
        directory: &Directory,
        id: &PrincipalId,
        secret: &str,
    ) -> Result<Principal, AuthError> {
        let principal = directory.get(id).ok_or_else(|| {
            warn!(principal = %id, "Authentication failed: unknown principal");
            AuthError::UnknownPrincipal {
                principal: id.clone(),
            }
        })?;

        if !principal.is_active() {
            warn!(principal = %id, "Authentication failed: inactive");
            return Err(AuthError::Inactive {
                principal: id.clone(),
            });
        }

        if !principal.credential().verify(secret) {
            warn!(principal = %id, "Authentication failed: bad credential");
            return Err(AuthError::BadCredential {
                principal: id.clone(),
            });
        }

        if let Some(previous) = self.current.as_ref().filter(|p| p.id() != id) {
            info!(previous = %previous.id(), "Replacing active session");
        }
        info!(principal = %id, role = %principal.role(), "Session started");
        self.current = Some(principal.clone());
        Ok(principal.clone())
    }

    /// Returns the active principal, if any.
    pub fn current(&self) -> Option<&Principal> {
        self.current.as_ref()
    }

    /// Clears the active principal. Idempotent.
    pub fn end(&mut self) -> SessionEnd {
        match self.current.take() {
            Some(principal) => {
                info!(principal = %principal.id(), "Session ended");
                SessionEnd::Ended(principal)
            }
            None => SessionEnd::NoActiveSession,
        }
    }

    /// Re-reads the active principal from the directory.
    ///
    /// Call after any administrative change so authorization never runs on
    /// a stale role or status. A principal that no longer exists ends the
    /// session.
    pub fn refresh(&mut self, directory: &Directory) -> Option<&Principal> {
        if let Some(id) = self.current.as_ref().map(|p| p.id().clone()) {
            match directory.get(&id) {
                Some(fresh) => self.current = Some(fresh.clone()),
                None => {
                    info!(principal = %id, "Session ended: principal removed");
                    self.current = None;
                }
            }
        }
        self.current.as_ref()
    }
}

/// Opaque handle of a session in a [`SessionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Sessions keyed by connection, for hosts serving several users at once.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    next_id: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an anonymous session and returns its handle.
    pub fn open(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(id, Session::new());
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Closes a session, ending it first. Returns `None` for unknown handles.
    pub fn close(&mut self, id: SessionId) -> Option<SessionEnd> {
        self.sessions.remove(&id).map(|mut session| session.end())
    }

    /// Refreshes every session against the directory.
    pub fn refresh_all(&mut self, directory: &Directory) {
        for session in self.sessions.values_mut() {
            session.refresh(directory);
        }
    }

    /// Number of sessions with a logged-in principal.
    pub fn authenticated_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.current().is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

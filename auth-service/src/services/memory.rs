use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{NewUser, RefreshSession, Role, User, DEFAULT_ROLE};
use crate::services::{CredentialStore, ServiceError, SessionStore};

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    roles: Vec<Role>,
    /// Keyed by user id: one session per user.
    sessions: HashMap<i32, RefreshSession>,
    next_user_id: i32,
    next_session_id: i32,
}

/// Process-local store for tests and single-node development runs.
///
/// Every operation runs under one mutex, which gives the same per-record
/// atomicity the PostgreSQL store gets from single statements and
/// transactions.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    /// Store seeded with the default role.
    pub fn new() -> Self {
        let store = Self::empty();
        if let Ok(mut state) = store.state.lock() {
            state.roles.push(Role::new(1, DEFAULT_ROLE));
        }
        store
    }

    /// Store without any seed data.
    pub fn empty() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, ServiceError> {
        self.state
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("In-memory store poisoned: {}", e)))
    }

    pub fn user_count(&self) -> usize {
        self.state().map(|s| s.users.len()).unwrap_or(0)
    }

    pub fn session_count(&self) -> usize {
        self.state().map(|s| s.sessions.len()).unwrap_or(0)
    }

    /// Current session of a user, if any.
    pub fn session_for_user(&self, user_id: i32) -> Option<RefreshSession> {
        self.state()
            .ok()
            .and_then(|s| s.sessions.get(&user_id).cloned())
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.state()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: i32) -> Result<Option<User>, ServiceError> {
        Ok(self.state()?.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_activation_link(
        &self,
        link: &str,
    ) -> Result<Option<User>, ServiceError> {
        Ok(self
            .state()?
            .users
            .iter()
            .find(|u| u.activation_link == link)
            .cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, ServiceError> {
        Ok(self.state()?.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn create_user_with_role(
        &self,
        new_user: NewUser,
        role: &Role,
    ) -> Result<User, ServiceError> {
        let mut state = self.state()?;

        if state.users.iter().any(|u| u.email == new_user.email) {
            return Err(ServiceError::UserAlreadyExists);
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            email: new_user.email,
            password: new_user.password_hash,
            is_activated: false,
            activation_link: new_user.activation_link,
            created_utc: Utc::now(),
            roles: vec![role.clone()],
        };
        state.users.push(user.clone());

        Ok(user)
    }

    async fn activate_user(&self, user_id: i32) -> Result<(), ServiceError> {
        if let Some(user) = self.state()?.users.iter_mut().find(|u| u.id == user_id) {
            user.is_activated = true;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn save_token(
        &self,
        user_id: i32,
        refresh_token: &str,
    ) -> Result<RefreshSession, ServiceError> {
        let mut state = self.state()?;
        let refresh_token_hash = RefreshSession::hash_token(refresh_token);

        let id = match state.sessions.get(&user_id) {
            Some(existing) => existing.id,
            None => {
                state.next_session_id += 1;
                state.next_session_id
            }
        };

        let session = RefreshSession {
            id,
            user_id,
            refresh_token_hash,
            updated_utc: Utc::now(),
        };
        state.sessions.insert(user_id, session.clone());

        Ok(session)
    }

    async fn find_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<RefreshSession>, ServiceError> {
        Ok(self
            .state()?
            .sessions
            .values()
            .find(|s| s.matches(refresh_token))
            .cloned())
    }

    async fn rotate_token(
        &self,
        user_id: i32,
        current: &str,
        next: &str,
    ) -> Result<Option<RefreshSession>, ServiceError> {
        let mut state = self.state()?;

        match state.sessions.get_mut(&user_id) {
            Some(session) if session.matches(current) => {
                session.refresh_token_hash = RefreshSession::hash_token(next);
                session.updated_utc = Utc::now();
                Ok(Some(session.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn remove_token(&self, refresh_token: &str) -> Result<RefreshSession, ServiceError> {
        let mut state = self.state()?;
        let user_id = state
            .sessions
            .values()
            .find(|s| s.matches(refresh_token))
            .map(|s| s.user_id)
            .ok_or(ServiceError::SessionNotFound)?;

        state
            .sessions
            .remove(&user_id)
            .ok_or(ServiceError::SessionNotFound)
    }
}

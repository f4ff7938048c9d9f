//! In-memory implementation of every storage trait.
//!
//! Backed by [`DashMap`], so all operations are safe to call concurrently.
//! [`AuthorizationCodeStorage::take`] relies on [`DashMap::remove`], which
//! hands the entry to exactly one caller.

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::session::SessionData;
use crate::storage::{
    AuthorizationCodeStorage, ClientStorage, RefreshTokenStorage, SessionStore, UserStorage,
};
use crate::types::{AuthorizationCode, OAuthClient, RefreshToken, User};

/// Process-local storage for all authorization server entities.
#[derive(Debug, Default)]
pub struct InMemoryAuthStorage {
    clients: DashMap<String, OAuthClient>,
    users: DashMap<Uuid, User>,
    codes: DashMap<String, AuthorizationCode>,
    /// Keyed by token hash.
    refresh_tokens: DashMap<String, RefreshToken>,
    sessions: DashMap<String, (SessionData, OffsetDateTime)>,
}

impl InMemoryAuthStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStorage for InMemoryAuthStorage {
    async fn find_by_id(&self, client_id: &str) -> AuthResult<Option<OAuthClient>> {
        Ok(self.clients.get(client_id).map(|c| c.value().clone()))
    }

    async fn create(&self, client: &OAuthClient) -> AuthResult<()> {
        use dashmap::mapref::entry::Entry;

        match self.clients.entry(client.id.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage(format!(
                "client '{}' already exists",
                client.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, client: &OAuthClient) -> AuthResult<()> {
        match self.clients.get_mut(&client.id) {
            Some(mut existing) => {
                *existing = client.clone();
                Ok(())
            }
            None => Err(AuthError::storage(format!(
                "client '{}' not found",
                client.id
            ))),
        }
    }

    async fn delete(&self, client_id: &str) -> AuthResult<bool> {
        let removed = self.clients.remove(client_id).is_some();
        self.codes.retain(|_, code| code.client_id != client_id);
        self.refresh_tokens
            .retain(|_, token| token.client_id != client_id);
        Ok(removed)
    }

    async fn list_active(&self) -> AuthResult<Vec<OAuthClient>> {
        let mut clients: Vec<OAuthClient> = self
            .clients
            .iter()
            .filter(|c| c.is_active)
            .map(|c| c.value().clone())
            .collect();
        clients.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(clients)
    }
}

#[async_trait]
impl UserStorage for InMemoryAuthStorage {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_provider_id_or_email(
        &self,
        provider_id: &str,
        email: &str,
    ) -> AuthResult<Option<User>> {
        let by_provider = self
            .users
            .iter()
            .find(|u| u.provider_id.as_deref() == Some(provider_id))
            .map(|u| u.value().clone());
        if by_provider.is_some() {
            return Ok(by_provider);
        }

        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.value().clone()))
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        if self.users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::storage(format!(
                "email '{}' already registered",
                user.email
            )));
        }
        if self.users.insert(user.id, user.clone()).is_some() {
            return Err(AuthError::storage(format!("user {} already exists", user.id)));
        }
        Ok(())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        match self.users.get_mut(&user.id) {
            Some(mut existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(AuthError::storage(format!("user {} not found", user.id))),
        }
    }

    async fn count(&self) -> AuthResult<u64> {
        Ok(self.users.len() as u64)
    }
}

#[async_trait]
impl AuthorizationCodeStorage for InMemoryAuthStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn take(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self.codes.remove(code).map(|(_, row)| row))
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let before = self.codes.len();
        self.codes.retain(|_, code| code.expires_at >= now);
        Ok(before.saturating_sub(self.codes.len()) as u64)
    }

    async fn delete_by_client(&self, client_id: &str) -> AuthResult<u64> {
        let before = self.codes.len();
        self.codes.retain(|_, code| code.client_id != client_id);
        Ok(before.saturating_sub(self.codes.len()) as u64)
    }
}

#[async_trait]
impl RefreshTokenStorage for InMemoryAuthStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        self.refresh_tokens
            .insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_active(
        &self,
        token_hash: &str,
        client_id: &str,
    ) -> AuthResult<Option<RefreshToken>> {
        Ok(self
            .refresh_tokens
            .get(token_hash)
            .filter(|t| t.client_id == client_id && !t.is_revoked())
            .map(|t| t.value().clone()))
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<bool> {
        match self.refresh_tokens.get_mut(token_hash) {
            Some(mut token) if !token.is_revoked() => {
                token.revoked_at = Some(OffsetDateTime::now_utc());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all(&self, user_id: Uuid, client_id: Option<&str>) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut revoked = 0;
        for mut token in self.refresh_tokens.iter_mut() {
            let matches_client = client_id.is_none_or(|id| token.client_id == id);
            if token.user_id == user_id && matches_client && !token.is_revoked() {
                token.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_by_client(&self, client_id: &str) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut revoked = 0;
        for mut token in self.refresh_tokens.iter_mut() {
            if token.client_id == client_id && !token.is_revoked() {
                token.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[async_trait]
impl SessionStore for InMemoryAuthStorage {
    async fn load(&self, session_id: &str) -> AuthResult<Option<SessionData>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .sessions
            .get(session_id)
            .filter(|entry| entry.1 > now)
            .map(|entry| entry.0.clone()))
    }

    async fn save(
        &self,
        session_id: &str,
        data: &SessionData,
        expires_at: OffsetDateTime,
    ) -> AuthResult<()> {
        self.sessions
            .insert(session_id.to_string(), (data.clone(), expires_at));
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> AuthResult<()> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.1 >= now);
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}

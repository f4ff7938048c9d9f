//! Cookie-backed browser sessions.
//!
//! The cookie holds only an opaque random id; the [`SessionData`] itself lives
//! in the [`SessionStore`]. Handlers load a [`BrowserSession`], pass
//! `&mut session.data` to the orchestrator, then call [`BrowserSession::save`]
//! and return the updated jar with their response.

use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::config::SessionConfig;
use crate::oauth::SessionData;
use crate::secret::generate_secure_token;
use crate::storage::SessionStore;

/// Bytes of randomness in a session id.
const SESSION_ID_BYTES: usize = 32;

/// A browser session resolved from the request cookies.
#[derive(Debug, Clone)]
pub struct BrowserSession {
    id: String,
    /// Session contents.
    pub data: SessionData,
}

impl BrowserSession {
    /// Resolves the session named by the cookie in `jar`.
    ///
    /// A missing cookie or an unknown/expired id yields a fresh, empty
    /// session with a new id.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(
        jar: &CookieJar,
        store: &dyn SessionStore,
        config: &SessionConfig,
    ) -> AuthResult<Self> {
        if let Some(cookie) = jar.get(&config.cookie_name) {
            let id = cookie.value();
            if let Some(data) = store.load(id).await? {
                return Ok(Self {
                    id: id.to_string(),
                    data,
                });
            }
        }

        Ok(Self {
            id: generate_secure_token(SESSION_ID_BYTES),
            data: SessionData::default(),
        })
    }

    /// Moves the session to a fresh id and drops the old one from the store.
    ///
    /// Called when the session gains a user, so an id known before login
    /// never names an authenticated session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn regenerate(&mut self, store: &dyn SessionStore) -> AuthResult<()> {
        store.remove(&self.id).await?;
        self.id = generate_secure_token(SESSION_ID_BYTES);
        Ok(())
    }

    /// Persists the session and returns `jar` with the session cookie set.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn save(
        self,
        jar: CookieJar,
        store: &dyn SessionStore,
        config: &SessionConfig,
    ) -> AuthResult<CookieJar> {
        let lifetime = time::Duration::try_from(config.lifetime)
            .map_err(|e| AuthError::configuration(format!("session lifetime: {e}")))?;
        let expires_at = OffsetDateTime::now_utc() + lifetime;

        store.save(&self.id, &self.data, expires_at).await?;

        Ok(jar.add(session_cookie(config, self.id, lifetime)))
    }
}

fn session_cookie(config: &SessionConfig, id: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), id))
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

//! Table definitions.
//!
//! Applied with `CREATE ... IF NOT EXISTS` on startup, so running
//! [`ensure_schema`] against an existing database is a no-op.

use sqlx_core::query::query;

use crate::{PgPool, StorageResult};

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS studio_users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        avatar TEXT,
        provider_id TEXT UNIQUE,
        provider_token TEXT,
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS studio_oauth_clients (
        id TEXT PRIMARY KEY,
        secret_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        website_url TEXT NOT NULL,
        preview_url_pattern TEXT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        owner_id UUID,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS studio_authorization_codes (
        code TEXT PRIMARY KEY,
        client_id TEXT NOT NULL REFERENCES studio_oauth_clients(id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES studio_users(id) ON DELETE CASCADE,
        redirect_uri TEXT NOT NULL,
        scope TEXT NOT NULL,
        code_challenge TEXT,
        code_challenge_method TEXT,
        nonce TEXT,
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS studio_authorization_codes_expires_at_idx \
     ON studio_authorization_codes (expires_at)",
    r#"
    CREATE TABLE IF NOT EXISTS studio_refresh_tokens (
        id UUID PRIMARY KEY,
        token_hash TEXT NOT NULL UNIQUE,
        client_id TEXT NOT NULL REFERENCES studio_oauth_clients(id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES studio_users(id) ON DELETE CASCADE,
        scope TEXT NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        revoked_at TIMESTAMPTZ
    )
    "#,
    "CREATE INDEX IF NOT EXISTS studio_refresh_tokens_user_idx \
     ON studio_refresh_tokens (user_id, client_id)",
    r#"
    CREATE TABLE IF NOT EXISTS studio_sessions (
        id TEXT PRIMARY KEY,
        data JSONB NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS studio_sessions_expires_at_idx \
     ON studio_sessions (expires_at)",
];

/// Creates every table and index the storage needs.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub async fn ensure_schema(pool: &PgPool) -> StorageResult<()> {
    for statement in STATEMENTS {
        query(*statement).execute(pool).await?;
    }
    tracing::debug!(statements = STATEMENTS.len(), "Auth schema ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_created_before_references() {
        let position = |needle: &str| {
            STATEMENTS
                .iter()
                .position(|s| s.contains(needle))
                .unwrap()
        };
        let users = position("TABLE IF NOT EXISTS studio_users");
        let clients = position("TABLE IF NOT EXISTS studio_oauth_clients");
        assert!(users < position("TABLE IF NOT EXISTS studio_authorization_codes"));
        assert!(clients < position("TABLE IF NOT EXISTS studio_refresh_tokens"));
    }

    #[test]
    fn test_statements_are_idempotent() {
        assert!(STATEMENTS.iter().all(|s| s.contains("IF NOT EXISTS")));
    }
}

//! User storage.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use time::OffsetDateTime;
use uuid::Uuid;

use studio_auth::AuthResult;
use studio_auth::storage::UserStorage;
use studio_auth::types::User;

use crate::{PostgresAuthStorage, StorageError};

type UserTuple = (
    Uuid,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
    OffsetDateTime,
    OffsetDateTime,
);

const USER_COLUMNS: &str =
    "id, email, name, avatar, provider_id, provider_token, is_admin, created_at, updated_at";

fn user_from_tuple(row: UserTuple) -> User {
    User {
        id: row.0,
        email: row.1,
        name: row.2,
        avatar: row.3,
        provider_id: row.4,
        provider_token: row.5,
        is_admin: row.6,
        created_at: row.7,
        updated_at: row.8,
    }
}

#[async_trait]
impl UserStorage for PostgresAuthStorage {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        let row: Option<UserTuple> =
            query_as(&format!("SELECT {USER_COLUMNS} FROM studio_users WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(StorageError::from)?;

        Ok(row.map(user_from_tuple))
    }

    async fn find_by_provider_id_or_email(
        &self,
        provider_id: &str,
        email: &str,
    ) -> AuthResult<Option<User>> {
        // A provider id match wins over an email match.
        let row: Option<UserTuple> = query_as(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM studio_users
            WHERE provider_id = $1 OR email = $2
            ORDER BY (provider_id = $1) DESC NULLS LAST
            LIMIT 1
            "#
        ))
        .bind(provider_id)
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(user_from_tuple))
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO studio_users
                (id, email, name, avatar, provider_id, provider_token, is_admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.avatar)
        .bind(&user.provider_id)
        .bind(&user.provider_token)
        .bind(user.is_admin)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::from_insert(e, || format!("User {} already exists", user.id)))?;

        Ok(())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let result = query(
            r#"
            UPDATE studio_users
            SET email = $2,
                name = $3,
                avatar = $4,
                provider_id = $5,
                provider_token = $6,
                is_admin = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.avatar)
        .bind(&user.provider_id)
        .bind(&user.provider_token)
        .bind(user.is_admin)
        .bind(user.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::from_insert(e, || format!("User {} conflicts", user.id)))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("User {}", user.id)).into());
        }
        Ok(())
    }

    async fn count(&self) -> AuthResult<u64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM studio_users")
            .fetch_one(self.pool())
            .await
            .map_err(StorageError::from)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

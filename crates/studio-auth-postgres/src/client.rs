//! OAuth client storage.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use studio_auth::AuthResult;
use studio_auth::storage::ClientStorage;
use studio_auth::types::OAuthClient;

use crate::{PostgresAuthStorage, StorageError};

type ClientTuple = (
    String,
    String,
    String,
    String,
    Option<String>,
    bool,
    Option<Uuid>,
    OffsetDateTime,
);

const CLIENT_COLUMNS: &str =
    "id, secret_hash, name, website_url, preview_url_pattern, is_active, owner_id, created_at";

fn client_from_tuple(row: ClientTuple) -> OAuthClient {
    OAuthClient {
        id: row.0,
        secret_hash: row.1,
        name: row.2,
        website_url: row.3,
        preview_url_pattern: row.4,
        is_active: row.5,
        owner_id: row.6,
        created_at: row.7,
    }
}

#[async_trait]
impl ClientStorage for PostgresAuthStorage {
    async fn find_by_id(&self, client_id: &str) -> AuthResult<Option<OAuthClient>> {
        let row: Option<ClientTuple> = query_as(&format!(
            "SELECT {CLIENT_COLUMNS} FROM studio_oauth_clients WHERE id = $1"
        ))
        .bind(client_id)
        .fetch_optional(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(client_from_tuple))
    }

    async fn create(&self, client: &OAuthClient) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO studio_oauth_clients
                (id, secret_hash, name, website_url, preview_url_pattern, is_active, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&client.id)
        .bind(&client.secret_hash)
        .bind(&client.name)
        .bind(&client.website_url)
        .bind(&client.preview_url_pattern)
        .bind(client.is_active)
        .bind(client.owner_id)
        .bind(client.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            StorageError::from_insert(e, || format!("Client '{}' already exists", client.id))
        })?;

        tracing::debug!(client_id = %client.id, "Stored client");
        Ok(())
    }

    async fn update(&self, client: &OAuthClient) -> AuthResult<()> {
        let result = query(
            r#"
            UPDATE studio_oauth_clients
            SET secret_hash = $2,
                name = $3,
                website_url = $4,
                preview_url_pattern = $5,
                is_active = $6,
                owner_id = $7
            WHERE id = $1
            "#,
        )
        .bind(&client.id)
        .bind(&client.secret_hash)
        .bind(&client.name)
        .bind(&client.website_url)
        .bind(&client.preview_url_pattern)
        .bind(client.is_active)
        .bind(client.owner_id)
        .execute(self.pool())
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("Client {}", client.id)).into());
        }
        Ok(())
    }

    async fn delete(&self, client_id: &str) -> AuthResult<bool> {
        // Codes and refresh tokens go with the client (ON DELETE CASCADE).
        let result = query("DELETE FROM studio_oauth_clients WHERE id = $1")
            .bind(client_id)
            .execute(self.pool())
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_active(&self) -> AuthResult<Vec<OAuthClient>> {
        let rows: Vec<ClientTuple> = query_as(&format!(
            "SELECT {CLIENT_COLUMNS} FROM studio_oauth_clients WHERE is_active ORDER BY created_at"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(client_from_tuple).collect())
    }
}

//! PostgreSQL storage backend for studio-auth
//!
//! Provides persistent storage for:
//!
//! - OAuth clients
//! - Users
//! - Authorization codes (single-use, taken with `DELETE ... RETURNING`)
//! - Refresh tokens (hashed, revoked in place)
//! - Browser sessions
//!
//! Tables are plain relational tables created by [`PostgresAuthStorage::ensure_schema`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use studio_auth::AuthStores;
//! use studio_auth_postgres::PostgresAuthStorage;
//!
//! let storage = Arc::new(PostgresAuthStorage::connect("postgres://localhost/studio").await?);
//! storage.ensure_schema().await?;
//! let stores = AuthStores::from_backend(storage);
//! ```

pub mod client;
pub mod code;
pub mod schema;
pub mod session;
pub mod token;
pub mod user;

use std::sync::Arc;

use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_postgres::Postgres;

use studio_auth::AuthError;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Requested record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a server error (5xx equivalent).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Serialization(_))
    }

    /// Maps a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_insert(err: sqlx_core::Error, what: impl FnOnce() -> String) -> Self {
        if let sqlx_core::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::conflict(what());
        }
        Self::Database(err)
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        if err.is_server_error() {
            tracing::error!(error = %err, "Auth storage failure");
        }
        AuthError::storage(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend implementing every studio-auth storage trait.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Creates the tables if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        schema::ensure_schema(&self.pool).await
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// =============================================================================
// Tests
// =============================================================================

mod chirps;
mod user;

use std::sync::Arc;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use chirps::{Chirp, ChirpStore};
pub use user::{IdentityStore, MemoryIdentityStore, NewUser, SqliteIdentityStore, User};

/// Handle to the backing stores. The identity store is a trait object so
/// the sqlite and in-memory implementations are interchangeable; chirp
/// persistence is plain sqlite.
#[derive(Clone)]
pub struct Database {
    users: Arc<dyn IdentityStore>,
    chirps: ChirpStore,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        migrate(&pool).await?;

        Ok(Self {
            users: Arc::new(SqliteIdentityStore::new(pool.clone())),
            chirps: ChirpStore::new(pool),
        })
    }

    /// Replace the identity store, keeping chirp persistence as-is.
    /// Used to wire in the in-memory store.
    pub fn with_identity_store(mut self, users: Arc<dyn IdentityStore>) -> Self {
        self.users = users;
        self
    }

    pub fn users(&self) -> &dyn IdentityStore {
        self.users.as_ref()
    }

    pub fn chirps(&self) -> &ChirpStore {
        &self.chirps
    }
}

/// Get the current schema version.
async fn get_version(pool: &SqlitePool) -> Result<i32, sqlx::Error> {
    let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(result.map(|r| r.0).unwrap_or(0))
}

/// Set the schema version within a transaction.
async fn set_version(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    version: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM schema_version")
        .execute(&mut **tx)
        .await?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Run database migrations.
async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await?;

    let version = get_version(pool).await?;

    if version < 1 {
        migrate_v1(pool).await?;
    }

    Ok(())
}

/// Execute a list of queries in a transaction, then set the version.
async fn run_migration(
    pool: &SqlitePool,
    version: i32,
    queries: &[&'static str],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for query in queries {
        sqlx::query(query).execute(&mut *tx).await?;
    }
    set_version(&mut tx, version).await?;
    tx.commit().await?;
    Ok(())
}

async fn migrate_v1(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    run_migration(
        pool,
        1,
        &[
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid TEXT UNIQUE NOT NULL,
                username TEXT UNIQUE NOT NULL COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            "CREATE TABLE chirps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid TEXT UNIQUE NOT NULL,
                text TEXT NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            "CREATE INDEX idx_chirps_user_id ON chirps(user_id)",
        ],
    )
    .await
}

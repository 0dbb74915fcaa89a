use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tokio::sync::RwLock;

/// A stored identity. The uuid is the subject id embedded in tokens.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub url: Option<String>,
}

/// Fields required to create a new identity.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub uuid: String,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub url: Option<String>,
}

/// Identity store consumed by the authentication gate and the issuance
/// flow. Implementations are interchangeable; the core depends only on
/// this interface.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    /// Create a new identity. Returns the row id.
    async fn create(&self, user: NewUser) -> Result<i64, sqlx::Error>;
}

// --- Sqlite implementation ---

#[derive(Clone)]
pub struct SqliteIdentityStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    uuid: String,
    username: String,
    password_hash: String,
    name: String,
    email: String,
    url: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            username: row.username,
            password_hash: row.password_hash,
            name: row.name,
            email: row.email,
            url: row.url,
        }
    }
}

impl SqliteIdentityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, uuid, username, password_hash, name, email, url";

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE uuid = ?", USER_COLUMNS))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn create(&self, user: NewUser) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, username, password_hash, name, email, url)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.uuid)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.url)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }
}

// --- In-memory implementation ---

/// Identity store backed by process memory. Interchangeable with the
/// sqlite store; rows do not survive a restart.
#[derive(Default)]
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<String, User>>,
    next_id: AtomicI64,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Remove an identity. Tokens issued for it keep verifying but stop
    /// resolving, which the gate treats as unauthenticated.
    pub async fn remove(&self, uuid: &str) -> Option<User> {
        self.users.write().await.remove(uuid)
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self.users.read().await.get(uuid).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<i64, sqlx::Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut users = self.users.write().await;
        users.insert(
            user.uuid.clone(),
            User {
                id,
                uuid: user.uuid,
                username: user.username,
                password_hash: user.password_hash,
                name: user.name,
                email: user.email,
                url: user.url,
            },
        );
        Ok(id)
    }
}

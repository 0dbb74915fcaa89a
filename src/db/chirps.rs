use sqlx::sqlite::SqlitePool;

/// A chirp joined with its author's public profile, the shape the feed
/// endpoints return.
#[derive(Debug, Clone)]
pub struct Chirp {
    pub uuid: String,
    pub text: String,
    pub created_at: String,
    pub user_id: i64,
    pub username: String,
    pub name: String,
    pub url: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ChirpRow {
    uuid: String,
    text: String,
    created_at: String,
    user_id: i64,
    username: String,
    name: String,
    url: Option<String>,
}

impl From<ChirpRow> for Chirp {
    fn from(row: ChirpRow) -> Self {
        Self {
            uuid: row.uuid,
            text: row.text,
            created_at: row.created_at,
            user_id: row.user_id,
            username: row.username,
            name: row.name,
            url: row.url,
        }
    }
}

const SELECT_JOIN: &str = "SELECT c.uuid AS uuid, c.text AS text, c.created_at AS created_at,
    c.user_id AS user_id, u.username AS username, u.name AS name, u.url AS url
    FROM chirps c JOIN users u ON c.user_id = u.id";

#[derive(Clone)]
pub struct ChirpStore {
    pool: SqlitePool,
}

impl ChirpStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all chirps, newest first.
    pub async fn list_all(&self) -> Result<Vec<Chirp>, sqlx::Error> {
        let rows: Vec<ChirpRow> =
            sqlx::query_as(&format!("{} ORDER BY c.created_at DESC, c.id DESC", SELECT_JOIN))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Chirp::from).collect())
    }

    /// List one author's chirps, newest first.
    pub async fn list_by_username(&self, username: &str) -> Result<Vec<Chirp>, sqlx::Error> {
        let rows: Vec<ChirpRow> = sqlx::query_as(&format!(
            "{} WHERE u.username = ? ORDER BY c.created_at DESC, c.id DESC",
            SELECT_JOIN
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Chirp::from).collect())
    }

    pub async fn get(&self, uuid: &str) -> Result<Option<Chirp>, sqlx::Error> {
        let row: Option<ChirpRow> =
            sqlx::query_as(&format!("{} WHERE c.uuid = ?", SELECT_JOIN))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Chirp::from))
    }

    pub async fn create(&self, uuid: &str, text: &str, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO chirps (uuid, text, user_id) VALUES (?, ?, ?)")
            .bind(uuid)
            .bind(text)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update(&self, uuid: &str, text: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE chirps SET text = ? WHERE uuid = ?")
            .bind(text)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, uuid: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM chirps WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

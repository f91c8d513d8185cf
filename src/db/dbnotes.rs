use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use tracing::info;

use crate::db::gateway::PersistenceGateway;
use crate::models::{NoteEditRecord, NoteRecord, PersistenceError};

/// Note row from the database
#[derive(Debug, Clone, sqlx::FromRow)]
struct NoteRow {
    pub note_id: String,
    pub content: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl From<NoteRow> for NoteRecord {
    fn from(row: NoteRow) -> Self {
        NoteRecord {
            note_id: row.note_id,
            content: row.content,
            title: row.title,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}

/// Postgres-backed persistence gateway
pub struct DbNotes {
    pool: PgPool,
}

impl DbNotes {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    ///
    /// # Returns
    /// * `Result<Self, SqlxError>` - Database connection pool or error
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // Recycle connections after 30 minutes
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn store_err(e: SqlxError) -> PersistenceError {
    PersistenceError::Store(e.to_string())
}

#[async_trait]
impl PersistenceGateway for DbNotes {
    async fn read_note(&self, note_id: &str) -> Result<Option<NoteRecord>, PersistenceError> {
        let row: Option<NoteRow> = sqlx::query_as(
            r#"
            SELECT note_id, content, title, updated_at, updated_by
            FROM interview_notes
            WHERE note_id = $1
            "#,
        )
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(NoteRecord::from))
    }

    async fn write_note(
        &self,
        note_id: &str,
        content: &str,
        title: Option<&str>,
        user_id: &str,
    ) -> Result<NoteRecord, PersistenceError> {
        // Upsert keeps the previous title when the save carries none.
        let row: NoteRow = sqlx::query_as(
            r#"
            INSERT INTO interview_notes (note_id, content, title, updated_at, updated_by)
            VALUES ($1, $2, COALESCE($3, ''), now(), $4)
            ON CONFLICT (note_id) DO UPDATE SET
                content = EXCLUDED.content,
                title = COALESCE($3, interview_notes.title),
                updated_at = now(),
                updated_by = EXCLUDED.updated_by
            RETURNING note_id, content, title, updated_at, updated_by
            "#,
        )
        .bind(note_id)
        .bind(content)
        .bind(title)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.into())
    }

    async fn append_edit(&self, record: &NoteEditRecord) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO note_edit_records (note_id, user_id, content_snapshot, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.note_id)
        .bind(&record.user_id)
        .bind(&record.content_snapshot)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }
}

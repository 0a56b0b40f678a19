//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the base schema (posts and events).
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

/// Initialize the documents BLOB table.
///
/// Kept as a separate migration so a deployment that skipped it produces
/// the distinct schema-missing error instead of a generic failure.
pub async fn initialize_documents_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(DOCUMENTS_SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Posts table (announcements)
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    department_id TEXT NOT NULL,
    admin_name TEXT,
    caption TEXT NOT NULL,
    image_url TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_posts_department ON posts(department_id);
CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at);

-- Events table (calendar entries)
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    department_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    event_date TEXT NOT NULL,
    end_date TEXT,
    location TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_events_department ON events(department_id);
CREATE INDEX IF NOT EXISTS idx_events_event_date ON events(event_date);
"#;

const DOCUMENTS_SCHEMA_SQL: &str = r#"
-- Documents table: write-once PDF BLOB rows
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    mimetype TEXT NOT NULL,
    size INTEGER NOT NULL,
    data BLOB NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

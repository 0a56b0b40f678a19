//! Document BLOB table operations
//!
//! Documents are write-once: a single insert records the PDF bytes together
//! with their length, and no update path exists. Delivery never pulls the
//! whole BLOB; it reads fixed windows via `substr`, which uses 1-based
//! inclusive byte offsets.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Fixed window size for chunked BLOB reads: 1 MiB.
pub const CHUNK_WINDOW: i64 = 1_048_576;

const TABLE: &str = "documents";

/// Document metadata (everything but the bytes)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub id: String,
    pub filename: String,
    pub mimetype: String,
    pub size: i64,
    pub created_at: String,
}

/// Document repository
pub struct DocumentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new document. `size` is recorded from the buffer length at
    /// insert time, never recomputed from the stored BLOB.
    pub async fn insert(&self, filename: &str, mimetype: &str, data: &[u8]) -> Result<DocumentMeta> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();
        let size = data.len() as i64;

        sqlx::query(
            r#"
            INSERT INTO documents (id, filename, mimetype, size, data, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(filename)
        .bind(mimetype)
        .bind(size)
        .bind(data)
        .bind(&created_at)
        .execute(self.pool)
        .await
        .map_err(|e| AppError::from_db(e, TABLE))?;

        Ok(DocumentMeta {
            id,
            filename: filename.to_string(),
            mimetype: mimetype.to_string(),
            size,
            created_at,
        })
    }

    /// Fetch metadata only (no bytes), to fail fast on a missing id and to
    /// size response headers before streaming.
    pub async fn meta(&self, id: &str) -> Result<Option<DocumentMeta>> {
        let meta = sqlx::query_as::<_, DocumentMeta>(
            r#"
            SELECT id, filename, mimetype, size, created_at
            FROM documents
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| AppError::from_db(e, TABLE))?;

        Ok(meta)
    }

    /// Fetch one byte window from the BLOB. `offset` is 1-based inclusive,
    /// matching SQL substring semantics; at most `len` bytes come back.
    pub async fn chunk(&self, id: &str, offset: i64, len: i64) -> Result<Vec<u8>> {
        let row = sqlx::query("SELECT substr(data, ?, ?) AS chunk FROM documents WHERE id = ?")
            .bind(offset)
            .bind(len)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| AppError::from_db(e, TABLE))?
            .ok_or_else(|| AppError::NotFound(format!("Document not found: {}", id)))?;

        decode_chunk(&row)
    }
}

/// Decode a chunk column value by its actual storage class. A binary blob
/// passes through; a textual value holds hex (optionally `\x`-prefixed)
/// from a legacy row and is decoded. Anything else aborts the delivery.
/// The blob decoder also accepts text, so the branch must be on the type,
/// not on decode success.
fn decode_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<Vec<u8>> {
    let value = row.try_get_raw("chunk")?;

    match value.type_info().name() {
        "BLOB" => Ok(row.try_get::<Vec<u8>, _>("chunk")?),
        // substr of a NULL data column is NULL; deliver it as empty.
        "NULL" => Ok(Vec::new()),
        "TEXT" => {
            let text: String = row.try_get("chunk")?;
            let hex_str = text.strip_prefix("\\x").unwrap_or(&text);
            hex::decode(hex_str).map_err(|_| {
                AppError::Internal("Malformed chunk value returned by the database".to_string())
            })
        }
        _ => Err(AppError::Internal(
            "Malformed chunk value returned by the database".to_string(),
        )),
    }
}

//! Chunked BLOB-to-HTTP delivery stream
//!
//! The body is a pull-based stream: the transport polls for the next chunk
//! only after it has accepted the previous one, so a slow client suspends
//! further database reads and peak memory stays at one window regardless of
//! document size. Within one delivery, windows are fetched strictly in
//! increasing offset order.

use async_stream::try_stream;
use axum::body::Bytes;
use futures::Stream;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

use crate::db::{DocumentRepository, CHUNK_WINDOW};
use crate::error::AppError;

use super::cache::CacheWriter;

const FILE_READ_BUF: usize = 64 * 1024;

/// Stream a document's bytes from the BLOB table in 1 MiB windows,
/// writing through to the cache. The writer commits only after the final
/// window; dropping the stream early aborts it and removes the temp file.
pub fn document_stream(
    pool: SqlitePool,
    id: String,
    size: i64,
    mut writer: CacheWriter,
) -> impl Stream<Item = Result<Bytes, AppError>> {
    try_stream! {
        let repo = DocumentRepository::new(&pool);
        let mut offset: i64 = 1;

        while offset <= size {
            // Last window is clamped so it never overruns the recorded size.
            let len = CHUNK_WINDOW.min(size - offset + 1);
            let chunk = repo.chunk(&id, offset, len).await?;

            if !chunk.is_empty() {
                writer.write(&chunk).await?;
            }

            offset += CHUNK_WINDOW;
            yield Bytes::from(chunk);
        }

        writer.commit().await?;
    }
}

/// Stream a committed cache file from disk (fast path, no BLOB access).
pub fn cached_file_stream(path: PathBuf) -> impl Stream<Item = Result<Bytes, AppError>> {
    try_stream! {
        let mut file = tokio::fs::File::open(&path).await?;
        let mut buf = vec![0u8; FILE_READ_BUF];

        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            yield Bytes::copy_from_slice(&buf[..n]);
        }
    }
}

/// Sanitize a stored filename for a Content-Disposition header:
/// CR/LF stripped, double quotes replaced with single quotes, capped at
/// 180 characters.
pub fn sanitize_disposition_filename(filename: &str) -> String {
    let name = if filename.is_empty() {
        "document.pdf"
    } else {
        filename
    };

    name.chars()
        .map(|c| match c {
            '\r' | '\n' => ' ',
            '"' => '\'',
            other => other,
        })
        .take(180)
        .collect()
}

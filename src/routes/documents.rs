//! Document delivery endpoints
//!
//! - `POST /documents/upload` - store a PDF in the BLOB table
//! - `GET /documents/:id` - stream the PDF, write-through to the disk cache
//! - `GET /documents/:id/meta` - metadata without the bytes

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};

use crate::db::{DocumentMeta, DocumentRepository};
use crate::documents::{
    cached_file_stream, document_stream, sanitize_disposition_filename, MAX_PDF_BYTES,
};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the documents router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_document))
        .route("/:id", get(serve_document))
        .route("/:id/meta", get(document_meta))
        // Body limit leaves headroom for multipart framing around a 10MB PDF.
        .layer(DefaultBodyLimit::max(MAX_PDF_BYTES + 1024 * 1024))
}

/// POST /documents/upload
///
/// Standalone PDF upload; returns the stored document's metadata row.
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentMeta>)> {
    let mut pdf: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("pdfFile") {
            if field.content_type() != Some("application/pdf") {
                return Err(AppError::InvalidInput(
                    "Only PDF files are allowed".to_string(),
                ));
            }
            let filename = field
                .file_name()
                .unwrap_or("document.pdf")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read PDF field: {}", e)))?;
            pdf = Some((filename, bytes.to_vec()));
        }
    }

    let (filename, bytes) =
        pdf.ok_or_else(|| AppError::InvalidInput("PDF file is required".to_string()))?;
    if bytes.len() > MAX_PDF_BYTES {
        return Err(AppError::InvalidInput(
            "PDF size must be less than 10MB".to_string(),
        ));
    }

    let meta = DocumentRepository::new(state.db())
        .insert(&filename, "application/pdf", &bytes)
        .await?;

    Ok((StatusCode::CREATED, Json(meta)))
}

/// GET /documents/:id/meta
async fn document_meta(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentMeta>> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::InvalidInput("Document id is required".to_string()));
    }

    let meta = DocumentRepository::new(state.db())
        .meta(id)
        .await?
        .ok_or_else(|| AppError::NotFound("PDF not found".to_string()))?;

    Ok(Json(meta))
}

/// GET /documents/:id
///
/// Fast path serves a committed cache file with no BLOB access. Otherwise
/// the metadata row sizes the headers, and the body streams 1 MiB windows
/// from the BLOB while writing through to the cache. Headers go out before
/// the first window, so a failure mid-stream can only end the stream.
async fn serve_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(AppError::InvalidInput("Document id is required".to_string()));
    }

    if let Some(path) = state.cache().lookup(&id).await {
        tracing::debug!(document_id = %id, "Serving PDF from cache");
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/pdf")
            .header(header::CONTENT_DISPOSITION, "inline")
            .body(Body::from_stream(cached_file_stream(path)))
            .map_err(|e| AppError::Internal(e.to_string()));
    }

    let meta = DocumentRepository::new(state.db())
        .meta(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("PDF not found".to_string()))?;

    let writer = state.cache().begin_write(&id).await?;
    let stream = document_stream(state.db().clone(), id, meta.size, writer);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "inline; filename=\"{}\"",
                sanitize_disposition_filename(&meta.filename)
            ),
        )
        .header(header::CONTENT_LENGTH, meta.size)
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use axum::body::to_bytes;
    use axum::http::Request;
    use axum::response::IntoResponse;
    use tower::ServiceExt;

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn multipart_pdf_body(boundary: &str, filename: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"pdfFile\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        body
    }

    #[tokio::test]
    async fn test_upload_then_stream_round_trip() {
        let (state, _dir) = test_state().await;
        let app = router().with_state(state.clone());

        let data: Vec<u8> = (0..300_000usize).map(|i| (i % 256) as u8).collect();
        let boundary = "test-boundary";
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(multipart_pdf_body(boundary, "exam.pdf", &data)))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let meta: DocumentMeta =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(meta.size, data.len() as i64);
        assert_eq!(meta.filename, "exam.pdf");

        let response = serve_document(State(state.clone()), Path(meta.id.clone()))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .unwrap(),
            "inline; filename=\"exam.pdf\""
        );
        assert_eq!(
            response.headers().get(header::CONTENT_LENGTH).unwrap(),
            &data.len().to_string()
        );
        assert_eq!(body_bytes(response).await, data);
    }

    #[tokio::test]
    async fn test_second_request_is_served_without_the_blob_table() {
        let (state, _dir) = test_state().await;

        let data: Vec<u8> = (0..100_000usize).map(|i| (i % 251) as u8).collect();
        let meta = DocumentRepository::new(state.db())
            .insert("report.pdf", "application/pdf", &data)
            .await
            .unwrap();

        // Cold request populates the cache.
        let response = serve_document(State(state.clone()), Path(meta.id.clone()))
            .await
            .unwrap();
        assert_eq!(body_bytes(response).await, data);
        assert!(state.cache().lookup(&meta.id).await.is_some());

        // Drop the BLOB table entirely; the cached copy must carry the
        // second request on its own.
        sqlx::query("DROP TABLE documents")
            .execute(state.db())
            .await
            .unwrap();

        let response = serve_document(State(state.clone()), Path(meta.id.clone()))
            .await
            .unwrap();
        assert_eq!(body_bytes(response).await, data);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (state, _dir) = test_state().await;

        let err = serve_document(State(state.clone()), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = document_meta(State(state), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_meta_endpoint_returns_row_without_bytes() {
        let (state, _dir) = test_state().await;

        let meta = DocumentRepository::new(state.db())
            .insert("syllabus.pdf", "application/pdf", b"%PDF-1.4 tiny")
            .await
            .unwrap();

        let Json(fetched) = document_meta(State(state), Path(meta.id.clone()))
            .await
            .unwrap();
        assert_eq!(fetched.id, meta.id);
        assert_eq!(fetched.mimetype, "application/pdf");
        assert_eq!(fetched.size, 13);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf_content_type() {
        let (state, _dir) = test_state().await;
        let app = router().with_state(state.clone());

        let boundary = "test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"pdfFile\"; filename=\"x.txt\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: text/plain\r\n\r\nnot a pdf\r\n");
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(state.db())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_schema_missing_surfaces_remediation_error() {
        let (state, _dir) = test_state().await;
        sqlx::query("DROP TABLE documents")
            .execute(state.db())
            .await
            .unwrap();

        let err = serve_document(State(state), Path("any-id".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SchemaMissing("documents")));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_bytes(response).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "schema_missing");
        assert!(json["message"].as_str().unwrap().contains("documents"));
    }
}

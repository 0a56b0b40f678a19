//! Upload ingestion
//!
//! Two upload shapes share one entry point: a multipart PDF-plus-thumbnail
//! announcement and a plain data-URI image. All validation happens before
//! any storage mutation, so a rejected upload leaves no row and no file.

use axum::body::Bytes;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

use crate::db::DocumentRepository;
use crate::error::{AppError, Result};

/// Upload ceiling for PDF documents: 10 MiB.
pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;

/// Upload ceiling for images (thumbnails and data-URI uploads): 5 MiB.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// One part of a multipart upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub filename: Option<String>,
    pub mimetype: Option<String>,
    pub bytes: Bytes,
}

/// Multipart PDF announcement upload.
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub caption: String,
    pub pdf: FilePart,
    pub thumbnail: FilePart,
}

/// Data-URI encoded image upload.
#[derive(Debug, Clone)]
pub struct DataUriImage {
    pub data_uri: String,
}

/// The two upload shapes accepted by the ingestor.
#[derive(Debug, Clone)]
pub enum UploadKind {
    Image(DataUriImage),
    PdfWithThumbnail(PdfUpload),
}

/// Result of an accepted upload.
#[derive(Debug, Clone)]
pub struct Accepted {
    /// Value for the post's media field: a plain URL for images, the
    /// composite `"<docUrl>|<thumbUrl>"` for PDF uploads.
    pub image_url: String,
    pub document_id: Option<String>,
}

/// Upload ingestor: one BLOB insert and/or one filesystem write per
/// accepted upload, zero mutation of existing rows.
pub struct Ingestor<'a> {
    pool: &'a SqlitePool,
    upload_dir: &'a Path,
    base_url: &'a str,
}

impl<'a> Ingestor<'a> {
    pub fn new(pool: &'a SqlitePool, upload_dir: &'a Path, base_url: &'a str) -> Self {
        Self {
            pool,
            upload_dir,
            base_url,
        }
    }

    pub async fn accept(&self, kind: UploadKind) -> Result<Accepted> {
        match kind {
            UploadKind::Image(image) => self.accept_image(image).await,
            UploadKind::PdfWithThumbnail(upload) => self.accept_pdf(upload).await,
        }
    }

    async fn accept_pdf(&self, upload: PdfUpload) -> Result<Accepted> {
        if upload.caption.trim().is_empty() {
            return Err(AppError::InvalidInput("Caption is required".to_string()));
        }
        if upload.pdf.bytes.is_empty() {
            return Err(AppError::InvalidInput("PDF file is required".to_string()));
        }
        if upload.pdf.mimetype.as_deref() != Some("application/pdf") {
            return Err(AppError::InvalidInput(
                "Only PDF files are allowed".to_string(),
            ));
        }
        if upload.pdf.bytes.len() > MAX_PDF_BYTES {
            return Err(AppError::InvalidInput(
                "PDF size must be less than 10MB".to_string(),
            ));
        }
        if upload.thumbnail.bytes.is_empty() {
            return Err(AppError::InvalidInput(
                "Thumbnail image is required".to_string(),
            ));
        }
        let thumb_mime = upload.thumbnail.mimetype.as_deref().unwrap_or("");
        if !thumb_mime.starts_with("image/") {
            return Err(AppError::InvalidInput(
                "Thumbnail must be an image file".to_string(),
            ));
        }
        if upload.thumbnail.bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::InvalidInput(
                "Thumbnail size must be less than 5MB".to_string(),
            ));
        }

        let pdf_name = upload.pdf.filename.as_deref().unwrap_or("document.pdf");
        let meta = DocumentRepository::new(self.pool)
            .insert(pdf_name, "application/pdf", &upload.pdf.bytes)
            .await?;

        let thumb_name = unique_upload_name(
            upload.thumbnail.filename.as_deref().unwrap_or("thumbnail"),
        );
        tokio::fs::write(self.upload_dir.join(&thumb_name), &upload.thumbnail.bytes).await?;

        tracing::info!(
            document_id = %meta.id,
            size = meta.size,
            thumbnail = %thumb_name,
            "Accepted PDF upload"
        );

        Ok(Accepted {
            image_url: format!(
                "{}/documents/{}|{}/uploads/{}",
                self.base_url, meta.id, self.base_url, thumb_name
            ),
            document_id: Some(meta.id),
        })
    }

    async fn accept_image(&self, image: DataUriImage) -> Result<Accepted> {
        let (mimetype, payload) = parse_data_uri(&image.data_uri)?;
        if !mimetype.starts_with("image/") {
            return Err(AppError::InvalidInput(
                "Only image uploads are allowed".to_string(),
            ));
        }

        let decoded = BASE64
            .decode(payload)
            .map_err(|_| AppError::InvalidInput("Invalid base64 image data".to_string()))?;
        if decoded.len() > MAX_IMAGE_BYTES {
            return Err(AppError::InvalidInput(
                "Image size must be less than 5MB".to_string(),
            ));
        }

        let ext = extension_for_mime(&mimetype);
        let name = unique_upload_name(&format!("image.{}", ext));
        tokio::fs::write(self.upload_dir.join(&name), &decoded).await?;

        Ok(Accepted {
            image_url: format!("{}/uploads/{}", self.base_url, name),
            document_id: None,
        })
    }
}

/// Split a `data:<mime>;base64,<payload>` URI into its mime and payload.
fn parse_data_uri(uri: &str) -> Result<(String, &str)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| AppError::InvalidInput("Expected a data URI".to_string()))?;
    let (mimetype, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| AppError::InvalidInput("Expected base64-encoded data".to_string()))?;

    Ok((mimetype.to_string(), payload))
}

/// Map an image mime type to a file extension; unknown types get `bin`.
fn extension_for_mime(mimetype: &str) -> &'static str {
    match mimetype {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Build a collision-free upload filename: the original name reduced to a
/// safe character set, plus a timestamp and random suffix.
fn unique_upload_name(original: &str) -> String {
    let sanitized: String = original
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect();

    let (stem, ext) = match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem.to_string(), Some(ext.to_string()))
        }
        _ => (sanitized, None),
    };

    let suffix = Uuid::new_v4().simple().to_string();
    let name = format!("{}-{}-{}", stem, Utc::now().timestamp_millis(), &suffix[..8]);

    match ext {
        Some(ext) => format!("{}.{}", name, ext),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use tempfile::tempdir;

    const BASE: &str = "http://localhost:3000";

    async fn document_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn pdf_part(len: usize) -> FilePart {
        FilePart {
            filename: Some("Midterm Schedule.pdf".to_string()),
            mimetype: Some("application/pdf".to_string()),
            bytes: Bytes::from(vec![0x25u8; len]),
        }
    }

    fn png_part(len: usize) -> FilePart {
        FilePart {
            filename: Some("thumb.png".to_string()),
            mimetype: Some("image/png".to_string()),
            bytes: Bytes::from(vec![0x89u8; len]),
        }
    }

    fn pdf_upload(caption: &str, pdf: FilePart, thumbnail: FilePart) -> UploadKind {
        UploadKind::PdfWithThumbnail(PdfUpload {
            caption: caption.to_string(),
            pdf,
            thumbnail,
        })
    }

    #[tokio::test]
    async fn test_accepts_pdf_with_thumbnail() {
        let pool = test_pool().await;
        let dir = tempdir().unwrap();
        let ingestor = Ingestor::new(&pool, dir.path(), BASE);

        let accepted = ingestor
            .accept(pdf_upload(
                "Midterm Schedule",
                pdf_part(3 * 1024 * 1024),
                png_part(200 * 1024),
            ))
            .await
            .unwrap();

        let doc_id = accepted.document_id.unwrap();
        assert!(!doc_id.is_empty());
        assert!(accepted
            .image_url
            .starts_with(&format!("{}/documents/{}|{}/uploads/", BASE, doc_id, BASE)));
        assert!(accepted.image_url.ends_with(".png"));

        // One BLOB insert and one thumbnail on disk.
        assert_eq!(document_count(&pool).await, 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_blank_caption_before_any_write() {
        let pool = test_pool().await;
        let dir = tempdir().unwrap();
        let ingestor = Ingestor::new(&pool, dir.path(), BASE);

        let err = ingestor
            .accept(pdf_upload("   ", pdf_part(100), png_part(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(document_count(&pool).await, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_oversized_pdf_before_insert() {
        let pool = test_pool().await;
        let dir = tempdir().unwrap();
        let ingestor = Ingestor::new(&pool, dir.path(), BASE);

        let err = ingestor
            .accept(pdf_upload(
                "Too big",
                pdf_part(11 * 1024 * 1024),
                png_part(100),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(document_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_rejects_wrong_mime_types() {
        let pool = test_pool().await;
        let dir = tempdir().unwrap();
        let ingestor = Ingestor::new(&pool, dir.path(), BASE);

        let mut not_pdf = pdf_part(100);
        not_pdf.mimetype = Some("text/plain".to_string());
        let err = ingestor
            .accept(pdf_upload("Caption", not_pdf, png_part(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let mut not_image = png_part(100);
        not_image.mimetype = Some("application/zip".to_string());
        let err = ingestor
            .accept(pdf_upload("Caption", pdf_part(100), not_image))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        assert_eq!(document_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_rejects_oversized_thumbnail() {
        let pool = test_pool().await;
        let dir = tempdir().unwrap();
        let ingestor = Ingestor::new(&pool, dir.path(), BASE);

        let err = ingestor
            .accept(pdf_upload(
                "Caption",
                pdf_part(100),
                png_part(6 * 1024 * 1024),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(document_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_accepts_data_uri_image() {
        let pool = test_pool().await;
        let dir = tempdir().unwrap();
        let ingestor = Ingestor::new(&pool, dir.path(), BASE);

        let payload = BASE64.encode(b"fake png bytes");
        let accepted = ingestor
            .accept(UploadKind::Image(DataUriImage {
                data_uri: format!("data:image/png;base64,{}", payload),
            }))
            .await
            .unwrap();

        assert!(accepted.document_id.is_none());
        assert!(accepted.image_url.starts_with(&format!("{}/uploads/", BASE)));
        assert!(accepted.image_url.ends_with(".png"));
        assert_eq!(document_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_rejects_non_image_data_uri() {
        let pool = test_pool().await;
        let dir = tempdir().unwrap();
        let ingestor = Ingestor::new(&pool, dir.path(), BASE);

        let payload = BASE64.encode(b"%PDF-1.4");
        let err = ingestor
            .accept(UploadKind::Image(DataUriImage {
                data_uri: format!("data:application/pdf;base64,{}", payload),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_oversized_decoded_image() {
        let pool = test_pool().await;
        let dir = tempdir().unwrap();
        let ingestor = Ingestor::new(&pool, dir.path(), BASE);

        let payload = BASE64.encode(vec![0u8; MAX_IMAGE_BYTES + 1]);
        let err = ingestor
            .accept(UploadKind::Image(DataUriImage {
                data_uri: format!("data:image/jpeg;base64,{}", payload),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_unique_upload_name_sanitizes() {
        let name = unique_upload_name("my thumb (v2).png");
        assert!(name.starts_with("my_thumb__v2_-"));
        assert!(name.ends_with(".png"));

        let other = unique_upload_name("my thumb (v2).png");
        assert_ne!(name, other);
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("image/webp"), "webp");
        assert_eq!(extension_for_mime("image/gif"), "gif");
        assert_eq!(extension_for_mime("image/tiff"), "bin");
    }
}

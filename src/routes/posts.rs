//! Post endpoints
//!
//! List endpoints apply the media size gating projection to every row;
//! the detail endpoint applies the larger detail ceiling. Department
//! scoping arrives as request parameters (authentication is out of scope).

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{NewPost, Post, PostRepository};
use crate::documents::{
    DataUriImage, FilePart, Ingestor, PdfUpload, UploadKind, MAX_IMAGE_BYTES, MAX_PDF_BYTES,
};
use crate::error::{AppError, Result};
use crate::media::{clamp_limit, clamp_offset, gate_for_detail, gate_for_list};
use crate::state::AppState;

/// Create the posts router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(department_feed).post(create_post))
        .route("/public", get(public_feed))
        .route("/upload", post(upload_post))
        .route("/upload-image", post(upload_image))
        .route("/:id", get(get_post).delete(delete_post))
        .layer(DefaultBodyLimit::max(
            MAX_PDF_BYTES + MAX_IMAGE_BYTES + 1024 * 1024,
        ))
}

/// List query parameters; limit/offset arrive as raw strings so that
/// unusable values clamp to defaults instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub department_id: Option<String>,
}

/// Post row shaped for a list response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListItem {
    pub id: String,
    pub department_id: String,
    pub admin_name: Option<String>,
    pub caption: String,
    pub image_url: String,
    pub has_media: bool,
    pub created_at: String,
}

/// Post row shaped for the detail response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub id: String,
    pub department_id: String,
    pub admin_name: Option<String>,
    pub caption: String,
    pub image_url: String,
    pub media_too_large: bool,
    pub created_at: String,
}

fn to_list_item(post: Post) -> PostListItem {
    let gated = gate_for_list(post.image_url.as_deref());
    PostListItem {
        id: post.id,
        department_id: post.department_id,
        admin_name: post.admin_name,
        caption: post.caption,
        image_url: gated.image_url,
        has_media: gated.has_media,
        created_at: post.created_at,
    }
}

/// GET /posts?departmentId=...&limit=...&offset=...
async fn department_feed(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PostListItem>>> {
    let department_id = query
        .department_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidInput("departmentId is required".to_string()))?;

    let posts = PostRepository::new(state.db())
        .list_department(
            department_id,
            clamp_limit(query.limit.as_deref()),
            clamp_offset(query.offset.as_deref()),
        )
        .await?;

    Ok(Json(posts.into_iter().map(to_list_item).collect()))
}

/// GET /posts/public?departmentId=...&limit=...&offset=...
async fn public_feed(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PostListItem>>> {
    let posts = PostRepository::new(state.db())
        .list_public(
            query.department_id.as_deref().filter(|s| !s.is_empty()),
            clamp_limit(query.limit.as_deref()),
            clamp_offset(query.offset.as_deref()),
        )
        .await?;

    Ok(Json(posts.into_iter().map(to_list_item).collect()))
}

/// GET /posts/:id
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostDetail>> {
    let post = PostRepository::new(state.db())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let detail = gate_for_detail(post.image_url.as_deref());

    Ok(Json(PostDetail {
        id: post.id,
        department_id: post.department_id,
        admin_name: post.admin_name,
        caption: post.caption,
        image_url: detail.image_url,
        media_too_large: detail.media_too_large,
        created_at: post.created_at,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub caption: String,
    pub image_url: Option<String>,
    pub department_id: String,
    pub admin_name: Option<String>,
}

/// POST /posts
async fn create_post(
    State(state): State<AppState>,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    if request.caption.trim().is_empty() {
        return Err(AppError::InvalidInput("Caption is required".to_string()));
    }
    if request.department_id.trim().is_empty() {
        return Err(AppError::InvalidInput("departmentId is required".to_string()));
    }

    let post = PostRepository::new(state.db())
        .insert(NewPost {
            department_id: &request.department_id,
            admin_name: request.admin_name.as_deref(),
            caption: &request.caption,
            image_url: request.image_url.as_deref(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(rename = "departmentId")]
    pub department_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// DELETE /posts/:id?departmentId=...
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>> {
    let deleted = PostRepository::new(state.db())
        .delete(&id, &query.department_id)
        .await?;

    if !deleted {
        return Err(AppError::NotFound(
            "Post not found or unauthorized".to_string(),
        ));
    }

    Ok(Json(DeleteResponse {
        message: "Post deleted successfully",
    }))
}

/// Response for the PDF announcement upload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPostResponse {
    pub document_id: String,
    pub post: Post,
}

async fn read_file_part(field: Field<'_>) -> Result<FilePart> {
    let filename = field.file_name().map(str::to_string);
    let mimetype = field.content_type().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read upload field: {}", e)))?;

    Ok(FilePart {
        filename,
        mimetype,
        bytes,
    })
}

fn missing_part() -> FilePart {
    FilePart {
        filename: None,
        mimetype: None,
        bytes: axum::body::Bytes::new(),
    }
}

/// POST /posts/upload
///
/// Multipart `caption` + `pdfFile` + `thumbnail` (+ `departmentId`,
/// optional `adminName`). On acceptance the PDF lands in the BLOB table,
/// the thumbnail on disk, and the new post row carries the composite
/// reference.
async fn upload_post(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadPostResponse>)> {
    let mut caption = String::new();
    let mut department_id: Option<String> = None;
    let mut admin_name: Option<String> = None;
    let mut pdf: Option<FilePart> = None;
    let mut thumbnail: Option<FilePart> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("caption") => {
                caption = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read caption: {}", e))
                })?;
            }
            Some("departmentId") => {
                department_id = Some(field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read departmentId: {}", e))
                })?);
            }
            Some("adminName") => {
                admin_name = Some(field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read adminName: {}", e))
                })?);
            }
            Some("pdfFile") => pdf = Some(read_file_part(field).await?),
            Some("thumbnail") => thumbnail = Some(read_file_part(field).await?),
            _ => {}
        }
    }

    let department_id = department_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("departmentId is required".to_string()))?;

    let ingestor = Ingestor::new(
        state.db(),
        &state.config().storage.upload_dir,
        state.base_url(),
    );
    let accepted = ingestor
        .accept(UploadKind::PdfWithThumbnail(PdfUpload {
            caption: caption.clone(),
            pdf: pdf.unwrap_or_else(missing_part),
            thumbnail: thumbnail.unwrap_or_else(missing_part),
        }))
        .await?;

    let post = PostRepository::new(state.db())
        .insert(NewPost {
            department_id: &department_id,
            admin_name: admin_name.as_deref(),
            caption: &caption,
            image_url: Some(&accepted.image_url),
        })
        .await?;

    let document_id = accepted
        .document_id
        .ok_or_else(|| AppError::Internal("PDF upload produced no document id".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(UploadPostResponse { document_id, post }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UploadImageRequest {
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadImageResponse {
    pub url: String,
}

/// POST /posts/upload-image
///
/// Plain data-URI image upload; returns the static URL for the stored file.
async fn upload_image(
    State(state): State<AppState>,
    Json(request): Json<UploadImageRequest>,
) -> Result<Json<UploadImageResponse>> {
    let ingestor = Ingestor::new(
        state.db(),
        &state.config().storage.upload_dir,
        state.base_url(),
    );
    let accepted = ingestor
        .accept(UploadKind::Image(DataUriImage {
            data_uri: request.image,
        }))
        .await?;

    Ok(Json(UploadImageResponse {
        url: accepted.image_url,
    }))
}

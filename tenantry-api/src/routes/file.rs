/// Upload endpoints
///
/// - `POST /user/file/upload` - One file in the `file` field
/// - `POST /user/file/upload/multiple` - Up to `FILE_MAX_FILES` in `files`
///
/// Every file in a request is checked (count, size, mime) before any of
/// them is written, so a rejected request stores nothing.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::HeaderMap,
    Extension,
};
use bytes::Bytes;
use tenantry_shared::{
    auth::middleware::AuthContext,
    file::{part_number, store_file, FileError, FileLimits, StoredFile},
};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};

/// A multipart field held in memory until every check passes
struct Upload {
    mime: String,
    bytes: Bytes,
}

/// Reads every field called `field_name`, ignoring other fields
async fn collect_uploads(
    multipart: &mut Multipart,
    field_name: &str,
    limits: &FileLimits,
) -> ApiResult<Vec<Upload>> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }

        if uploads.len() >= limits.max_files {
            return Err(FileError::MaxFiles {
                max: limits.max_files,
            }
            .into());
        }

        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?;

        limits.check_size(bytes.len() as u64)?;
        uploads.push(Upload { mime, bytes });
    }

    Ok(uploads)
}

async fn store_all(
    state: &AppState,
    auth: &AuthContext,
    headers: &HeaderMap,
    uploads: Vec<Upload>,
    limits: &FileLimits,
) -> ApiResult<Vec<StoredFile>> {
    limits.check_count(uploads.len())?;

    let extensions = uploads
        .iter()
        .map(|upload| limits.extension_for(&upload.mime).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;

    let part = part_number(headers);
    let mut stored = Vec::with_capacity(uploads.len());

    for (upload, extension) in uploads.iter().zip(extensions) {
        let file = store_file(
            &state.config.file.upload_dir,
            auth.user_id,
            &extension,
            &upload.mime,
            &upload.bytes,
            part,
        )
        .await?;
        stored.push(file);
    }

    tracing::info!(user_id = %auth.user_id, count = stored.len(), "Stored uploads");

    Ok(stored)
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiResponse<StoredFile>> {
    let mut multipart = multipart?;
    let limits = FileLimits {
        max_files: 1,
        ..(*state.file_limits).clone()
    };

    let uploads = collect_uploads(&mut multipart, "file", &limits).await?;
    let stored = store_all(&state, &auth, &headers, uploads, &limits).await?;

    let file = stored
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::from(FileError::Required))?;

    Ok(ApiResponse::ok("file.upload", file))
}

pub async fn upload_multiple(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiResponse<Vec<StoredFile>>> {
    let mut multipart = multipart?;
    let limits = state.file_limits.clone();

    let uploads = collect_uploads(&mut multipart, "files", &limits).await?;
    let stored = store_all(&state, &auth, &headers, uploads, &limits).await?;

    Ok(ApiResponse::ok("file.upload", stored))
}

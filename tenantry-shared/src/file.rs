/// Upload limits and local file storage
///
/// Uploads are checked against [`FileLimits`] before anything touches the
/// disk, then written to `<upload_dir>/<user_id>/<uuid>.<ext>`.

use std::path::{Path, PathBuf};

use axum::http::HeaderMap;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Header naming the chunk index of a multipart upload
pub const PART_NUMBER_HEADER: &str = "x-part-number";

/// Mime types accepted by default, with the extension files are stored under
pub const DEFAULT_ALLOWED_MIMES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("application/pdf", "pdf"),
    ("text/csv", "csv"),
    ("application/vnd.ms-excel", "xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    ("audio/mpeg", "mp3"),
    ("video/mp4", "mp4"),
];

/// Error type for upload checks and storage
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("File is required")]
    Required,

    #[error("Too many files, at most {max} allowed")]
    MaxFiles { max: usize },

    #[error("File exceeds {max} bytes")]
    MaxSize { max: u64 },

    #[error("Mime type {mime} is not allowed")]
    MimeInvalid { mime: String },

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Failed to store file: {0}")]
    Storage(#[from] std::io::Error),
}

/// Parses a size string such as `10mb`, `512kb` or `1024`
///
/// Units `b`, `kb`, `mb` and `gb` are binary multiples and case-insensitive.
/// A bare number is bytes.
pub fn parse_size(raw: &str) -> Result<u64, FileError> {
    let normalized = raw.trim().to_ascii_lowercase();
    let split = normalized
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(normalized.len());
    let (number, unit) = normalized.split_at(split);

    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "kb" => 1024,
        "mb" => 1024 * 1024,
        "gb" => 1024 * 1024 * 1024,
        _ => return Err(FileError::InvalidSize(raw.to_string())),
    };

    number
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| FileError::InvalidSize(raw.to_string()))
}

/// Per-request upload limits
#[derive(Debug, Clone)]
pub struct FileLimits {
    /// Largest accepted file, in bytes
    pub max_size: u64,

    /// Most files accepted by a multiple upload
    pub max_files: usize,

    /// `(mime, extension)` pairs
    pub allowed_mimes: Vec<(String, String)>,
}

impl FileLimits {
    pub fn new(max_size: u64, max_files: usize) -> Self {
        Self {
            max_size,
            max_files,
            allowed_mimes: DEFAULT_ALLOWED_MIMES
                .iter()
                .map(|(mime, ext)| (mime.to_string(), ext.to_string()))
                .collect(),
        }
    }

    pub fn check_count(&self, count: usize) -> Result<(), FileError> {
        match count {
            0 => Err(FileError::Required),
            n if n > self.max_files => Err(FileError::MaxFiles {
                max: self.max_files,
            }),
            _ => Ok(()),
        }
    }

    pub fn check_size(&self, size: u64) -> Result<(), FileError> {
        if size > self.max_size {
            return Err(FileError::MaxSize { max: self.max_size });
        }
        Ok(())
    }

    /// Returns the storage extension for an allowed mime type
    pub fn extension_for(&self, mime: &str) -> Result<&str, FileError> {
        let mime = mime.trim().to_ascii_lowercase();

        self.allowed_mimes
            .iter()
            .find(|(allowed, _)| *allowed == mime)
            .map(|(_, ext)| ext.as_str())
            .ok_or(FileError::MimeInvalid { mime })
    }
}

/// `x-part-number` as an integer, 0 when absent or unparsable
pub fn part_number(headers: &HeaderMap) -> i64 {
    headers
        .get(PART_NUMBER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Result of a stored upload
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub filename: String,
    pub path: String,
    pub size: u64,
    pub mime: String,
    pub part_number: i64,
}

/// Writes an upload for `user_id` under `upload_dir`
///
/// The stored name is a fresh UUID, so the client's file name never reaches
/// the filesystem.
pub async fn store_file(
    upload_dir: &Path,
    user_id: Uuid,
    extension: &str,
    mime: &str,
    bytes: &[u8],
    part_number: i64,
) -> Result<StoredFile, FileError> {
    let dir: PathBuf = upload_dir.join(user_id.to_string());
    tokio::fs::create_dir_all(&dir).await?;

    let filename = format!("{}.{}", Uuid::new_v4(), extension);
    let path = dir.join(&filename);
    tokio::fs::write(&path, bytes).await?;

    debug!(path = %path.display(), size = bytes.len(), "Stored upload");

    Ok(StoredFile {
        filename,
        path: path.to_string_lossy().into_owned(),
        size: bytes.len() as u64,
        mime: mime.to_string(),
        part_number,
    })
}

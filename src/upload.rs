//! Image uploads: extension and content-type allow-lists, size cap, randomized names.

use crate::error::AppError;
use axum::body::Bytes;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};

/// 5 MiB.
pub const MAX_UPLOAD_SIZE: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const ALLOWED_MIMES: &[&str] = &["image/jpg", "image/jpeg", "image/png"];
const PREFIX_LEN: usize = 5;

/// A file field received with a multipart form.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    /// Type declared by the client; not trusted.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// MIME type sniffed from the file contents.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Extension of `dest` and the sniffed content type must both be allowed.
pub fn valid_file_type(file: &UploadedFile, dest: &Path) -> bool {
    let ext_ok = dest
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e))
        .unwrap_or(false);
    let mime_ok = sniff_mime(&file.bytes)
        .map(|m| ALLOWED_MIMES.contains(&m))
        .unwrap_or(false);
    ext_ok && mime_ok
}

fn random_prefix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PREFIX_LEN)
        .map(char::from)
        .collect()
}

/// Store an accepted file under `upload_dir` as `<random><basename>` and return its path.
/// Files that are too large or of a disallowed type are rejected with `Ok(None)`.
pub async fn handle_upload(file: &UploadedFile, upload_dir: &Path) -> Result<Option<PathBuf>, AppError> {
    let base = Path::new(&file.file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("upload has no file name".into()))?;
    let dest = upload_dir.join(format!("{}{}", random_prefix(), base));

    if file.bytes.len() > MAX_UPLOAD_SIZE {
        tracing::info!(file = %base, size = file.bytes.len(), "upload rejected: too large");
        return Ok(None);
    }
    if !valid_file_type(file, &dest) {
        tracing::info!(file = %base, declared = ?file.content_type, "upload rejected: type not allowed");
        return Ok(None);
    }

    tokio::fs::create_dir_all(upload_dir).await?;
    tokio::fs::write(&dest, &file.bytes).await?;
    tracing::info!(path = %dest.display(), "upload stored");
    Ok(Some(dest))
}

//! Shared handler types and upload parsing.

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use serde::Deserialize;

use super::super::{AppError, AppResult};

/// Common `?limit=&offset=` parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// Collect the file parts of a multipart body. Parts without a file name are
/// ignored; each file may be at most `max_file_bytes`.
pub async fn read_files(
    mut multipart: Multipart,
    max_file_bytes: usize,
) -> AppResult<Vec<Vec<u8>>> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.file_name().is_none() {
            continue;
        }
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > max_file_bytes {
            return Err(AppError::PayloadTooLarge);
        }
        files.push(bytes.to_vec());
    }
    Ok(files)
}

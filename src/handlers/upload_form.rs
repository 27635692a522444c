//! Reading a single named file field out of a multipart form.
//!
//! Both readers enforce their size limit while the body streams in, so an
//! oversized upload is rejected without being held in memory or on disk.

use crate::errors::AppError;
use axum::extract::{Multipart, multipart::MultipartError};
use bytes::{Bytes, BytesMut};
use std::{io, path::Path};
use tempfile::NamedTempFile;
use tokio::{fs::File, io::AsyncWriteExt};

/// A small file buffered in memory.
#[derive(Debug)]
pub struct UploadedFile {
    /// Declared media type of the part, if the client sent one.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A large file streamed to a temp file. The file is removed when `file`
/// is dropped or closed.
#[derive(Debug)]
pub struct SpooledFile {
    pub content_type: Option<String>,
    pub file: NamedTempFile,
    pub size_bytes: u64,
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::bad_request(format!("invalid multipart body: {}", err.body_text()))
}

fn too_large(field: &str, max_bytes: u64) -> AppError {
    AppError::bad_request(format!(
        "`{}` exceeds the maximum size of {}",
        field,
        human_size(max_bytes)
    ))
}

fn spool_failed(err: io::Error) -> AppError {
    AppError::internal(format!("could not spool upload: {}", err))
}

fn missing_field(field: &str) -> AppError {
    AppError::bad_request(format!("form field `{}` is missing", field))
}

fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1 << 20;
    const GIB: u64 = 1 << 30;
    if bytes >= GIB && bytes % GIB == 0 {
        format!("{} GiB", bytes / GIB)
    } else if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Buffer the field called `name`, failing once it grows past `max_bytes`.
/// Other fields are skipped.
pub async fn read_file_field(
    multipart: &mut Multipart,
    name: &str,
    max_bytes: u64,
) -> Result<UploadedFile, AppError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(name) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let mut buf = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if (buf.len() + chunk.len()) as u64 > max_bytes {
                return Err(too_large(name, max_bytes));
            }
            buf.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile {
            content_type,
            bytes: buf.freeze(),
        });
    }

    Err(missing_field(name))
}

/// Stream the field called `name` into a fresh temp file in `dir` named
/// `{prefix}<random>{suffix}`, failing once it grows past `max_bytes`.
pub async fn spool_file_field(
    multipart: &mut Multipart,
    name: &str,
    max_bytes: u64,
    dir: &Path,
    prefix: &str,
    suffix: &str,
) -> Result<SpooledFile, AppError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(name) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);

        tokio::fs::create_dir_all(dir).await.map_err(spool_failed)?;
        let temp = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)
            .map_err(spool_failed)?;
        let mut out = File::from_std(temp.as_file().try_clone().map_err(spool_failed)?);

        let mut size_bytes: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size_bytes += chunk.len() as u64;
            if size_bytes > max_bytes {
                return Err(too_large(name, max_bytes));
            }
            out.write_all(&chunk).await.map_err(spool_failed)?;
        }
        out.flush().await.map_err(spool_failed)?;
        out.sync_all().await.map_err(spool_failed)?;

        tracing::debug!(
            path = %temp.path().display(),
            size_bytes,
            "spooled upload to disk"
        );

        return Ok(SpooledFile {
            content_type,
            file: temp,
            size_bytes,
        });
    }

    Err(missing_field(name))
}

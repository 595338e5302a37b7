//! Whole-form multipart parsing with a bounded in-memory buffer.
//!
//! File parts are held in memory while they fit the form's remaining
//! `max_memory` budget; anything larger is written to a temp file that lives
//! as long as the parsed form.

use crate::api::error::UploadError;
use crate::config::UploadConfig;
use crate::models::FileHeader;
use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use bytes::{Bytes, BytesMut};
use multer::{Constraints, Field, Multipart, SizeLimit};
use std::collections::HashMap;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};

enum FileContent {
    Memory(Bytes),
    Disk(NamedTempFile),
}

/// One file part of a parsed form.
pub struct FormFile {
    header: FileHeader,
    content: FileContent,
}

impl FormFile {
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn filename(&self) -> &str {
        &self.header.filename
    }

    /// True when the part did not fit in memory and was spilled to disk
    pub fn is_spilled(&self) -> bool {
        matches!(self.content, FileContent::Disk(_))
    }

    /// Opens a fresh reader over the part's bytes.
    pub async fn open(&self) -> Result<FormFileReader, UploadError> {
        match &self.content {
            FileContent::Memory(bytes) => Ok(FormFileReader::Memory(Cursor::new(bytes.clone()))),
            FileContent::Disk(tmp) => {
                let file = tokio::fs::File::open(tmp.path())
                    .await
                    .map_err(|e| UploadError::io(tmp.path(), e))?;
                Ok(FormFileReader::Disk(file))
            }
        }
    }
}

impl std::fmt::Debug for FormFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormFile")
            .field("header", &self.header)
            .field("spilled", &self.is_spilled())
            .finish()
    }
}

/// Single-pass reader returned by [`FormFile::open`].
pub enum FormFileReader {
    Memory(Cursor<Bytes>),
    Disk(tokio::fs::File),
}

impl AsyncRead for FormFileReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            FormFileReader::Memory(cursor) => Pin::new(cursor).poll_read(cx, buf),
            FormFileReader::Disk(file) => Pin::new(file).poll_read(cx, buf),
        }
    }
}

/// A fully read multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    values: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<FormFile>>,
}

impl MultipartForm {
    /// Reads the whole request body as `multipart/form-data`.
    pub async fn parse(request: Request, config: &UploadConfig) -> Result<Self, UploadError> {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                UploadError::Parse("request Content-Type isn't multipart/form-data".to_string())
            })?;
        let boundary = multer::parse_boundary(content_type)?;

        let mut limits = SizeLimit::new();
        if let Some(max) = config.max_request_size {
            limits = limits.whole_stream(max);
        }

        let stream = request.into_body().into_data_stream();
        let multipart =
            Multipart::with_constraints(stream, boundary, Constraints::new().size_limit(limits));

        Self::read(multipart, config).await
    }

    async fn read(mut multipart: Multipart<'_>, config: &UploadConfig) -> Result<Self, UploadError> {
        let mut form = MultipartForm::default();
        let mut memory_left = config.max_memory as u64;
        let mut value_bytes_left = config.max_value_bytes as u64;

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            let Some(filename) = field
                .file_name()
                .filter(|n| !n.is_empty())
                .map(str::to_string)
            else {
                let value = read_value(&mut field, &mut value_bytes_left).await?;
                form.values.entry(name).or_default().push(value);
                continue;
            };

            let content_type = field.content_type().cloned();
            let (content, size) = read_file(&mut field, &mut memory_left, config).await?;

            tracing::debug!(
                "Read multipart file {:?} for field {:?} ({} bytes, spilled: {})",
                filename,
                name,
                size,
                matches!(content, FileContent::Disk(_))
            );

            form.files.entry(name).or_default().push(FormFile {
                header: FileHeader {
                    filename,
                    content_type,
                    size,
                },
                content,
            });
        }

        Ok(form)
    }

    /// Files submitted under `field`, in the order they appeared
    pub fn files(&self, field: &str) -> &[FormFile] {
        self.files.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first_file(&self, field: &str) -> Option<&FormFile> {
        self.files(field).first()
    }

    pub fn values(&self, field: &str) -> &[String] {
        self.values.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.values(field).first().map(String::as_str)
    }
}

async fn read_value(field: &mut Field<'_>, budget: &mut u64) -> Result<String, UploadError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
        let len = chunk.len() as u64;
        if len > *budget {
            return Err(UploadError::Parse("multipart: message too large".to_string()));
        }
        *budget -= len;
        buffer.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

async fn read_file(
    field: &mut Field<'_>,
    memory_left: &mut u64,
    config: &UploadConfig,
) -> Result<(FileContent, u64), UploadError> {
    let mut buffer = BytesMut::new();
    let mut spill: Option<(NamedTempFile, tokio::fs::File)> = None;
    let mut size: u64 = 0;

    while let Some(chunk) = field.chunk().await? {
        size += chunk.len() as u64;

        if let Some((tmp, out)) = spill.as_mut() {
            out.write_all(&chunk)
                .await
                .map_err(|e| UploadError::io(tmp.path(), e))?;
        } else if size > *memory_left {
            let (tmp, mut out) = create_spill_file(config.temp_dir.as_deref())?;
            out.write_all(&buffer)
                .await
                .map_err(|e| UploadError::io(tmp.path(), e))?;
            out.write_all(&chunk)
                .await
                .map_err(|e| UploadError::io(tmp.path(), e))?;
            buffer = BytesMut::new();
            spill = Some((tmp, out));
        } else {
            buffer.extend_from_slice(&chunk);
        }
    }

    match spill {
        Some((tmp, mut out)) => {
            out.flush().await.map_err(|e| UploadError::io(tmp.path(), e))?;
            Ok((FileContent::Disk(tmp), size))
        }
        None => {
            *memory_left -= size;
            Ok((FileContent::Memory(buffer.freeze()), size))
        }
    }
}

fn create_spill_file(
    temp_dir: Option<&Path>,
) -> Result<(NamedTempFile, tokio::fs::File), UploadError> {
    let dir = temp_dir.map_or_else(std::env::temp_dir, PathBuf::from);
    let tmp = tempfile::Builder::new()
        .prefix("multipart-")
        .tempfile_in(&dir)
        .map_err(|e| UploadError::io(&dir, e))?;
    let handle = tmp
        .as_file()
        .try_clone()
        .map_err(|e| UploadError::io(tmp.path(), e))?;
    Ok((tmp, tokio::fs::File::from_std(handle)))
}

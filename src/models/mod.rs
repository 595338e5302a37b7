use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A file that has been written to the destination directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadedFile {
    /// Generated name, relative to the directory it was persisted in
    pub filename: String,
}

/// Metadata for one file part of a parsed multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Filename as sent by the client
    pub filename: String,
    pub content_type: Option<mime::Mime>,
    pub size: u64,
}

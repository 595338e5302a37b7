use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    /// Body is not a usable multipart form: wrong content type, bad
    /// framing, or over a configured size limit.
    #[error("Multipart parse error: {0}")]
    Parse(String),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UploadError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        UploadError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Kind of the underlying I/O failure, if this is one
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            UploadError::Io { source, .. } => Some(source.kind()),
            UploadError::Parse(_) => None,
        }
    }
}

impl From<multer::Error> for UploadError {
    fn from(err: multer::Error) -> Self {
        UploadError::Parse(err.to_string())
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            UploadError::Parse(msg) => (StatusCode::BAD_REQUEST, msg),
            UploadError::Io { path, source } => {
                tracing::error!("Upload I/O error at {}: {:?}", path.display(), source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

//! Persists uploaded files to a directory under collision-resistant names.
//!
//! Files come either from a `multipart/form-data` request or from
//! caller-supplied byte streams. Each one is written to
//! `<directory>/<YYYYMMDDhhmmss>_<uuid><ext>` and reported back as an
//! [`UploadedFile`].

pub mod api;
pub mod config;
pub mod models;
pub mod services;

pub use api::error::UploadError;
pub use config::UploadConfig;
pub use models::{FileHeader, UploadedFile};
pub use services::multipart::{FormFile, MultipartForm};
pub use services::naming::{Clock, FilenameGenerator, IdGenerator};
pub use services::source::{UploadInput, UploadSource};
pub use services::upload_service::{
    UploadPipeline, persist_multiple_from_form, persist_multiple_streams, persist_single_from_form,
    persist_single_stream,
};

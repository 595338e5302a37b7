use crate::api::error::UploadError;
use crate::config::UploadConfig;
use crate::models::UploadedFile;
use crate::services::multipart::MultipartForm;
use crate::services::naming::{Clock, FilenameGenerator, IdGenerator, RandomIds, SystemClock};
use crate::services::source::{FormFieldSource, StreamMap, UploadSource};
use crate::services::storage::{ensure_directory, persist};
use axum::extract::Request;
use std::path::Path;
use tokio::io::AsyncRead;

/// Request extraction, directory assurance, naming and persistence, run in
/// sequence for each file.
///
/// Every call is independent. A batch stops at its first error and keeps
/// whatever was persisted before it.
#[derive(Debug, Clone, Default)]
pub struct UploadPipeline<C = SystemClock, I = RandomIds> {
    config: UploadConfig,
    names: FilenameGenerator<C, I>,
}

impl UploadPipeline {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            config,
            names: FilenameGenerator::default(),
        }
    }
}

impl<C: Clock, I: IdGenerator> UploadPipeline<C, I> {
    pub fn with_generator(config: UploadConfig, names: FilenameGenerator<C, I>) -> Self {
        Self { config, names }
    }

    /// Persists one stream under a name derived from `original_filename`.
    pub async fn persist_single_stream<R>(
        &self,
        stream: R,
        directory: impl AsRef<Path>,
        original_filename: &str,
    ) -> Result<UploadedFile, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let directory = directory.as_ref();
        ensure_directory(directory, self.config.directory_mode).await?;
        self.store(stream, directory, original_filename).await
    }

    /// Persists every `(name, stream)` pair in iteration order. Each name is
    /// treated as the original filename.
    pub async fn persist_multiple_streams<M, K, R>(
        &self,
        streams: M,
        directory: impl AsRef<Path>,
    ) -> Result<Vec<UploadedFile>, UploadError>
    where
        M: IntoIterator<Item = (K, R)>,
        M::IntoIter: Send,
        K: Into<String> + Send,
        R: AsyncRead + Unpin + Send,
    {
        self.persist_all(StreamMap::new(streams), directory).await
    }

    /// Parses the request and persists the first file of `field_name`.
    ///
    /// Returns `Ok(None)` without touching the filesystem when the field
    /// carries no file.
    pub async fn persist_single_from_form(
        &self,
        request: Request,
        directory: impl AsRef<Path>,
        field_name: &str,
    ) -> Result<Option<UploadedFile>, UploadError> {
        let form = MultipartForm::parse(request, &self.config).await?;
        self.persist_single_from_parsed_form(&form, directory, field_name)
            .await
    }

    /// Parses the request and persists every file of `field_name`.
    pub async fn persist_multiple_from_form(
        &self,
        request: Request,
        directory: impl AsRef<Path>,
        field_name: &str,
    ) -> Result<Vec<UploadedFile>, UploadError> {
        let form = MultipartForm::parse(request, &self.config).await?;
        self.persist_multiple_from_parsed_form(&form, directory, field_name)
            .await
    }

    pub async fn persist_single_from_parsed_form(
        &self,
        form: &MultipartForm,
        directory: impl AsRef<Path>,
        field_name: &str,
    ) -> Result<Option<UploadedFile>, UploadError> {
        let Some(file) = form.first_file(field_name) else {
            tracing::debug!("No file under field {:?}", field_name);
            return Ok(None);
        };

        let directory = directory.as_ref();
        ensure_directory(directory, self.config.directory_mode).await?;

        let reader = file.open().await?;
        self.store(reader, directory, file.filename())
            .await
            .map(Some)
    }

    pub async fn persist_multiple_from_parsed_form(
        &self,
        form: &MultipartForm,
        directory: impl AsRef<Path>,
        field_name: &str,
    ) -> Result<Vec<UploadedFile>, UploadError> {
        self.persist_all(FormFieldSource::new(form, field_name), directory)
            .await
    }

    /// Drains `source` into `directory`, returning results in encounter
    /// order. The directory is ensured even when the source is empty.
    pub async fn persist_all<S>(
        &self,
        mut source: S,
        directory: impl AsRef<Path>,
    ) -> Result<Vec<UploadedFile>, UploadError>
    where
        S: UploadSource,
    {
        let directory = directory.as_ref();
        ensure_directory(directory, self.config.directory_mode).await?;

        let mut uploaded = Vec::new();
        while let Some(input) = source.next_upload().await? {
            uploaded.push(
                self.store(input.reader, directory, &input.original_name)
                    .await?,
            );
        }

        tracing::debug!(
            "Persisted {} uploads to {}",
            uploaded.len(),
            directory.display()
        );
        Ok(uploaded)
    }

    async fn store<R>(
        &self,
        reader: R,
        directory: &Path,
        original_filename: &str,
    ) -> Result<UploadedFile, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let filename = self.names.generate(original_filename);
        tracing::debug!("Storing {:?} as {}", original_filename, filename);
        persist(reader, directory, &filename).await
    }
}

/// Persists one stream with the default pipeline.
pub async fn persist_single_stream<R>(
    stream: R,
    directory: impl AsRef<Path>,
    original_filename: &str,
) -> Result<UploadedFile, UploadError>
where
    R: AsyncRead + Unpin + Send,
{
    UploadPipeline::new(UploadConfig::default())
        .persist_single_stream(stream, directory, original_filename)
        .await
}

/// Persists `(name, stream)` pairs with the default pipeline.
pub async fn persist_multiple_streams<M, K, R>(
    streams: M,
    directory: impl AsRef<Path>,
) -> Result<Vec<UploadedFile>, UploadError>
where
    M: IntoIterator<Item = (K, R)>,
    M::IntoIter: Send,
    K: Into<String> + Send,
    R: AsyncRead + Unpin + Send,
{
    UploadPipeline::new(UploadConfig::default())
        .persist_multiple_streams(streams, directory)
        .await
}

/// Persists the first file of `field_name` with the default pipeline.
pub async fn persist_single_from_form(
    request: Request,
    directory: impl AsRef<Path>,
    field_name: &str,
) -> Result<Option<UploadedFile>, UploadError> {
    UploadPipeline::new(UploadConfig::default())
        .persist_single_from_form(request, directory, field_name)
        .await
}

/// Persists every file of `field_name` with the default pipeline.
pub async fn persist_multiple_from_form(
    request: Request,
    directory: impl AsRef<Path>,
    field_name: &str,
) -> Result<Vec<UploadedFile>, UploadError> {
    UploadPipeline::new(UploadConfig::default())
        .persist_multiple_from_form(request, directory, field_name)
        .await
}

use crate::api::error::UploadError;
use crate::services::multipart::{FormFile, FormFileReader, MultipartForm};
use async_trait::async_trait;
use tokio::io::AsyncRead;

/// One named byte stream waiting to be persisted.
pub struct UploadInput<R> {
    /// Name the destination extension is taken from
    pub original_name: String,
    pub reader: R,
}

/// Produces upload inputs one at a time, in encounter order.
///
/// Returning an error aborts the batch; inputs already yielded stay
/// persisted.
#[async_trait]
pub trait UploadSource: Send {
    type Reader: AsyncRead + Unpin + Send;

    async fn next_upload(&mut self) -> Result<Option<UploadInput<Self::Reader>>, UploadError>;
}

#[async_trait]
impl<S> UploadSource for &mut S
where
    S: UploadSource + ?Sized,
{
    type Reader = S::Reader;

    async fn next_upload(&mut self) -> Result<Option<UploadInput<S::Reader>>, UploadError> {
        (**self).next_upload().await
    }
}

/// Caller-supplied `(name, stream)` pairs.
pub struct StreamMap<I> {
    entries: I,
}

impl<I> StreamMap<I> {
    pub fn new<M>(entries: M) -> Self
    where
        M: IntoIterator<IntoIter = I>,
    {
        Self {
            entries: entries.into_iter(),
        }
    }
}

#[async_trait]
impl<I, K, R> UploadSource for StreamMap<I>
where
    I: Iterator<Item = (K, R)> + Send,
    K: Into<String> + Send,
    R: AsyncRead + Unpin + Send,
{
    type Reader = R;

    async fn next_upload(&mut self) -> Result<Option<UploadInput<R>>, UploadError> {
        Ok(self.entries.next().map(|(name, reader)| UploadInput {
            original_name: name.into(),
            reader,
        }))
    }
}

/// Files submitted under one field of a parsed form. Each handle is opened
/// only when it is reached.
pub struct FormFieldSource<'f> {
    files: std::slice::Iter<'f, FormFile>,
}

impl<'f> FormFieldSource<'f> {
    pub fn new(form: &'f MultipartForm, field_name: &str) -> Self {
        Self {
            files: form.files(field_name).iter(),
        }
    }
}

#[async_trait]
impl UploadSource for FormFieldSource<'_> {
    type Reader = FormFileReader;

    async fn next_upload(&mut self) -> Result<Option<UploadInput<FormFileReader>>, UploadError> {
        let Some(file) = self.files.next() else {
            return Ok(None);
        };
        let reader = file.open().await?;
        Ok(Some(UploadInput {
            original_name: file.filename().to_string(),
            reader,
        }))
    }
}

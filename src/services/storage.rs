use crate::api::error::UploadError;
use crate::models::UploadedFile;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::{self, DirBuilder, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Makes sure `path` exists, creating it and any missing parents.
///
/// Concurrent callers racing to create the same directory all succeed.
/// A path that already exists is left alone even if it is not a directory;
/// the later file create reports that case.
pub async fn ensure_directory(path: &Path, mode: u32) -> Result<(), UploadError> {
    match fs::metadata(path).await {
        Ok(_) => return Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(UploadError::io(path, e)),
    }

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    match builder.create(path).await {
        Ok(()) => {
            tracing::debug!("Created upload directory {}", path.display());
            Ok(())
        }
        Err(e) => Err(UploadError::io(path, e)),
    }
}

/// Copies the whole stream into a new file at `directory/filename`.
///
/// The file is created with `create_new`, so an existing file is never
/// truncated. On a copy failure the partially written file stays on disk.
pub async fn persist<R>(
    mut reader: R,
    directory: &Path,
    filename: &str,
) -> Result<UploadedFile, UploadError>
where
    R: AsyncRead + Unpin,
{
    let path = directory.join(filename);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(|e| UploadError::io(&path, e))?;

    let written = tokio::io::copy(&mut reader, &mut file)
        .await
        .map_err(|e| UploadError::io(&path, e))?;
    file.flush().await.map_err(|e| UploadError::io(&path, e))?;

    tracing::debug!("Persisted {} bytes to {}", written, path.display());

    Ok(UploadedFile {
        filename: filename.to_string(),
    })
}

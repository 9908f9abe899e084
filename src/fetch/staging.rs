//! Private staging files that receive downloads before they are published.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

use crate::error::{AcquireError, Result};

/// Suffix appended to the dataset name before the random component.
pub(crate) const STAGING_MARKER: &str = ".part_";

/// A uniquely named temporary file co-located with the canonical path.
///
/// Dropping a `StagingFile` deletes it from disk, so a failed, cancelled or
/// panicking download never leaves a partial file behind. A successful
/// download is consumed by [`publish`](crate::cache::publish).
#[derive(Debug)]
pub struct StagingFile {
    file: NamedTempFile,
    path: Utf8PathBuf,
}

impl StagingFile {
    /// Creates an empty staging file beside `canonical`, named after it.
    pub(crate) fn beside(canonical: &Utf8Path) -> Result<Self> {
        let (staging_dir, name) = split_canonical(canonical);
        Self::create(staging_dir, name)
    }

    /// Creates an empty staging file named `<name>.part_<random>` in
    /// `staging_dir`.
    pub(crate) fn create(staging_dir: &Utf8Path, name: &str) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(&format!("{name}{STAGING_MARKER}"))
            .tempfile_in(staging_dir)
            .map_err(|err| {
                AcquireError::filesystem("failed to create staging file", staging_dir, err)
            })?;
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).map_err(|path| {
            AcquireError::filesystem(
                "staging file path is not valid UTF-8",
                staging_dir,
                io::Error::new(io::ErrorKind::InvalidData, path.display().to_string()),
            )
        })?;
        Ok(Self { file, path })
    }

    /// Location of the staging file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Appends `chunk` to the staging file.
    pub(crate) fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.file
            .as_file_mut()
            .write_all(chunk)
            .map_err(|err| {
                AcquireError::filesystem("failed to write staging file", &self.path, err)
            })
    }

    /// Discards any bytes written by a previous attempt.
    pub(crate) fn truncate(&mut self) -> Result<()> {
        let file: &mut File = self.file.as_file_mut();
        file.set_len(0)
            .and_then(|()| file.seek(SeekFrom::Start(0)).map(drop))
            .map_err(|err| {
                AcquireError::filesystem("failed to truncate staging file", &self.path, err)
            })
    }

    /// Flushes the payload to stable storage.
    pub(crate) fn sync(&mut self) -> Result<()> {
        let file = self.file.as_file_mut();
        file.flush()
            .and_then(|()| file.sync_all())
            .map_err(|err| AcquireError::filesystem("failed to sync staging file", &self.path, err))
    }

    /// Gives up the wrapper, keeping the delete-on-drop handle.
    pub(crate) fn into_temp_file(self) -> NamedTempFile {
        self.file
    }
}

/// Splits `canonical` into the directory its staging files live in and the
/// name they are derived from.
pub(crate) fn split_canonical(canonical: &Utf8Path) -> (&Utf8Path, &str) {
    let dir = canonical
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    (dir, canonical.file_name().unwrap_or("dataset"))
}

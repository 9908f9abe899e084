//! Atomic promotion of a staged download into the canonical cache slot.

use camino::Utf8Path;
use std::fs::File;
use std::io::{self, ErrorKind};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::LOG_TARGET;
use crate::error::{AcquireError, Result};
use crate::fetch::{StagingFile, split_canonical};

/// Moves `staging` over `canonical`.
///
/// The move is a rename, so readers of `canonical` see either the previous
/// file or the new one in full. Should the rename fail because the two paths
/// live on different filesystems, the payload is copied into a fresh
/// temporary file beside `canonical`, renamed into place, and the original
/// staging file is removed. Staging files created by
/// [`fetch`](crate::fetch::fetch) share the canonical directory, so the
/// fallback is not expected in practice.
///
/// # Errors
///
/// - [`AcquireError::Filesystem`] when the rename or the fallback copy fails;
///   the staging file is deleted and `canonical` is left untouched
/// - [`AcquireError::Integrity`] when `canonical` is absent after a
///   successful move
pub fn publish(staging: StagingFile, canonical: &Utf8Path) -> Result<()> {
    let staged_path = staging.path().to_path_buf();
    match staging.into_temp_file().persist(canonical) {
        Ok(_file) => {}
        Err(err) if is_cross_device(&err.error) => {
            debug!(
                target: LOG_TARGET,
                staging = %staged_path,
                canonical = %canonical,
                "staging file on another filesystem, publishing by copy"
            );
            publish_by_copy(err.file, canonical)?;
        }
        Err(err) => {
            return Err(AcquireError::filesystem(
                "failed to move staged download into place",
                canonical,
                err.error,
            ));
        }
    }

    verify_published(canonical)?;
    info!(
        target: LOG_TARGET,
        staging = %staged_path,
        canonical = %canonical,
        "dataset published"
    );
    Ok(())
}

/// Copies `staged` into a temporary file beside `canonical`, renames that into
/// place and removes `staged`.
pub(crate) fn publish_by_copy(staged: NamedTempFile, canonical: &Utf8Path) -> Result<()> {
    let (parent, name) = split_canonical(canonical);
    let mut replacement = StagingFile::create(parent, name)?.into_temp_file();

    copy_contents(staged.path(), replacement.as_file_mut())
        .and_then(|()| replacement.as_file().sync_all())
        .map_err(|err| {
            AcquireError::filesystem("failed to copy staged download", canonical, err)
        })?;

    replacement.persist(canonical).map_err(|err| {
        AcquireError::filesystem("failed to move copied download into place", canonical, err.error)
    })?;

    if let Err(err) = staged.close() {
        warn!(
            target: LOG_TARGET,
            error = %err,
            canonical = %canonical,
            "failed to remove staging file after copying it into place"
        );
    }
    Ok(())
}

fn copy_contents(source: &std::path::Path, target: &mut File) -> io::Result<()> {
    let mut reader = File::open(source)?;
    io::copy(&mut reader, target).map(drop)
}

fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == ErrorKind::CrossesDevices
}

fn verify_published(canonical: &Utf8Path) -> Result<()> {
    if canonical.is_file() {
        Ok(())
    } else {
        Err(AcquireError::Integrity {
            path: canonical.to_path_buf(),
        })
    }
}

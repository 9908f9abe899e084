//! Shared filesystem helpers that open directories through `cap-std`.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};
use std::io::{self, ErrorKind};

use crate::error::{AcquireError, Result};

/// Resolves a path to an ambient directory handle paired with the relative path component.
///
/// Absolute paths are opened relative to the ambient root; relative paths reuse the current
/// working directory.
pub(crate) fn ambient_dir_and_path(path: &Utf8Path) -> io::Result<(Dir, Utf8PathBuf)> {
    if path.has_root() {
        let stripped = path
            .strip_prefix("/")
            .map_or_else(|_| path.to_path_buf(), Utf8Path::to_path_buf);
        let dir = Dir::open_ambient_dir("/", ambient_authority())?;
        Ok((dir, stripped))
    } else {
        let dir = Dir::open_ambient_dir(".", ambient_authority())?;
        Ok((dir, path.to_path_buf()))
    }
}

/// Ensures the provided directory exists, creating intermediate directories when required.
///
/// Calling this repeatedly for the same path succeeds. A regular file sitting at `path` (or at
/// one of its ancestors) is reported as a filesystem error rather than silently replaced.
pub(crate) fn ensure_dir_exists(path: &Utf8Path) -> Result<()> {
    create_dir_all(path)
        .map_err(|err| AcquireError::filesystem("failed to create directory", path, err))
}

fn create_dir_all(path: &Utf8Path) -> io::Result<()> {
    let (dir, relative) = ambient_dir_and_path(path)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }

    match dir.create_dir_all(relative.as_std_path()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists && is_dir(&dir, &relative) => Ok(()),
        Err(err) => Err(err),
    }
}

fn is_dir(dir: &Dir, relative: &Utf8Path) -> bool {
    dir.metadata(relative.as_std_path())
        .is_ok_and(|metadata| metadata.is_dir())
}

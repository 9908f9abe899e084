//! On-disk layout of the data home and of a single cached dataset.

use camino::{Utf8Path, Utf8PathBuf};

use crate::dataset::RemoteDataset;
use crate::error::Result;
use crate::fs::ensure_dir_exists;

/// Location of one dataset inside a cache directory.
///
/// Staging files are always created in the canonical file's parent so that
/// publishing is a same-filesystem rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSlot {
    canonical: Utf8PathBuf,
    staging_dir: Utf8PathBuf,
}

impl DatasetSlot {
    /// Places `dataset` inside `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: &Utf8Path, dataset: &RemoteDataset) -> Self {
        Self {
            canonical: cache_dir.join(dataset.filename()),
            staging_dir: cache_dir.to_path_buf(),
        }
    }

    /// Stable path consumers read the dataset from.
    #[must_use]
    pub fn canonical(&self) -> &Utf8Path {
        &self.canonical
    }

    /// Directory receiving in-flight downloads; the canonical path's parent.
    #[must_use]
    pub fn staging_dir(&self) -> &Utf8Path {
        &self.staging_dir
    }

    /// Consumes the slot, returning the canonical path.
    #[must_use]
    pub fn into_canonical(self) -> Utf8PathBuf {
        self.canonical
    }
}

/// Standard subdirectories of the data home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataHomeLayout {
    root: Utf8PathBuf,
    sch: Utf8PathBuf,
    search_results: Utf8PathBuf,
    annotation: Utf8PathBuf,
}

impl DataHomeLayout {
    /// Describes the layout rooted at `root` without creating anything.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        let root = root.into();
        Self {
            sch: root.join("sch"),
            search_results: root.join("search_results"),
            annotation: root.join("annotation"),
            root,
        }
    }

    /// Creates every directory of the layout rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Filesystem`](crate::AcquireError::Filesystem)
    /// when any directory cannot be created.
    pub fn ensure(root: impl Into<Utf8PathBuf>) -> Result<Self> {
        let layout = Self::new(root);
        for dir in [
            &layout.root,
            &layout.sch,
            &layout.search_results,
            &layout.annotation,
        ] {
            ensure_dir_exists(dir)?;
        }
        Ok(layout)
    }

    /// Root of the data home.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Cache directory of the SCH dataset.
    #[must_use]
    pub fn sch(&self) -> &Utf8Path {
        &self.sch
    }

    /// Directory reserved for saved search results.
    #[must_use]
    pub fn search_results(&self) -> &Utf8Path {
        &self.search_results
    }

    /// Directory reserved for annotation spreadsheets.
    #[must_use]
    pub fn annotation(&self) -> &Utf8Path {
        &self.annotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn slot_colocates_staging_with_canonical() {
        let slot = DatasetSlot::new(Utf8Path::new("/data/sch"), &RemoteDataset::sch());

        assert_eq!(slot.canonical().as_str(), "/data/sch/produtos_certificados.zip");
        assert_eq!(Some(slot.staging_dir()), slot.canonical().parent());
    }

    #[test]
    fn ensure_creates_all_subdirectories() {
        let temp = tempdir().expect("tempdir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 path").join("home");

        let layout = DataHomeLayout::ensure(root.clone()).expect("ensure layout");

        assert_eq!(layout.root(), root.as_path());
        assert!(layout.sch().is_dir());
        assert!(layout.search_results().is_dir());
        assert!(layout.annotation().is_dir());
    }
}

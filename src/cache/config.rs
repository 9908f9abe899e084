//! Resolution of the on-disk data home.
//!
//! Resolves the cache directory from an explicit argument, the environment, and
//! platform defaults, and creates it on demand.

use camino::{Utf8Path, Utf8PathBuf};
use std::path::PathBuf;
use tracing::debug;

use super::LOG_TARGET;
use crate::error::Result;
use crate::fs::ensure_dir_exists;

/// Environment variable overriding the data home.
pub const DATA_HOME_ENV: &str = "SCH_DATAHOME";

/// Directory name used beneath the platform base directory.
const DATA_HOME_SUBDIR: &str = "sch_database";

/// Resolves the data home directory without touching the filesystem.
///
/// The resolution order is:
///
/// 1. `explicit` when provided and not blank
/// 2. `SCH_DATAHOME` environment variable if set and valid UTF-8
/// 3. `$LOCALAPPDATA/sch_database` if `LOCALAPPDATA` is set
/// 4. `~/sch_database` as fallback
/// 5. `<temp dir>/sch_database` as last resort
///
/// A leading `~` in the explicit or environment value expands to the home
/// directory.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use sch_datasets::resolve_data_home;
///
/// let data_home = resolve_data_home(Some(Utf8Path::new("/srv/sch")));
/// assert_eq!(data_home.as_str(), "/srv/sch");
/// ```
#[must_use]
pub fn resolve_data_home(explicit: Option<&Utf8Path>) -> Utf8PathBuf {
    if let Some(dir) = explicit.and_then(|path| non_blank(path.as_str())) {
        return expand_home(dir);
    }

    if let Some(dir) = resolve_from_env() {
        return dir;
    }

    if let Some(dir) = resolve_from_local_app_data() {
        return dir;
    }

    if let Some(dir) = resolve_from_home() {
        return dir;
    }

    resolve_from_temp()
}

/// Resolves the data home and creates it, including any missing parents.
///
/// # Errors
///
/// Returns [`AcquireError::Filesystem`](crate::AcquireError::Filesystem) when
/// the directory cannot be created, for example because a regular file
/// occupies the path or permission is denied.
pub fn ensure_data_home(explicit: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    let data_home = resolve_data_home(explicit);
    ensure_dir_exists(&data_home)?;
    debug!(target: LOG_TARGET, path = %data_home, "data home ready");
    Ok(data_home)
}

/// Attempts to resolve the data home from `SCH_DATAHOME`.
fn resolve_from_env() -> Option<Utf8PathBuf> {
    let raw = std::env::var(DATA_HOME_ENV).ok()?;
    non_blank(&raw).map(expand_home)
}

/// Attempts to resolve the data home from `LOCALAPPDATA`.
fn resolve_from_local_app_data() -> Option<Utf8PathBuf> {
    let raw = std::env::var("LOCALAPPDATA").ok()?;
    non_blank(&raw).map(|base| expand_home(base).join(DATA_HOME_SUBDIR))
}

/// Attempts to resolve the data home from the home directory.
fn resolve_from_home() -> Option<Utf8PathBuf> {
    let home = home_dir()?;
    Some(home.join(DATA_HOME_SUBDIR))
}

fn resolve_from_temp() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
        .join(DATA_HOME_SUBDIR)
}

fn home_dir() -> Option<Utf8PathBuf> {
    dirs::home_dir().and_then(|home: PathBuf| Utf8PathBuf::from_path_buf(home).ok())
}

fn non_blank(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Expands a leading `~` component to the home directory.
fn expand_home(raw: &str) -> Utf8PathBuf {
    let path = Utf8Path::new(raw);
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match home_dir() {
        Some(home) if rest.as_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use temp_env::with_vars;
    use tempfile::tempdir;

    #[test]
    fn explicit_argument_wins_over_environment() {
        let result = with_vars(
            [
                (DATA_HOME_ENV, Some("/from/env")),
                ("LOCALAPPDATA", Some("/appdata")),
            ],
            || resolve_data_home(Some(Utf8Path::new("/explicit"))),
        );
        assert_eq!(result.as_str(), "/explicit");
    }

    #[test]
    fn environment_wins_over_platform_default() {
        let result = with_vars(
            [
                (DATA_HOME_ENV, Some("/from/env")),
                ("LOCALAPPDATA", Some("/appdata")),
            ],
            || resolve_data_home(None),
        );
        assert_eq!(result.as_str(), "/from/env");
    }

    #[test]
    fn local_app_data_is_used_when_env_var_unset() {
        let result = with_vars(
            [
                (DATA_HOME_ENV, None::<&str>),
                ("LOCALAPPDATA", Some("/appdata")),
            ],
            || resolve_data_home(None),
        );
        assert_eq!(result.as_str(), format!("/appdata/{DATA_HOME_SUBDIR}").as_str());
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    fn blank_values_are_ignored(#[case] blank: &str) {
        let result = with_vars(
            [
                (DATA_HOME_ENV, Some(blank)),
                ("LOCALAPPDATA", Some("/appdata")),
            ],
            || resolve_data_home(Some(Utf8Path::new(blank))),
        );
        assert_eq!(result.as_str(), format!("/appdata/{DATA_HOME_SUBDIR}").as_str());
    }

    #[test]
    fn default_falls_back_to_home_directory() {
        let result = with_vars(
            [(DATA_HOME_ENV, None::<&str>), ("LOCALAPPDATA", None::<&str>)],
            || resolve_data_home(None),
        );
        assert!(result.as_str().ends_with(DATA_HOME_SUBDIR));
    }

    #[test]
    fn tilde_expands_to_home_directory() {
        let Some(home) = home_dir() else {
            return;
        };
        let result = resolve_data_home(Some(Utf8Path::new("~/datasets")));
        assert_eq!(result, home.join("datasets"));
    }

    #[test]
    fn ensure_data_home_creates_directory_once_and_again() {
        let temp = tempdir().expect("tempdir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 path");
        let target = root.join("nested/data");

        let first = ensure_data_home(Some(target.as_path())).expect("first ensure");
        let second = ensure_data_home(Some(target.as_path())).expect("second ensure");

        assert_eq!(first, second);
        assert!(target.is_dir());
    }

    #[test]
    fn ensure_data_home_reports_blocking_file() {
        let temp = tempdir().expect("tempdir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 path");
        let blocker = root.join("blocker");
        std::fs::write(&blocker, "file").expect("write blocker");

        let err = ensure_data_home(Some(blocker.as_path())).expect_err("file occupies the path");
        assert_eq!(err.kind(), crate::AcquireErrorKind::Filesystem);
    }
}

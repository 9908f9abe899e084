//! Local cache for remotely published datasets.
//!
//! This module decides where datasets live on disk, whether a cached copy is
//! still current, and how a freshly downloaded copy replaces it.
//!
//! # Cache Location
//!
//! The data home is resolved in the following order:
//!
//! 1. An explicit directory supplied by the caller
//! 2. `SCH_DATAHOME` environment variable if set
//! 3. `$LOCALAPPDATA/sch_database` if `LOCALAPPDATA` is set
//! 4. `~/sch_database` as fallback
//! 5. `<temp dir>/sch_database` when no home directory is known
//!
//! # Cross-Process Coordination
//!
//! There are no lock files. Each download writes to its own uniquely named
//! staging file next to the canonical file, and publishing renames it into
//! place, so concurrent writers resolve to "last rename wins" and readers
//! never observe a partially written dataset.

mod config;
mod freshness;
mod layout;
mod publish;

pub use config::{DATA_HOME_ENV, ensure_data_home, resolve_data_home};
pub use freshness::{FreshnessDecision, evaluate};
pub use layout::{DataHomeLayout, DatasetSlot};
pub use publish::publish;

/// Observability target for cache operations.
pub(crate) const LOG_TARGET: &str = "sch_datasets::cache";

#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the `DuckDB` data directory.
//!
//! All paths live under the project root's `data/` directory unless the
//! `DINING_ATLAS_DATA_DIR` environment variable points elsewhere.

use std::path::{Path, PathBuf};

/// Environment variable overriding [`data_dir`].
pub const DATA_DIR_ENV: &str = "DINING_ATLAS_DATA_DIR";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
#[must_use]
pub fn project_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .ancestors()
        .nth(2)
        .map_or_else(|| manifest.to_path_buf(), Path::to_path_buf)
}

/// Returns the data directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => project_root().join("data"),
    }
}

/// Returns the path for the summary `DuckDB` file.
#[must_use]
pub fn summary_db_path() -> PathBuf {
    data_dir().join("summaries.duckdb")
}

/// Returns the path for the search response cache `DuckDB` file.
#[must_use]
pub fn search_cache_db_path() -> PathBuf {
    data_dir().join("search_cache.duckdb")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_files_live_in_data_dir() {
        let dir = data_dir();
        assert_eq!(summary_db_path().parent(), Some(dir.as_path()));
        assert_eq!(search_cache_db_path().parent(), Some(dir.as_path()));
    }
}

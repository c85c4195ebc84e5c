//! On-disk layout of a ragbot installation.
//!
//! ```text
//! <data dir>/
//!   logs/          daily server.log files
//!   uploads/       saved PDF uploads
//!   rag.db         SQLite similarity index
//!   secrets.yaml   optional secret overrides
//! ```
//!
//! `RAGBOT_ROOT` pins the directory holding `config.yml`; `RAGBOT_DATA_DIR`
//! pins the data directory. Debug builds keep data under `<root>/data`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "ragbot";

#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory searched for `config.yml`.
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub rag_db_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = project_root_from(env::var_os("RAGBOT_ROOT"));
        let user_data_dir = match env::var_os("RAGBOT_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None if cfg!(debug_assertions) => project_root.join("data"),
            None => platform_data_dir(),
        };
        Self::with_data_dir(project_root, user_data_dir)
    }

    /// Lays out every path under `user_data_dir` and creates the
    /// directories. A directory that cannot be created surfaces later, on
    /// first use.
    pub fn with_data_dir(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let paths = AppPaths {
            log_dir: user_data_dir.join("logs"),
            uploads_dir: user_data_dir.join("uploads"),
            rag_db_path: user_data_dir.join("rag.db"),
            secrets_path: user_data_dir.join("secrets.yaml"),
            project_root,
            user_data_dir,
        };

        for dir in [&paths.user_data_dir, &paths.log_dir, &paths.uploads_dir] {
            if let Err(e) = fs::create_dir_all(dir) {
                tracing::warn!("Failed to create {}: {}", dir.display(), e);
            }
        }
        paths
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn project_root_from(pinned: Option<std::ffi::OsString>) -> PathBuf {
    if let Some(root) = pinned {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }
    env::current_dir().unwrap_or(manifest_dir)
}

fn platform_data_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        let base = env::var_os("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(home_dir);
        return base.join("Ragbot");
    }
    if cfg!(target_os = "macos") {
        return home_dir().join("Library/Application Support/Ragbot");
    }

    env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".local/share"))
        .join(APP_DIR_NAME)
}

fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(".").to_path_buf())
}

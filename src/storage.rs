// File: ./src/storage.rs
// Backing medium for the three flat tables: paths, atomic writes, store lock
use anyhow::Result;
use directories::ProjectDirs;
use fs2::FileExt;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

// Table file names, fixed by the on-disk format
pub const EVENT_FILE: &str = "event.csv";
pub const RECUR_FILE: &str = "recurrent.csv";
pub const ADD_FILE: &str = "additional.csv";
const LOCK_FILE: &str = "store.lock";

/// Environment override for the data directory. Lets tests (and embedders)
/// isolate the store without touching the platform data dir.
pub const DATA_DIR_ENV: &str = "FLATCAL_DATA_DIR";

/// Resolved location of the store directory holding the three tables.
#[derive(Debug, Clone)]
pub struct StorePaths {
    dir: PathBuf,
}

impl StorePaths {
    /// Resolution order: `FLATCAL_DATA_DIR`, then the configured override,
    /// then the platform data dir. `None` only when the platform has no
    /// usable home directory.
    pub fn resolve(override_dir: Option<&Path>) -> Option<Self> {
        if let Ok(dir) = env::var(DATA_DIR_ENV) {
            return Some(Self::at(PathBuf::from(dir)));
        }
        if let Some(dir) = override_dir {
            return Some(Self::at(dir.to_path_buf()));
        }
        let proj = ProjectDirs::from("org", "flatcal", "flatcal")?;
        Some(Self::at(proj.data_dir().to_path_buf()))
    }

    pub fn at(dir: PathBuf) -> Self {
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn events(&self) -> PathBuf {
        self.dir.join(EVENT_FILE)
    }

    pub fn recurrences(&self) -> PathBuf {
        self.dir.join(RECUR_FILE)
    }

    pub fn additional(&self) -> PathBuf {
        self.dir.join(ADD_FILE)
    }
}

/// Atomic write: Write to .tmp file then rename
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
    let path = path.as_ref();
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}

/// Runs `f` while holding an exclusive advisory lock on the store directory.
/// Full-rewrite saves and the restore table swap must not interleave with a
/// second process; in-process callers are already serialized by `&mut`.
pub fn with_lock<T, F>(paths: &StorePaths, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(paths.dir.join(LOCK_FILE))?;
    lock.lock_exclusive()?;
    let result = f();
    let _ = FileExt::unlock(&lock);
    result
}

// File: ./src/logging.rs
// Optional file-logging bootstrap. The crate itself only uses the `log`
// facade; embedders either call this once or install their own logger.
use anyhow::{Context, Result};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::fs;
use std::path::Path;

const LOG_BASENAME: &str = "flatcal";
const MAX_LOG_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const KEPT_LOG_FILES: usize = 5;

static LOGGER: OnceCell<LoggerHandle> = OnceCell::new();

/// Starts size-rotated file logging under `dir` at the given level
/// (`trace|debug|info|warn|error`). The first successful call wins for the
/// process; later calls are no-ops whatever their arguments.
pub fn init_logging(level: &str, dir: &Path) -> Result<()> {
    LOGGER.get_or_try_init(|| -> Result<LoggerHandle> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
        let handle = Logger::try_with_str(level)
            .with_context(|| format!("invalid log level {level:?}"))?
            .log_to_file(FileSpec::default().directory(dir).basename(LOG_BASENAME))
            .rotate(
                Criterion::Size(MAX_LOG_SIZE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(KEPT_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .context("starting logger")?;
        info!(
            "flatcal {} logging to {}",
            env!("CARGO_PKG_VERSION"),
            dir.display()
        );
        Ok(handle)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_is_idempotent_and_creates_a_log_file() {
        let dir = TempDir::new().unwrap();
        init_logging("debug", dir.path()).unwrap();
        // Later calls are no-ops, whatever the arguments.
        init_logging("trace", &dir.path().join("elsewhere")).unwrap();

        log::info!("marker line");
        if let Some(handle) = LOGGER.get() {
            handle.flush();
        }
        let mut names = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned());
        assert!(names.any(|name| name.starts_with("flatcal")));
    }
}

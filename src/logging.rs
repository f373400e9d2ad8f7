//! Tracing subscriber setup.
//!
//! Logs go to stderr unless a log file is requested, in which case they are
//! appended to `logs/vpnshell.log` under the config directory. The filter is
//! read from `VPNSHELL_LOG` and falls back to `info`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants;

/// Where log output should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// The log file location inside `config_dir`.
    #[must_use]
    pub fn file_in(config_dir: &Path) -> Self {
        Self::File(
            config_dir
                .join(constants::LOGS_DIR_NAME)
                .join(constants::LOG_FILE_NAME),
        )
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(constants::ENV_LOG)
        .unwrap_or_else(|_| EnvFilter::new(constants::DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(target: &LogTarget) -> Result<()> {
    let (stderr_layer, file_layer) = match target {
        LogTarget::Stderr => (
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
            None,
        ),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .wrap_err_with(|| format!("creating log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("opening log file {}", path.display()))?;
            (
                None,
                Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            )
        }
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_lives_under_logs_dir() {
        let target = LogTarget::file_in(Path::new("/tmp/vpnshell"));
        assert_eq!(
            target,
            LogTarget::File(PathBuf::from("/tmp/vpnshell/logs/vpnshell.log"))
        );
    }

    #[test]
    fn test_init_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = LogTarget::file_in(dir.path());
        init(&target).unwrap();
        assert!(dir.path().join("logs").join("vpnshell.log").exists());
    }
}

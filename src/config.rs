use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the snapshot location.
pub const DATA_ENV: &str = "HIVEKEEP_DATA";
/// Environment variable overriding the audit log location.
pub const AUDIT_ENV: &str = "HIVEKEEP_AUDIT_LOG";

const DATA_FILE_NAME: &str = "beekeeping_data.json";
const AUDIT_FILE_NAME: &str = "activity_log.txt";

/// Runtime settings shared by the composition root and every command.
#[derive(Debug, Clone)]
pub struct Config {
    /// Snapshot file holding all four collections.
    pub data_file: PathBuf,
    /// Append-only audit log.
    pub audit_log: PathBuf,
    /// Requested parallelism for statistics. Clamped at use.
    pub threads: usize,
    /// How long startup waits for the background load before moving on.
    pub load_grace: Duration,
    /// How long authentication waits for an unfinished background load.
    pub load_timeout: Duration,
    /// How long the statistics pool may run before remaining chunks are abandoned.
    pub pool_grace: Duration,
}

impl Config {
    /// Builds a config whose files live next to `data_file`.
    pub fn with_data_file(data_file: impl Into<PathBuf>) -> Self {
        let data_file = data_file.into();
        let audit_log = data_file.with_file_name(AUDIT_FILE_NAME);
        Self {
            data_file,
            audit_log,
            threads: available_parallelism(),
            load_grace: Duration::from_millis(200),
            load_timeout: Duration::from_secs(5),
            pool_grace: Duration::from_secs(60),
        }
    }

    /// Resolves file locations from the environment.
    ///
    /// The snapshot path is determined in the following order:
    /// 1. `HIVEKEEP_DATA` environment variable.
    /// 2. `~/.local/share/hivekeep/beekeeping_data.json` (on Linux).
    /// 3. `./beekeeping_data.json` (fallback).
    ///
    /// The audit log defaults to `activity_log.txt` beside the snapshot unless
    /// `HIVEKEEP_AUDIT_LOG` is set.
    pub fn from_env() -> Self {
        let mut config = Self::with_data_file(data_path());
        if let Ok(audit) = std::env::var(AUDIT_ENV) {
            config.audit_log = PathBuf::from(audit);
        }
        config
    }
}

fn data_path() -> PathBuf {
    std::env::var(DATA_ENV).map(PathBuf::from).unwrap_or_else(|_| {
        match dirs::data_local_dir() {
            Some(mut p) => {
                p.push("hivekeep");
                if !p.exists() {
                    let _ = fs::create_dir_all(&p);
                }
                p.push(DATA_FILE_NAME);
                p
            }
            None => PathBuf::from(DATA_FILE_NAME),
        }
    })
}

/// Number of hardware threads available to this process, at least 1.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

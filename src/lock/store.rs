use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File holding the lock record inside the boot-accessible directory.
pub const LOCK_STATE_FILE: &str = "lock_prefs.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct LockRecord {
    #[serde(default)]
    is_locked: bool,
}

/// Persisted lock flag in boot-accessible storage.
///
/// Kept apart from the general state directory so it can be read before
/// anything else is available. Writes are durable and verified.
#[derive(Debug, Clone)]
pub struct LockStateStore {
    path: PathBuf,
}

impl LockStateStore {
    pub fn open(boot_dir: &Path) -> Self {
        Self {
            path: boot_dir.join(LOCK_STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing record means unlocked. An unreadable one is reported
    /// as unlocked with a warning.
    pub fn read(&self) -> io::Result<bool> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        match serde_json::from_str::<LockRecord>(&raw) {
            Ok(record) => Ok(record.is_locked),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "corrupt lock record: {e}");
                Ok(false)
            }
        }
    }

    /// Write through a synced temp file and rename, then read back.
    pub fn write(&self, locked: bool) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec(&LockRecord { is_locked: locked })
            .map_err(io::Error::other)?;

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        let verify = self.read()?;
        if verify != locked {
            return Err(io::Error::other(format!(
                "lock state verification failed: expected {locked}, read {verify}"
            )));
        }
        tracing::debug!(locked, path = %self.path.display(), "lock state persisted");
        Ok(())
    }
}

use crate::device::{PlatformResult, ShellRunner};
use crate::error::PlatformError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Runs commands through `sh -c` on this machine.
pub struct SystemShell {
    timeout: Duration,
}

impl SystemShell {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemShell {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl ShellRunner for SystemShell {
    async fn run(&self, command: &str) -> PlatformResult<String> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| PlatformError::rejected("shell", format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| PlatformError::rejected("shell", format!("spawn error: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = match (stdout.trim(), stderr.trim()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{out}\n{err}"),
        };

        if output.status.success() {
            Ok(combined)
        } else {
            Err(PlatformError::rejected(
                "shell",
                format!("status={} {combined}", output.status),
            ))
        }
    }
}

use super::traits::CommandSource;
use crate::command::Command;
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// One JSON command per line, from a file or stdin. Blank lines and lines
/// starting with `#` are ignored; malformed lines are logged and skipped.
pub struct NdjsonSource {
    path: Option<PathBuf>,
}

impl NdjsonSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn stdin() -> Self {
        Self { path: None }
    }

    async fn pump<R>(&self, reader: R, tx: &tokio::sync::mpsc::Sender<Command>) -> anyhow::Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut delivered = 0usize;
        let mut line_no = 0usize;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cmd = match serde_json::from_str::<Command>(line) {
                Ok(cmd) => cmd,
                Err(e) => {
                    tracing::warn!(line = line_no, "skipping malformed command: {e}");
                    continue;
                }
            };
            if tx.send(cmd).await.is_err() {
                break;
            }
            delivered += 1;
        }
        Ok(delivered)
    }
}

#[async_trait]
impl CommandSource for NdjsonSource {
    fn name(&self) -> &str {
        if self.path.is_some() { "file" } else { "stdin" }
    }

    async fn listen(&self, tx: tokio::sync::mpsc::Sender<Command>) -> anyhow::Result<()> {
        let delivered = match &self.path {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?;
                self.pump(BufReader::new(file), &tx).await?
            }
            None => self.pump(BufReader::new(tokio::io::stdin()), &tx).await?,
        };
        tracing::info!(source = self.name(), delivered, "command source exhausted");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.path.as_ref().is_none_or(|p| p.exists())
    }
}

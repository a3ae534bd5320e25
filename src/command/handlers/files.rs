use super::CommandContext;
use crate::command::payload::Payload;
use crate::command::types::Command;
use crate::error::{AgentError, CommandError};
use std::path::{Component, Path, PathBuf};

/// Resolve `relative` under `root`. Absolute paths are taken as relative to
/// the root; anything that could climb out of it is rejected.
fn resolve(root: &Path, command: &str, relative: &str) -> Result<PathBuf, CommandError> {
    let invalid = |message: &str| CommandError::InvalidField {
        command: command.to_string(),
        field: "path".into(),
        message: format!("{message}: `{relative}`"),
    };
    let trimmed = Path::new(relative.trim_start_matches('/'));
    let mut resolved = root.to_path_buf();
    for component in trimmed.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("path escapes the storage root"));
            }
        }
    }
    if resolved == root {
        return Err(invalid("path names the storage root"));
    }
    Ok(resolved)
}

fn target(ctx: &CommandContext, cmd: &Command) -> Result<(String, PathBuf), AgentError> {
    let fields = Payload::of(cmd).require_object()?;
    let raw = fields.require_str("path")?.to_string();
    let root = ctx.settings.load().storage.external_root();
    let path = resolve(&root, &cmd.message_type, &raw)?;
    Ok((raw, path))
}

pub(super) async fn delete_file(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let (raw, path) = target(ctx, cmd)?;
    tokio::fs::remove_file(&path).await?;
    ctx.audit.info(format!("Deleted file: {raw}"));
    Ok(())
}

pub(super) async fn delete_dir(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let (raw, path) = target(ctx, cmd)?;
    tokio::fs::remove_dir_all(&path).await?;
    ctx.audit.info(format!("Deleted directory: {raw}"));
    Ok(())
}

/// Empty a directory but keep it. Subdirectories go too only with
/// `recursive == "1"`.
pub(super) async fn purge_dir(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let (raw, path) = target(ctx, cmd)?;
    let recursive = Payload::of(cmd).require_object()?.flag("recursive");

    let is_dir = tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(CommandError::InvalidField {
            command: cmd.message_type.clone(),
            field: "path".into(),
            message: format!("not a directory: {raw}"),
        }
        .into());
    }

    let mut doomed = Vec::new();
    let mut entries = tokio::fs::read_dir(&path).await?;
    while let Some(entry) = entries.next_entry().await? {
        match entry.file_type().await {
            Ok(file_type) if file_type.is_dir() => {
                if recursive {
                    doomed.push(Doomed::Dir(entry.path()));
                }
            }
            Ok(_) => doomed.push(Doomed::File(entry.path())),
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), "cannot stat entry: {e}");
            }
        }
    }

    let summary = remove_each(&doomed).await;
    if summary.failed == 0 {
        ctx.audit.info(format!("Purged directory: {raw}"));
    } else {
        ctx.audit.warn(format!(
            "Purged directory {raw}: {} removed, {} failed",
            summary.removed, summary.failed
        ));
    }
    Ok(())
}

#[derive(Debug)]
enum Doomed {
    File(PathBuf),
    Dir(PathBuf),
}

#[derive(Debug, Default, PartialEq, Eq)]
struct PurgeSummary {
    removed: usize,
    failed: usize,
}

/// Best effort: one failing entry never stops the rest. Entries already
/// gone count as neither.
async fn remove_each(doomed: &[Doomed]) -> PurgeSummary {
    let mut summary = PurgeSummary::default();
    for entry in doomed {
        let (path, result) = match entry {
            Doomed::File(path) => (path, tokio::fs::remove_file(path).await),
            Doomed::Dir(path) => (path, tokio::fs::remove_dir_all(path).await),
        };
        match result {
            Ok(()) => summary.removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to delete: {e}");
                summary.failed += 1;
            }
        }
    }
    summary
}

pub(super) async fn clear_downloads(ctx: &CommandContext) -> Result<(), AgentError> {
    ctx.audit.warn("Clear download history by a Push message");
    let files = ctx.platform.installer.downloaded_files();
    let mut removed = 0usize;
    for file in &files {
        match tokio::fs::remove_file(file).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %file.display(), "failed to delete download: {e}"),
        }
    }
    ctx.platform.installer.forget_downloads();
    tracing::info!(removed, known = files.len(), "download history cleared");
    Ok(())
}

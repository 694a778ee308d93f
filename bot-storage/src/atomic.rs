//! Crash-safe file replacement.
//!
//! Content goes to a sibling temp file which is synced and then renamed over
//! the target, so a reader sees either the old or the new file, never a torn
//! write.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically replaces `path` with `contents`.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let tmp = temp_path(path);
    let mut file = fs::File::create(&tmp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Removes `path`, treating an already-missing file as success.
pub(crate) async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Moves an unreadable `path` to `<name>.corrupt-<epoch>` next to it.
///
/// Never replaces an earlier set-aside copy. Returns the new location.
pub(crate) async fn set_aside(path: &Path) -> std::io::Result<PathBuf> {
    let mut base = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    base.push(format!(".corrupt-{}", chrono::Utc::now().timestamp()));

    let mut target = path.with_file_name(&base);
    let mut n = 1;
    while fs::try_exists(&target).await? {
        let mut name = base.clone();
        name.push(format!("-{n}"));
        target = path.with_file_name(name);
        n += 1;
    }
    fs::rename(path, &target).await?;
    Ok(target)
}

/// Reads `path`, returning `None` when it does not exist.
pub(crate) async fn read_optional(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

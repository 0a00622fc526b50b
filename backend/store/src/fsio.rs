//! Filesystem primitives: contained path resolution and atomic writes.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::warn;

use patchforge_core::PatchError;

/// Resolve a caller-supplied relative path against the workspace root and
/// require the result to stay inside it.
///
/// The check runs on the fully resolved path, not the raw string, so `..`
/// chains and symlinks both land on the same rule. Targets that do not
/// exist yet resolve through their deepest existing ancestor.
pub fn resolve_contained(root: &Path, requested: &str) -> Result<PathBuf, PatchError> {
    let root = root.canonicalize().map_err(PatchError::StorageIo)?;
    let joined = root.join(requested);

    let resolved = match joined.canonicalize() {
        Ok(path) => path,
        // The target may not exist yet; resolve its parent instead and
        // re-attach the final component.
        Err(_) => {
            let parent = joined.parent().ok_or(PatchError::PathTraversal)?;
            let name = joined.file_name().ok_or(PatchError::PathTraversal)?;
            match parent.canonicalize() {
                Ok(parent) => parent.join(name),
                Err(_) => lexical_normalize(&joined),
            }
        }
    };

    if !resolved.starts_with(&root) {
        warn!("path containment violation on a requested target");
        return Err(PatchError::PathTraversal);
    }

    Ok(resolved)
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Write bytes to `path` atomically: temp file in the same directory, then
/// rename over the final path. Readers observe the old content or the new,
/// never a partial file. The temp file is removed on any failure, so a
/// failed write leaves the record not-created.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PatchError> {
    let tmp = temp_sibling(path);

    if let Err(err) = write_restricted(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(PatchError::StorageIo(err));
    }

    if let Err(err) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(PatchError::StorageIo(err));
    }

    Ok(())
}

async fn write_restricted(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::write(path, bytes).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.tmp"))
}

/// Create a record directory with owner-only permissions.
pub async fn ensure_private_dir(dir: &Path) -> Result<(), PatchError> {
    fs::create_dir_all(dir).await.map_err(PatchError::StorageIo)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
            .await
            .map_err(PatchError::StorageIo)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn traversal_outside_root_is_refused() {
        let root = tempfile::tempdir().unwrap();
        let err = resolve_contained(root.path(), "../../etc/passwd").unwrap_err();
        assert!(matches!(err, PatchError::PathTraversal));
    }

    #[tokio::test]
    async fn paths_inside_root_resolve_even_when_missing() {
        let root = tempfile::tempdir().unwrap();
        let resolved = resolve_contained(root.path(), "subdir/file.txt").unwrap();
        assert!(resolved.starts_with(root.path().canonicalize().unwrap()));
        assert!(resolved.ends_with("subdir/file.txt"));
    }

    #[tokio::test]
    async fn atomic_write_replaces_content_whole() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("record.json");

        write_atomic(&target, b"first").await.unwrap();
        write_atomic(&target, b"second").await.unwrap();

        assert_eq!(fs::read(&target).await.unwrap(), b"second");
        // No temp residue after a successful write.
        assert!(!temp_sibling(&target).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn records_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("record.json");
        write_atomic(&target, b"x").await.unwrap();
        let mode = fs::metadata(&target).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

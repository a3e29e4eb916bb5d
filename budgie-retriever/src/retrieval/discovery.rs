//! Finding the documents to index

use budgie_context::normalize_extension;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Recursively lists the files under `root` whose name ends with
/// `extension`, compared case-insensitively (`"md"`, `".md"` and `".MD"` are
/// equivalent).
///
/// Hidden files and directories are included and no ignore files are
/// consulted. Symlinked directories are not followed. Subdirectories that
/// cannot be read are skipped with a warning; failing to read `root` itself
/// is an error. The result is sorted so the walk order, and therefore the
/// chunk id order, is deterministic.
pub async fn find_files(root: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let suffix = normalize_extension(extension);
    let mut found = Vec::new();

    // Use a stack to implement depth-first traversal
    let mut dir_stack = vec![root.to_path_buf()];

    while let Some(current_dir) = dir_stack.pop() {
        let mut read_dir = match tokio::fs::read_dir(&current_dir).await {
            Ok(rd) => rd,
            Err(e) if current_dir == root => return Err(e),
            Err(e) => {
                warn!("Failed to read directory {}: {}", current_dir.display(), e);
                continue;
            }
        };

        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to list {}: {}", current_dir.display(), e);
                    break;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    warn!("Failed to get metadata for {}: {}", path.display(), e);
                    continue;
                }
            };

            if file_type.is_dir() {
                dir_stack.push(path);
            } else if has_suffix(&path, &suffix) {
                found.push(path);
            }
        }
    }

    found.sort();
    debug!(
        "Found {} files ending in {} under {}",
        found.len(),
        suffix,
        root.display()
    );
    Ok(found)
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with(suffix))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_find_files_recursive_and_sorted() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("b/nested")).unwrap();
        std::fs::create_dir_all(root.join(".hidden")).unwrap();
        std::fs::write(root.join("z.md"), "z").unwrap();
        std::fs::write(root.join("a.MD"), "a").unwrap();
        std::fs::write(root.join("b/nested/deep.md"), "deep").unwrap();
        std::fs::write(root.join(".hidden/secret.md"), "hidden").unwrap();
        std::fs::write(root.join("notes.txt"), "txt").unwrap();
        std::fs::write(root.join("md"), "no dot").unwrap();

        let files = find_files(root, "md").await.unwrap();
        let relative: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(relative, vec![".hidden/secret.md", "a.MD", "b/nested/deep.md", "z.md"]);
    }

    #[tokio::test]
    async fn test_find_files_other_extension() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("main.go"), "package main").unwrap();
        std::fs::write(dir.path().join("readme.md"), "# hi").unwrap();

        let files = find_files(dir.path(), ".go").await.unwrap();
        assert_eq!(files, vec![dir.path().join("main.go")]);
    }

    #[tokio::test]
    async fn test_find_files_missing_root() {
        let dir = tempdir().unwrap();
        assert!(find_files(&dir.path().join("nope"), ".md").await.is_err());
    }

    #[tokio::test]
    async fn test_find_files_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(find_files(dir.path(), ".md").await.unwrap().is_empty());
    }
}

//! Recursive symlink enumeration.

use linkguard_core::SymlinkViolation;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Every symlink below `root`, sorted by path.
///
/// Symlinks are never followed. A subdirectory that disappears while being
/// walked is skipped; any other enumeration failure is returned alongside
/// the links found so far.
pub fn collect_links(root: &Path) -> (Vec<PathBuf>, Vec<SymlinkViolation>) {
    let mut links = Vec::new();
    let mut failures = Vec::new();
    if let Err(e) = walk(root, &mut links, &mut failures) {
        failures.push(SymlinkViolation::EnumerationFailed {
            path: root.to_path_buf(),
            reason: e.to_string(),
        });
    }
    links.sort();
    failures.sort();
    (links, failures)
}

fn walk(dir: &Path, links: &mut Vec<PathBuf>, failures: &mut Vec<SymlinkViolation>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if file_type.is_symlink() {
            links.push(path);
        } else if file_type.is_dir() {
            match walk(&path, links, failures) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => failures.push(SymlinkViolation::EnumerationFailed {
                    path,
                    reason: e.to_string(),
                }),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_collects_nested_links_sorted() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("by-id")).unwrap();
        fs::create_dir_all(root.join("by-label/nested")).unwrap();
        fs::write(root.join("node"), b"").unwrap();
        symlink("../node", root.join("by-label/b")).unwrap();
        symlink("../node", root.join("by-id/a")).unwrap();
        symlink("../../node", root.join("by-label/nested/c")).unwrap();
        symlink("../missing", root.join("by-id/dangling")).unwrap();

        let (links, failures) = collect_links(root);
        assert!(failures.is_empty());
        assert_eq!(
            links,
            vec![
                root.join("by-id/a"),
                root.join("by-id/dangling"),
                root.join("by-label/b"),
                root.join("by-label/nested/c"),
            ]
        );
    }

    #[test]
    fn test_does_not_follow_directory_links() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("real/inner")).unwrap();
        symlink("../x", root.join("real/inner/link")).unwrap();
        symlink("real", root.join("alias")).unwrap();

        let (links, _) = collect_links(root);
        assert_eq!(links, vec![root.join("alias"), root.join("real/inner/link")]);
    }

    #[test]
    fn test_missing_root_is_reported() {
        let dir = TempDir::new().unwrap();
        let (links, failures) = collect_links(&dir.path().join("absent"));
        assert!(links.is_empty());
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], SymlinkViolation::EnumerationFailed { .. }));
    }
}

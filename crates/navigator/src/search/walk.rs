//! Directory reads for the recursive search walk.

use std::fs;
use std::io;

use crate::entry::{join_path, FileEntry};

/// One child of a directory being walked.
pub(crate) struct Child {
    pub name: String,
    pub path: String,
    /// Real directory, not a link to one. Only these are walked.
    pub descend: bool,
    entry: fs::DirEntry,
}

impl Child {
    /// Builds the full entry for a match. Only matches pay for the extra stat.
    ///
    /// The kind follows symlinks so a match agrees with a browser listing of
    /// the same path; a dangling link falls back to its own metadata.
    pub fn to_file_entry(&self) -> FileEntry {
        match fs::metadata(&self.path).or_else(|_| self.entry.metadata()) {
            Ok(metadata) => {
                let is_dir = metadata.is_dir();
                let size = (!is_dir).then(|| metadata.len());
                FileEntry::with_kind(self.path.clone(), is_dir, size)
            }
            Err(error) => {
                log::debug!("no metadata for {}: {error}", self.path);
                FileEntry::with_kind(self.path.clone(), self.descend, None)
            }
        }
    }
}

/// Reads the children of `dir`, sorted by name so the walk order is
/// deterministic.
///
/// Symlinks never get `descend`, which keeps link cycles out of the walk.
/// Children whose type cannot be read are dropped.
pub(crate) fn read_children(dir: &str) -> io::Result<Vec<Child>> {
    let mut children: Vec<Child> = fs::read_dir(dir)?
        .filter_map(|item| match item {
            Ok(entry) => Some(entry),
            Err(error) => {
                log::debug!("skipping unreadable entry in {dir}: {error}");
                None
            }
        })
        .filter_map(|entry| {
            let file_type = entry.file_type().ok()?;
            let name = entry.file_name().to_string_lossy().into_owned();
            Some(Child {
                path: join_path(dir, &name),
                name,
                descend: file_type.is_dir(),
                entry,
            })
        })
        .collect();

    children.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::normalize_path;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn children_sorted_alphabetically() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("zebra.txt")).unwrap();
        File::create(temp.path().join("apple.txt")).unwrap();
        fs::create_dir(temp.path().join("mango")).unwrap();

        let dir = normalize_path(temp.path());
        let children = read_children(&dir).unwrap();
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["apple.txt", "mango", "zebra.txt"]);
        assert!(children[1].descend);
        assert_eq!(children[1].path, format!("{dir}/mango"));
    }

    #[test]
    fn match_entry_carries_size() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("data.bin"), [0u8; 5]).unwrap();

        let children = read_children(&normalize_path(temp.path())).unwrap();
        let entry = children[0].to_file_entry();
        assert_eq!(entry.size(), Some(5));
        assert_eq!(entry.name(), "data.bin");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = normalize_path(&temp.path().join("gone"));
        assert!(read_children(&missing).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_descended() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("real")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("link")).unwrap();

        let children = read_children(&normalize_path(temp.path())).unwrap();
        let link = children.iter().find(|c| c.name == "link").unwrap();
        assert!(!link.descend);
        assert!(link.to_file_entry().is_dir());
        assert_eq!(link.to_file_entry().size(), None);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_is_reported_as_a_file() {
        let temp = TempDir::new().unwrap();
        std::os::unix::fs::symlink(temp.path().join("nowhere"), temp.path().join("stale")).unwrap();

        let children = read_children(&normalize_path(temp.path())).unwrap();
        let entry = children[0].to_file_entry();
        assert!(!children[0].descend);
        assert!(!entry.is_dir());
        assert_eq!(entry.name(), "stale");
    }
}

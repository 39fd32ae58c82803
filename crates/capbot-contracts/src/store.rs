use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::CommandError;

/// File-backed ordered list of template image URLs.
///
/// The store owns only its path. Every operation re-reads the whole file
/// and every mutation rewrites it, so separate instances pointed at the
/// same file always observe the last write. Indices exposed to callers are
/// 1-based; any out-of-range index fails before the file is touched.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    path: PathBuf,
}

impl TemplateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a URL verbatim and returns the new length, which is also the
    /// 1-based position of the added entry.
    pub fn add(&self, url: &str) -> Result<usize, CommandError> {
        let mut urls = self.load()?;
        urls.push(url.to_string());
        self.save(&urls)?;
        Ok(urls.len())
    }

    pub fn list(&self) -> Result<Vec<String>, CommandError> {
        self.load()
    }

    pub fn remove(&self, index: usize) -> Result<String, CommandError> {
        let mut urls = self.load()?;
        let len = urls.len();
        if index == 0 || index > len {
            return Err(CommandError::IndexOutOfRange { index, len });
        }
        let removed = urls.remove(index - 1);
        self.save(&urls)?;
        Ok(removed)
    }

    /// Removes entries `[start, end]` inclusive. Bounds are checked
    /// strictly: a reversed range or any bound outside `[1, len]` fails
    /// and leaves the list unchanged.
    pub fn remove_range(&self, start: usize, end: usize) -> Result<usize, CommandError> {
        if start > end {
            return Err(CommandError::InvalidRangeSyntax(format!("{start}-{end}")));
        }
        let mut urls = self.load()?;
        let len = urls.len();
        if start == 0 || start > len {
            return Err(CommandError::IndexOutOfRange { index: start, len });
        }
        if end > len {
            return Err(CommandError::IndexOutOfRange { index: end, len });
        }
        urls.drain(start - 1..end);
        self.save(&urls)?;
        Ok(end - start + 1)
    }

    pub fn clear(&self) -> Result<(), CommandError> {
        self.save(&[])
    }

    fn load(&self) -> Result<Vec<String>, CommandError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(raw
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn save(&self, urls: &[String]) -> Result<(), CommandError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut contents = urls.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::TemplateStore;
    use crate::error::CommandError;

    fn seeded(urls: &[&str]) -> anyhow::Result<(tempfile::TempDir, TemplateStore)> {
        let temp = tempfile::tempdir()?;
        let store = TemplateStore::new(temp.path().join("images.txt"));
        for url in urls {
            store.add(url)?;
        }
        Ok((temp, store))
    }

    #[test]
    fn add_returns_one_based_position() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&[])?;
        assert_eq!(store.add("http://a.example/1.png")?, 1);
        assert_eq!(store.add("http://a.example/2.png")?, 2);
        assert_eq!(store.list()?.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_file_reads_as_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = TemplateStore::new(temp.path().join("never-written.txt"));
        assert!(store.list()?.is_empty());
        Ok(())
    }

    #[test]
    fn duplicates_are_allowed() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&["http://x/a.png", "http://x/a.png"])?;
        assert_eq!(store.list()?, vec!["http://x/a.png", "http://x/a.png"]);
        Ok(())
    }

    #[test]
    fn remove_preserves_relative_order() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&["http://x/a", "http://x/b", "http://x/c", "http://x/d"])?;
        let removed = store.remove(2)?;
        assert_eq!(removed, "http://x/b");
        assert_eq!(store.list()?, vec!["http://x/a", "http://x/c", "http://x/d"]);
        Ok(())
    }

    #[test]
    fn remove_out_of_range_leaves_list_unchanged() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&["http://x/a", "http://x/b"])?;
        for index in [0, 3, 99] {
            let err = store.remove(index).unwrap_err();
            assert!(matches!(err, CommandError::IndexOutOfRange { .. }));
        }
        assert_eq!(store.list()?, vec!["http://x/a", "http://x/b"]);
        Ok(())
    }

    #[test]
    fn remove_range_is_inclusive() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&["http://x/1", "http://x/2", "http://x/3", "http://x/4", "http://x/5"])?;
        assert_eq!(store.remove_range(2, 4)?, 3);
        assert_eq!(store.list()?, vec!["http://x/1", "http://x/5"]);
        Ok(())
    }

    #[test]
    fn remove_range_of_one_matches_single_remove() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&["http://x/1", "http://x/2", "http://x/3"])?;
        assert_eq!(store.remove_range(2, 2)?, 1);
        assert_eq!(store.list()?, vec!["http://x/1", "http://x/3"]);
        Ok(())
    }

    #[test]
    fn reversed_range_is_rejected_without_mutation() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&["http://x/1", "http://x/2", "http://x/3"])?;
        let err = store.remove_range(3, 1).unwrap_err();
        assert!(matches!(err, CommandError::InvalidRangeSyntax(_)));
        assert_eq!(store.list()?.len(), 3);
        Ok(())
    }

    #[test]
    fn out_of_bounds_range_is_rejected_without_mutation() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&["http://x/1", "http://x/2", "http://x/3"])?;
        assert!(matches!(
            store.remove_range(2, 9).unwrap_err(),
            CommandError::IndexOutOfRange { index: 9, len: 3 }
        ));
        assert!(matches!(
            store.remove_range(0, 2).unwrap_err(),
            CommandError::IndexOutOfRange { index: 0, len: 3 }
        ));
        assert_eq!(store.list()?.len(), 3);
        Ok(())
    }

    #[test]
    fn clear_leaves_an_explicitly_empty_store() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&["http://x/1", "http://x/2"])?;
        store.clear()?;
        assert!(store.list()?.is_empty());
        assert_eq!(fs::read_to_string(store.path())?, "");
        Ok(())
    }

    #[test]
    fn persisted_layout_is_one_url_per_line() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&["http://x/a.png", "http://x/b.png"])?;
        let raw = fs::read_to_string(store.path())?;
        assert_eq!(raw, "http://x/a.png\nhttp://x/b.png\n");
        Ok(())
    }

    #[test]
    fn round_trip_reload_preserves_order() -> anyhow::Result<()> {
        let (_temp, store) = seeded(&["http://x/1", "http://x/2", "http://x/3"])?;
        let reloaded = TemplateStore::new(store.path());
        assert_eq!(reloaded.list()?, vec!["http://x/1", "http://x/2", "http://x/3"]);
        Ok(())
    }
}

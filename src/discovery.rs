//! Shard Discovery
//!
//! Enumerates work units for the scheduler: one shard per immediate
//! subdirectory of the root, paired with the regular files that directory
//! directly contains. Archive files sitting next to the extracted
//! directories (the extractor's inputs) are excluded by extension. The
//! listing is non-recursive; a nested subdirectory inside a shard is
//! skipped with a warning rather than traversed.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{FlattenError, Result};

/// One directory of sibling documents, consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub path: PathBuf,
    /// Regular files in directory-listing order.
    pub documents: Vec<PathBuf>,
}

/// Outcome of discovery over one root directory.
#[derive(Debug, Default)]
pub struct ShardSet {
    pub shards: Vec<Shard>,
    /// Shards dropped because their listing could not be read.
    pub skipped_shards: usize,
}

/// Discoverer for extracted-archive directories under a corpus root.
#[derive(Debug, Clone)]
pub struct ShardDiscoverer {
    archive_extensions: Vec<String>,
}

impl ShardDiscoverer {
    pub fn new() -> Self {
        Self {
            archive_extensions: vec!["zip".to_string()],
        }
    }

    /// Override the archive extensions excluded at the root.
    pub fn with_archive_extensions(mut self, extensions: Vec<String>) -> Self {
        self.archive_extensions = extensions;
        self
    }

    /// Enumerate shards. Failing to list the root is fatal; failing to
    /// list one shard skips that shard and continues.
    pub async fn discover(&self, root: &Path) -> Result<ShardSet> {
        let mut read_dir = fs::read_dir(root)
            .await
            .map_err(|e| FlattenError::RootUnreadable {
                path: root.to_path_buf(),
                source: e,
            })?;

        let mut set = ShardSet::default();

        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(FlattenError::RootUnreadable {
                        path: root.to_path_buf(),
                        source: e,
                    });
                }
            };

            let entry_path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => {
                    warn!("skipping unreadable entry {}: {}", entry_path.display(), e);
                    continue;
                }
            };

            if !file_type.is_dir() {
                if self.is_archive(&entry_path) {
                    debug!("excluding unextracted archive {}", entry_path.display());
                } else {
                    debug!("ignoring non-shard file {}", entry_path.display());
                }
                continue;
            }

            match self.list_shard(&entry_path).await {
                Ok(shard) => set.shards.push(shard),
                Err(e) => {
                    warn!("skipping shard {}: {}", entry_path.display(), e);
                    set.skipped_shards += 1;
                }
            }
        }

        Ok(set)
    }

    async fn list_shard(&self, path: &Path) -> Result<Shard> {
        let mut read_dir = fs::read_dir(path)
            .await
            .map_err(|e| FlattenError::ShardUnreadable {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut documents = Vec::new();
        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(FlattenError::ShardUnreadable {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            };

            let entry_path = entry.path();
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => documents.push(entry_path),
                Ok(ft) if ft.is_dir() => {
                    warn!(
                        "nested directory {} inside shard {} is not traversed",
                        entry_path.display(),
                        path.display()
                    );
                }
                Ok(_) => {
                    debug!("ignoring non-regular file {}", entry_path.display());
                }
                Err(e) => {
                    warn!("skipping unreadable entry {}: {}", entry_path.display(), e);
                }
            }
        }

        Ok(Shard {
            path: path.to_path_buf(),
            documents,
        })
    }

    fn is_archive(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.archive_extensions.contains(&ext)
            })
            .unwrap_or(false)
    }
}

impl Default for ShardDiscoverer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;
    use tokio::fs;

    async fn create_test_root() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("2023_batch_1")).await.unwrap();
        fs::write(root.join("2023_batch_1/doc1.xml"), "<Return/>")
            .await
            .unwrap();
        fs::write(root.join("2023_batch_1/doc2.xml"), "<Return/>")
            .await
            .unwrap();

        fs::create_dir(root.join("2023_batch_2")).await.unwrap();
        fs::write(root.join("2023_batch_2/doc3.xml"), "<Return/>")
            .await
            .unwrap();
        fs::create_dir(root.join("2023_batch_2/nested"))
            .await
            .unwrap();
        fs::write(root.join("2023_batch_2/nested/buried.xml"), "<Return/>")
            .await
            .unwrap();

        // Unextracted archives and stray files at the root.
        fs::write(root.join("2023_batch_3.zip"), "PK...").await.unwrap();
        fs::write(root.join("2023_batch_3.ZIP"), "PK...").await.unwrap();
        fs::write(root.join("notes.txt"), "stray").await.unwrap();

        temp_dir
    }

    #[tokio::test]
    async fn test_discovers_one_shard_per_subdirectory() {
        let temp_dir = create_test_root().await;

        let set = ShardDiscoverer::new()
            .discover(temp_dir.path())
            .await
            .unwrap();

        assert_eq!(set.shards.len(), 2);
        assert_eq!(set.skipped_shards, 0);

        let names: HashSet<String> = set
            .shards
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains("2023_batch_1"));
        assert!(names.contains("2023_batch_2"));
    }

    #[tokio::test]
    async fn test_archives_and_stray_files_excluded() {
        let temp_dir = create_test_root().await;

        let set = ShardDiscoverer::new()
            .discover(temp_dir.path())
            .await
            .unwrap();

        for shard in &set.shards {
            assert!(!shard.path.to_string_lossy().contains(".zip"));
        }
    }

    #[tokio::test]
    async fn test_nested_directories_not_traversed() {
        let temp_dir = create_test_root().await;

        let set = ShardDiscoverer::new()
            .discover(temp_dir.path())
            .await
            .unwrap();

        let batch_2 = set
            .shards
            .iter()
            .find(|s| s.path.ends_with("2023_batch_2"))
            .unwrap();

        assert_eq!(batch_2.documents.len(), 1);
        assert!(batch_2.documents[0].ends_with("doc3.xml"));
    }

    #[tokio::test]
    async fn test_empty_shard_is_still_a_shard() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("empty_batch"))
            .await
            .unwrap();

        let set = ShardDiscoverer::new()
            .discover(temp_dir.path())
            .await
            .unwrap();

        assert_eq!(set.shards.len(), 1);
        assert!(set.shards[0].documents.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_root_is_fatal() {
        let result = ShardDiscoverer::new()
            .discover(Path::new("/nonexistent/corpus/root"))
            .await;

        assert!(matches!(result, Err(FlattenError::RootUnreadable { .. })));
    }

    #[tokio::test]
    async fn test_custom_archive_extensions() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("batch.tgz"), "...").await.unwrap();
        fs::create_dir(temp_dir.path().join("batch")).await.unwrap();

        let set = ShardDiscoverer::new()
            .with_archive_extensions(vec!["tgz".to_string()])
            .discover(temp_dir.path())
            .await
            .unwrap();

        assert_eq!(set.shards.len(), 1);
    }
}

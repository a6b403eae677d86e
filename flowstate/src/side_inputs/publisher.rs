//! Publication of side-input data to a globally visible location.

use crate::core::OutputTag;
use crate::errors::Result;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Writes a window's worth of a side-input-producing collection somewhere
/// other workers can read it.
///
/// Execution contexts built without a publisher report the capability as
/// unsupported.
pub trait ViewDataPublisher: Send + Sync {
    /// Publishes encoded data for one window, replacing any earlier
    /// publication for the same tag and window.
    fn publish(&self, tag: &OutputTag, window: &[u8], data: &[u8]) -> Result<()>;
}

/// A recorded publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedViewData {
    /// The collection tag.
    pub tag: OutputTag,
    /// The encoded window.
    pub window: Vec<u8>,
    /// The encoded data.
    pub data: Vec<u8>,
}

/// Keeps publications in memory.
#[derive(Debug, Default)]
pub struct InMemoryViewDataPublisher {
    published: Mutex<Vec<PublishedViewData>>,
}

impl InMemoryViewDataPublisher {
    /// Creates a new publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every current publication in first-publish order.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedViewData> {
        self.published.lock().clone()
    }

    /// Returns the data published for a tag and encoded window.
    #[must_use]
    pub fn get(&self, tag: &OutputTag, window: &[u8]) -> Option<Vec<u8>> {
        self.published
            .lock()
            .iter()
            .find(|entry| &entry.tag == tag && entry.window == window)
            .map(|entry| entry.data.clone())
    }
}

impl ViewDataPublisher for InMemoryViewDataPublisher {
    fn publish(&self, tag: &OutputTag, window: &[u8], data: &[u8]) -> Result<()> {
        let mut published = self.published.lock();
        if let Some(existing) = published
            .iter_mut()
            .find(|entry| &entry.tag == tag && entry.window == window)
        {
            existing.data = data.to_vec();
        } else {
            published.push(PublishedViewData {
                tag: tag.clone(),
                window: window.to_vec(),
                data: data.to_vec(),
            });
        }
        Ok(())
    }
}

/// Publishes each window to `<root>/<sha256 of tag>/<sha256 of window>.bin`.
#[derive(Debug, Clone)]
pub struct DirectoryViewDataPublisher {
    root: PathBuf,
}

impl DirectoryViewDataPublisher {
    /// Creates a publisher rooted at a directory. The directory is created
    /// on first publication.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file a tag and encoded window are published to.
    #[must_use]
    pub fn path_for(&self, tag: &OutputTag, window: &[u8]) -> PathBuf {
        self.root
            .join(hex::encode(Sha256::digest(tag.name().as_bytes())))
            .join(format!("{}.bin", hex::encode(Sha256::digest(window))))
    }

    /// Reads back a publication, if present.
    pub fn read(&self, tag: &OutputTag, window: &[u8]) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(tag, window)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ViewDataPublisher for DirectoryViewDataPublisher {
    fn publish(&self, tag: &OutputTag, window: &[u8], data: &[u8]) -> Result<()> {
        let path = self.path_for(tag, window);
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        // Readers never observe a partial file, and concurrent writers each
        // stage into their own file.
        let mut staging = tempfile::NamedTempFile::new_in(parent)?;
        staging.write_all(data)?;
        staging.persist(&path).map_err(|e| e.error)?;

        tracing::debug!(
            tag = %tag,
            path = %path.display(),
            bytes = data.len(),
            "Published view data"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_replaces_same_window() {
        let publisher = InMemoryViewDataPublisher::new();
        let tag = OutputTag::new("view");

        publisher.publish(&tag, b"w1", b"a").unwrap();
        publisher.publish(&tag, b"w2", b"b").unwrap();
        publisher.publish(&tag, b"w1", b"c").unwrap();

        assert_eq!(publisher.published().len(), 2);
        assert_eq!(publisher.get(&tag, b"w1"), Some(b"c".to_vec()));
        assert_eq!(publisher.get(&tag, b"w3"), None);
    }

    #[test]
    fn test_directory_publish_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = DirectoryViewDataPublisher::new(dir.path());
        let tag = OutputTag::new("side/prices");

        assert_eq!(publisher.read(&tag, b"window").unwrap(), None);
        publisher.publish(&tag, b"window", b"payload").unwrap();

        let path = publisher.path_for(&tag, b"window");
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());
        assert_eq!(
            publisher.read(&tag, b"window").unwrap(),
            Some(b"payload".to_vec())
        );
    }

    #[test]
    fn test_path_is_stable_per_window() {
        let publisher = DirectoryViewDataPublisher::new("/tmp/views");
        let tag = OutputTag::new("v");
        assert_eq!(publisher.path_for(&tag, b"a"), publisher.path_for(&tag, b"a"));
        assert_ne!(publisher.path_for(&tag, b"a"), publisher.path_for(&tag, b"b"));
    }

    #[test]
    fn test_tag_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let publisher = DirectoryViewDataPublisher::new(&root);

        for name in ["..", ".", "../outside", "/abs"] {
            let tag = OutputTag::new(name);
            publisher.publish(&tag, b"w", name.as_bytes()).unwrap();

            let path = publisher.path_for(&tag, b"w");
            assert_eq!(path.parent().and_then(Path::parent), Some(root.as_path()));
            assert_eq!(publisher.read(&tag, b"w").unwrap(), Some(name.as_bytes().to_vec()));
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_distinct_tags_never_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = DirectoryViewDataPublisher::new(dir.path());
        let slashed = OutputTag::new("a/b");
        let underscored = OutputTag::new("a_b");

        publisher.publish(&slashed, b"w", b"first").unwrap();
        publisher.publish(&underscored, b"w", b"second").unwrap();

        assert_ne!(publisher.path_for(&slashed, b"w"), publisher.path_for(&underscored, b"w"));
        assert_eq!(publisher.read(&slashed, b"w").unwrap(), Some(b"first".to_vec()));
        assert_eq!(publisher.read(&underscored, b"w").unwrap(), Some(b"second".to_vec()));
    }

    #[test]
    fn test_concurrent_publishes_to_one_window() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = DirectoryViewDataPublisher::new(dir.path());
        let tag = OutputTag::new("v");
        let payloads: Vec<Vec<u8>> = (0..8_u8).map(|n| vec![n; 4096]).collect();

        std::thread::scope(|scope| {
            for payload in &payloads {
                let publisher = &publisher;
                let tag = &tag;
                scope.spawn(move || {
                    for _ in 0..20 {
                        publisher.publish(tag, b"w", payload).unwrap();
                    }
                });
            }
        });

        let read = publisher.read(&tag, b"w").unwrap().unwrap();
        assert!(payloads.contains(&read));
        let staged = fs::read_dir(publisher.path_for(&tag, b"w").parent().unwrap())
            .unwrap()
            .count();
        assert_eq!(staged, 1);
    }
}

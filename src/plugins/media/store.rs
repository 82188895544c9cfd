use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// URL prefix under which stored blobs are served.
pub const MEDIA_URL_PREFIX: &str = "/media/files";

/// Blob storage for uploaded images and videos. Callers keep only the
/// returned reference.
#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    async fn put(&self, original_name: Option<&str>, bytes: &[u8]) -> anyhow::Result<String>;

    /// True when `reference` was handed out by `put` and the blob is still there.
    async fn exists(&self, reference: &str) -> anyhow::Result<bool>;

    /// Drops a stored blob. Unknown references are ignored.
    async fn remove(&self, reference: &str) -> anyhow::Result<()>;

    fn root(&self) -> &Path;
}

/// The stored file name behind a reference, if the reference is one of ours.
fn file_name_of(reference: &str) -> Option<&str> {
    let name = reference.strip_prefix(MEDIA_URL_PREFIX)?.strip_prefix('/')?;
    let plain = !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    plain.then_some(name)
}

pub type DynMediaStore = Arc<dyn MediaStore>;

pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn into_arc(self) -> DynMediaStore {
        Arc::new(self)
    }
}

/// Keeps a short alphanumeric extension from the client's file name.
fn extension_of(original_name: Option<&str>) -> String {
    original_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string())
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn put(&self, original_name: Option<&str>, bytes: &[u8]) -> anyhow::Result<String> {
        anyhow::ensure!(!bytes.is_empty(), "refusing to store an empty upload");

        tokio::fs::create_dir_all(&self.root).await?;
        let fname = format!("{}-{}.{}", Uuid::new_v4(), chrono::Utc::now().timestamp(), extension_of(original_name));
        tokio::fs::write(self.root.join(&fname), bytes).await?;
        Ok(format!("{MEDIA_URL_PREFIX}/{fname}"))
    }

    async fn exists(&self, reference: &str) -> anyhow::Result<bool> {
        let Some(name) = file_name_of(reference) else {
            return Ok(false);
        };
        match tokio::fs::metadata(self.root.join(name)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, reference: &str) -> anyhow::Result<()> {
        let Some(name) = file_name_of(reference) else {
            return Ok(());
        };
        match tokio::fs::remove_file(self.root.join(name)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

/// Keeps references only, for tests that never touch the filesystem.
#[derive(Default)]
pub struct InMemoryMediaStore {
    refs: Mutex<HashSet<String>>,
    root: PathBuf,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_arc(self) -> DynMediaStore {
        Arc::new(self)
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn put(&self, original_name: Option<&str>, bytes: &[u8]) -> anyhow::Result<String> {
        anyhow::ensure!(!bytes.is_empty(), "refusing to store an empty upload");
        let reference = format!("{MEDIA_URL_PREFIX}/{}.{}", Uuid::new_v4(), extension_of(original_name));
        self.refs.lock().insert(reference.clone());
        Ok(reference)
    }

    async fn exists(&self, reference: &str) -> anyhow::Result<bool> {
        Ok(self.refs.lock().contains(reference))
    }

    async fn remove(&self, reference: &str) -> anyhow::Result<()> {
        self.refs.lock().remove(reference);
        Ok(())
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(extension_of(Some("clip.MP4")), "mp4");
        assert_eq!(extension_of(Some("../../etc/passwd")), "bin");
        assert_eq!(extension_of(Some("x.p/g")), "bin");
        assert_eq!(extension_of(None), "bin");
    }

    #[tokio::test]
    async fn stores_bytes_under_the_root() -> anyhow::Result<()> {
        let root = std::env::temp_dir().join(format!("instaworld-media-{}", Uuid::new_v4()));
        let store = LocalMediaStore::new(&root);

        let reference = store.put(Some("a.png"), b"png-bytes").await?;
        let fname = reference.strip_prefix("/media/files/").expect("prefixed reference");
        assert!(fname.ends_with(".png"));
        assert_eq!(tokio::fs::read(root.join(fname)).await?, b"png-bytes");

        assert!(store.put(Some("b.png"), b"").await.is_err());
        tokio::fs::remove_dir_all(&root).await?;
        Ok(())
    }

    #[tokio::test]
    async fn only_stored_blobs_resolve() -> anyhow::Result<()> {
        let root = std::env::temp_dir().join(format!("instaworld-media-{}", Uuid::new_v4()));
        let store = LocalMediaStore::new(&root);
        let reference = store.put(Some("a.mp4"), b"video").await?;

        assert!(store.exists(&reference).await?);
        assert!(!store.exists("https://elsewhere.example/x.png").await?);
        assert!(!store.exists("/media/files/never-uploaded.png").await?);
        assert!(!store.exists("/media/files/../secret").await?);
        assert!(!store.exists("/media/files/").await?);

        store.remove(&reference).await?;
        assert!(!store.exists(&reference).await?);
        store.remove(&reference).await?;
        tokio::fs::remove_dir_all(&root).await?;
        Ok(())
    }
}

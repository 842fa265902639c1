use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::{fs, task::spawn_blocking};
use tracing::{debug, error};

use crate::{
    BlobKind, BlobPath, BlobStore, parse_data_url,
    error::{BlobError, BlobResult},
};

#[inline]
fn hex(bytes: &[u8]) -> String {
    base16ct::lower::encode_string(bytes)
}

async fn ensure_dir(dir: &Path) -> BlobResult<()> {
    match fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => {
            error!("Not a directory: {dir:?}");
            Err(BlobError::IoError(std::io::Error::other(format!(
                "{dir:?} is not a directory"
            ))))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).await?;
            Ok(())
        }
        Err(e) => {
            error!("Failed to stat {dir:?}: {e}");
            Err(e.into())
        }
    }
}

struct FileBlobStoreInner {
    root: PathBuf,
    base_url: String,
}

/// Stores images as files under root directory, files are expected to be served on `base_url`
#[derive(Clone)]
pub struct FileBlobStore {
    inner: Arc<FileBlobStoreInner>,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(FileBlobStoreInner {
                root: root.into(),
                base_url: base_url.into(),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn local_path(&self, url: &str) -> BlobResult<PathBuf> {
        let path = BlobPath::from_url(url, &self.inner.base_url)?;
        Ok(self.inner.root.join(path.relative()))
    }
}

impl BlobStore for FileBlobStore {
    async fn upload(&self, kind: BlobKind, payload: &str) -> BlobResult<String> {
        let image = parse_data_url(payload)?;
        let name = format!("{}.{}", uuid::Uuid::new_v4(), image.extension());
        let path = BlobPath::new(kind, name)?;
        let dir = self.inner.root.join(kind.as_str());
        ensure_dir(&dir).await?;

        let final_path = self.inner.root.join(path.relative());
        let digest = Sha256::digest(&image.data);
        let size = image.data.len();
        // written to temporary file first, so that incomplete image is never visible
        spawn_blocking(move || -> BlobResult<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            std::io::Write::write_all(&mut tmp, &image.data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&final_path).map_err(|e| e.error)?;
            Ok(())
        })
        .await??;

        let url = path.url(&self.inner.base_url);
        debug!("Stored {size} bytes with hash {} as {url}", hex(&digest));
        Ok(url)
    }

    async fn destroy(&self, url: &str) -> BlobResult<()> {
        let local_path = self.local_path(url)?;
        fs::remove_file(&local_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(url.to_string())
            } else {
                e.into()
            }
        })?;
        debug!("Removed blob {url}");
        Ok(())
    }
}

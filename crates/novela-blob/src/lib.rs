#![allow(async_fn_in_trait)]

use base64::{Engine as _, engine::general_purpose::STANDARD};
use error::{BlobError, BlobResult};
use tracing::debug;

pub mod error;
pub mod file_store;
pub mod memory_store;

pub use file_store::FileBlobStore;
pub use memory_store::MemoryBlobStore;

const COVERS_PATH_PREFIX: &str = "covers";
const PROFILES_PATH_PREFIX: &str = "profiles";

pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Cover,
    Profile,
}

impl BlobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobKind::Cover => COVERS_PATH_PREFIX,
            BlobKind::Profile => PROFILES_PATH_PREFIX,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            COVERS_PATH_PREFIX => Some(BlobKind::Cover),
            PROFILES_PATH_PREFIX => Some(BlobKind::Profile),
            _ => None,
        }
    }
}

/// Image decoded from `data:` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime: String,
    pub data: Vec<u8>,
}

impl ImageData {
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}

fn is_supported_mime(mime: &str) -> bool {
    matches!(mime, "image/png" | "image/jpeg" | "image/gif" | "image/webp")
}

/// Parses `data:image/png;base64,....` payload as sent by browser clients
pub fn parse_data_url(payload: &str) -> BlobResult<ImageData> {
    let rest = payload
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| BlobError::InvalidPayload("not a data URL".into()))?;
    let (meta, encoded) = rest
        .split_once(',')
        .ok_or_else(|| BlobError::InvalidPayload("missing data".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| BlobError::InvalidPayload("only base64 encoding is supported".into()))?
        .to_ascii_lowercase();
    if !is_supported_mime(&mime) {
        return Err(BlobError::UnsupportedType(mime));
    }
    if encoded.len() / 4 * 3 > MAX_IMAGE_SIZE {
        return Err(BlobError::TooBig(encoded.len() / 4 * 3));
    }
    let data = STANDARD
        .decode(encoded)
        .map_err(|e| BlobError::InvalidPayload(e.to_string()))?;
    if data.is_empty() {
        return Err(BlobError::InvalidPayload("empty image".into()));
    }
    debug!("Decoded {} bytes of {mime}", data.len());
    Ok(ImageData { mime, data })
}

fn is_name_invalid(s: &str) -> bool {
    s.is_empty()
        || s.starts_with('.')
        || s.len() > MAX_NAME_LEN
        || s.chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_ascii_control())
}

/// Relative location of stored blob - `prefix/name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPath {
    pub kind: BlobKind,
    pub name: String,
}

impl BlobPath {
    pub fn new(kind: BlobKind, name: impl Into<String>) -> BlobResult<Self> {
        let name = name.into();
        if is_name_invalid(&name) {
            debug!("Invalid blob name: {name}");
            return Err(BlobError::InvalidUrl(name));
        }
        Ok(BlobPath { kind, name })
    }

    /// Parses public URL, which must start with `base_url`
    pub fn from_url(url: &str, base_url: &str) -> BlobResult<Self> {
        let invalid = || BlobError::InvalidUrl(url.to_string());
        let rest = url
            .strip_prefix(base_url.trim_end_matches('/'))
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(invalid)?;
        let (prefix, name) = rest.split_once('/').ok_or_else(invalid)?;
        let kind = BlobKind::from_prefix(prefix).ok_or_else(invalid)?;
        BlobPath::new(kind, name)
    }

    pub fn relative(&self) -> String {
        format!("{}/{}", self.kind.as_str(), self.name)
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.relative())
    }
}

/// Image storage - images are uploaded as data URLs and referenced by public URLs afterwards
pub trait BlobStore {
    /// Stores image, returns its public URL
    async fn upload(&self, kind: BlobKind, payload: &str) -> BlobResult<String>;
    /// Releases image referenced by public URL
    async fn destroy(&self, url: &str) -> BlobResult<()>;
}

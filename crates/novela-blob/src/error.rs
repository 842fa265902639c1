pub type BlobResult<T> = std::result::Result<T, BlobError>;

#[derive(thiserror::Error, Debug)]
pub enum BlobError {
    #[error("Invalid image payload: {0}")]
    InvalidPayload(String),
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("Image too big: {0} bytes")]
    TooBig(usize),
    #[error("Invalid blob URL: {0}")]
    InvalidUrl(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoinError(#[from] tokio::task::JoinError),
}

impl BlobError {
    /// Error caused by what client sent, not by the store itself
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BlobError::InvalidPayload(_) | BlobError::UnsupportedType(_) | BlobError::TooBig(_)
        )
    }
}

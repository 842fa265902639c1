use std::sync::Arc;

use novela_auth::token::TokenManager;
use novela_blob::FileBlobStore;
use novela_dal::Pool;

use crate::catalog::CatalogService;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_UPLOAD_LIMIT_MB: usize = 16;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(
        app_config: AppConfig,
        pool: Pool,
        tokens: TokenManager,
        blobs: FileBlobStore,
    ) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                pool,
                tokens,
                blobs,
                app_config,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }

    pub fn blobs(&self) -> &FileBlobStore {
        &self.state.blobs
    }

    pub fn catalog(&self) -> CatalogService<FileBlobStore> {
        CatalogService::new(self.pool().clone(), self.blobs().clone())
    }
}

struct AppStateInner {
    pool: Pool,
    tokens: TokenManager,
    blobs: FileBlobStore,
    app_config: AppConfig,
}

pub struct AppConfig {
    pub default_page_size: u32,
    /// `Secure` attribute of session cookie, switched off only for plain HTTP development setups
    pub secure_cookies: bool,
    /// Limit of request body, images are sent inline as `data:` URLs
    pub upload_limit_mb: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            default_page_size: DEFAULT_PAGE_SIZE,
            secure_cookies: true,
            upload_limit_mb: DEFAULT_UPLOAD_LIMIT_MB,
        }
    }
}

use axum::body::Body;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::{header, Request, Response};
use novela_auth::token::TokenManager;
use novela_blob::FileBlobStore;
use novela_dal::{
    genre::GenreRepository,
    user::{CreateUser, UserRepository},
    Pool,
};
use novela_types::claim::ApiClaim;
use tempfile::TempDir;

use crate::{
    rest_api::api_router,
    state::{AppConfig, AppState},
};

pub const TEST_SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

pub async fn init_db() -> Pool {
    let pool = novela_dal::new_pool("sqlite::memory:").await.unwrap();
    novela_dal::migrate(&pool).await.unwrap();
    let genres = GenreRepository::new(pool.clone());
    for name in ["fantasy", "romance", "sci-fi"] {
        genres.ensure(name).await.unwrap();
    }
    pool
}

pub async fn create_user(pool: &Pool, username: &str, moderator: bool) -> i64 {
    UserRepository::new(pool.clone())
        .create(
            CreateUser {
                username: username.parse().unwrap(),
                email: format!("{username}@example.com").parse().unwrap(),
                password: "password123".to_string(),
            },
            moderator,
        )
        .await
        .unwrap()
        .id
}

pub fn png_data_url() -> String {
    let data: Vec<u8> = (0..64u8).collect();
    format!("data:image/png;base64,{}", STANDARD.encode(data))
}

pub struct TestApp {
    pub router: axum::Router,
    pub state: AppState,
    pub media_dir: TempDir,
}

impl TestApp {
    pub fn bearer(&self, user_id: i64) -> String {
        let token = self.state.tokens().issue(ApiClaim::for_user(user_id)).unwrap();
        format!("Bearer {token}")
    }
}

pub async fn test_app() -> TestApp {
    let pool = init_db().await;
    let media_dir = tempfile::tempdir().unwrap();
    let tokens = TokenManager::new(TEST_SECRET, std::time::Duration::from_secs(3600)).unwrap();
    let blobs = FileBlobStore::new(media_dir.path(), "/media");
    let mut config = AppConfig::default();
    config.secure_cookies = false;
    config.default_page_size = 10;
    let state = AppState::new(config, pool, tokens, blobs);
    let router = axum::Router::new()
        .nest("/api", api_router())
        .with_state(state.clone());
    TestApp {
        router,
        state,
        media_dir,
    }
}

pub fn json_request(
    method: http::Method,
    uri: &str,
    auth: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 10 * 1024 * 1024)
        .await
        .unwrap();
    if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

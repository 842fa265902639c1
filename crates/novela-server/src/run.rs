use std::path::Path;

use crate::config::ServerConfig;
use crate::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::{response::IntoResponse, routing::get, Router};
use futures::FutureExt;
use novela_app::rest_api::api_router;
use novela_app::state::{AppConfig, AppState};
use novela_blob::FileBlobStore;
use tokio::{fs, io::AsyncWriteExt as _};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

pub const MEDIA_PATH: &str = "/media";
const SECRET_LEN: usize = 32;

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if args.cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        "Listening on {}, public URL {}",
        listener.local_addr()?,
        args.base_url
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn main_router(state: AppState) -> Router<()> {
    let body_limit = state.config().upload_limit_mb * 1024 * 1024;
    let media = ServeDir::new(state.blobs().root());
    Router::new()
        .nest("/api", api_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .nest_service(MEDIA_PATH, media)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.backend.data_dir();
    if !data_dir.is_dir() {
        fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {data_dir:?}");
    }
    let media_dir = config.backend.media_dir();
    if !media_dir.is_dir() {
        fs::create_dir_all(&media_dir).await?;
        info!("Created media directory {media_dir:?}");
    }

    let app_config: AppConfig = config.into();

    let pool = novela_dal::new_pool(&config.backend.database_url()).await?;
    novela_dal::migrate(&pool).await?;

    let secret = read_secret(&data_dir).await?;
    let tokens = novela_auth::token::TokenManager::new(&secret, config.token_validity)?;
    let blobs = FileBlobStore::new(media_dir, MEDIA_PATH);
    Ok(AppState::new(app_config, pool, tokens, blobs))
}

async fn read_secret(data_dir: &Path) -> Result<Vec<u8>, std::io::Error> {
    let secret_file = data_dir.join("secret");

    let secret = if fs::try_exists(&secret_file).await? {
        fs::read(&secret_file).await?
    } else {
        let random_bytes = rand::random::<[u8; SECRET_LEN]>();
        #[cfg(unix)]
        let mut file = {
            use std::fs::OpenOptions;
            use std::os::unix::fs::OpenOptionsExt;
            {
                // Only the current user may read the secret
                let _f = OpenOptions::new()
                    .mode(0o600)
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&secret_file)?;
            }
            fs::File::options().write(true).open(&secret_file).await?
        };
        #[cfg(not(unix))]
        let mut file = fs::File::create(&secret_file).await?;

        file.write_all(&random_bytes).await?;
        info!("Generated new token secret");
        random_bytes.to_vec()
    };
    Ok(secret)
}

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};
use novela_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::Url;
use serde_json::{Value, json};
use tempfile::TempDir;
use tracing::debug;

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "novela-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
        "--secure-cookies",
        "false",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Prepares config in fresh temporary data directory, with migrated database and basic genres
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    let (config, guard) = test_config(test_name, &base_dir)?;
    let pool = novela_dal::new_pool(&config.backend.database_url()).await?;
    novela_dal::migrate(&pool).await?;
    let genres = novela_dal::genre::GenreRepository::new(pool.clone());
    for name in ["fantasy", "romance", "mystery"] {
        genres.ensure(name).await?;
    }
    pool.close().await;
    Ok((config, guard))
}

/// Starts server in background task and waits until it answers health check
pub async fn spawn_server(config: ServerConfig) -> Result<()> {
    let health_url = config.base_url.join("health")?;
    tokio::spawn(async move {
        if let Err(e) = novela_server::run(config).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start in time"))
}

/// Client keeping session cookie between requests
pub fn session_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder().cookie_store(true).build()?;
    Ok(client)
}

pub async fn register(
    client: &reqwest::Client,
    base_url: &Url,
    username: &str,
    password: &str,
) -> Result<reqwest::Response> {
    let payload = json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": password,
    });
    let response = client
        .post(base_url.join("api/auth/register")?)
        .json(&payload)
        .send()
        .await?;
    Ok(response)
}

pub async fn login(
    client: &reqwest::Client,
    base_url: &Url,
    username: &str,
    password: &str,
) -> Result<Value> {
    let response = client
        .post(base_url.join("api/auth/login")?)
        .json(&json!({"username": username, "password": password}))
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}

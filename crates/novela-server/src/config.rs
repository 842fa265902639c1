use std::time::Duration;

use crate::Result;
pub use clap::Parser;
use novela_app::state::AppConfig;
use novela_types::config::BackendConfig;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "NOVELA_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "NOVELA_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "NOVELA_BASE_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of server, as visible to clients"
    )]
    pub base_url: Url,

    #[command(flatten)]
    pub backend: BackendConfig,

    #[arg(
        long,
        env = "NOVELA_TOKEN_VALIDITY",
        default_value = "30 days",
        help = "Session token validity in human friendly format (e.g. 1d, 1h, 1m, 1s - or combined)",
        value_parser = humantime::parse_duration
    )]
    pub token_validity: Duration,

    #[arg(
        long,
        env = "NOVELA_UPLOAD_LIMIT_MB",
        default_value = "16",
        help = "Maximum request size in MB, images are uploaded inline"
    )]
    pub upload_limit_mb: usize,

    #[arg(
        long,
        env = "NOVELA_DEFAULT_PAGE_SIZE",
        default_value = "20",
        help = "Default page size"
    )]
    pub default_page_size: u32,

    #[arg(long, env = "NOVELA_CORS", help = "Enable permissive CORS, for development")]
    pub cors: bool,

    #[arg(
        long,
        env = "NOVELA_SECURE_COOKIES",
        default_value_t = true,
        action = clap::ArgAction::Set,
        help = "Set Secure attribute on session cookie, disable only for plain HTTP"
    )]
    pub secure_cookies: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        AppConfig {
            default_page_size: config.default_page_size,
            secure_cookies: config.secure_cookies,
            upload_limit_mb: config.upload_limit_mb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config =
            ServerConfig::try_parse_from(["novela-server", "--data-dir", "/tmp/novela"]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.token_validity, Duration::from_secs(30 * 24 * 3600));
        assert!(config.secure_cookies);
        assert!(!config.cors);
        assert_eq!(config.backend.database_url(), "sqlite:///tmp/novela/novela.db");

        let app_config: AppConfig = (&config).into();
        assert_eq!(app_config.default_page_size, 20);
        assert_eq!(app_config.upload_limit_mb, 16);
        assert!(app_config.secure_cookies);
    }

    #[test]
    fn test_app_config_follows_server_config() {
        let config = ServerConfig::try_parse_from([
            "novela-server",
            "--base-url",
            "https://novels.example.com",
            "--default-page-size",
            "5",
            "--upload-limit-mb",
            "2",
            "--secure-cookies",
            "false",
        ])
        .unwrap();
        assert_eq!(config.base_url.as_str(), "https://novels.example.com/");

        let app_config = AppConfig::from(&config);
        assert_eq!(app_config.default_page_size, 5);
        assert_eq!(app_config.upload_limit_mb, 2);
        assert!(!app_config.secure_cookies);

        let defaults = AppConfig::default();
        assert_eq!(defaults.default_page_size, 20);
        assert!(defaults.secure_cookies);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::try_parse_from([
            "novela-server",
            "--port",
            "8080",
            "--token-validity",
            "1h 30m",
            "--secure-cookies",
            "false",
            "--cors",
            "--media-dir",
            "/srv/novela-media",
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.token_validity, Duration::from_secs(5400));
        assert!(!config.secure_cookies);
        assert!(config.cors);
        assert_eq!(
            config.backend.media_dir(),
            std::path::PathBuf::from("/srv/novela-media")
        );
    }
}

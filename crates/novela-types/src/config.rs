use clap::Parser;
use std::path::PathBuf;

/// Storage locations shared by the server and the CLI
#[derive(Debug, Clone, Parser)]
pub struct BackendConfig {
    #[arg(
        long,
        env = "NOVELA_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/novela.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "NOVELA_DATA_DIR",
        help = "Data directory (databases, media, token secret), default is system default like ~/.local/share/novela",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "NOVELA_MEDIA_DIR",
        help = "Directory for uploaded images (covers, profile pictures), default data_dir/media"
    )]
    media_dir: Option<PathBuf>,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("novela"))
        .unwrap_or_else(|| PathBuf::from("novela"))
        .to_string_lossy()
        .to_string()
}

impl BackendConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn media_dir(&self) -> PathBuf {
        self.media_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("media"))
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/novela.db", self.data_dir))
    }
}

use clap::Parser;
use novela_types::config::BackendConfig;
use tracing::info;

use crate::commands::{open_db, Executor};

#[derive(Parser, Debug)]
pub struct SeedGenresCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(required = true, help = "Genre names, existing genres are kept")]
    pub names: Vec<String>,
}

impl Executor for SeedGenresCmd {
    async fn run(self) -> anyhow::Result<()> {
        let pool = open_db(&self.backend).await?;
        let repository = novela_dal::genre::GenreRepository::new(pool);
        for name in self.names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let genre = repository.ensure(name).await?;
            info!("Genre {} has id {}", genre.name, genre.id);
        }
        Ok(())
    }
}

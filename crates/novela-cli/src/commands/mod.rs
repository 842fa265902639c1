use novela_dal::Pool;
use novela_types::config::BackendConfig;

pub mod create_user;
pub mod seed_genres;

#[allow(async_fn_in_trait)]
pub trait Executor {
    async fn run(self) -> anyhow::Result<()>;
}

/// Opens the database and applies pending migrations
pub(crate) async fn open_db(backend: &BackendConfig) -> anyhow::Result<Pool> {
    let data_dir = backend.data_dir();
    if !data_dir.is_dir() {
        tokio::fs::create_dir_all(&data_dir).await?;
    }
    let pool = novela_dal::new_pool(&backend.database_url()).await?;
    novela_dal::migrate(&pool).await?;
    Ok(pool)
}

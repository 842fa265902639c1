use clap::Parser;
use garde::Validate as _;
use novela_types::{
    config::BackendConfig,
    general::{Username, ValidEmail},
};
use tracing::info;

use crate::commands::{open_db, Executor};

#[derive(Parser, Debug)]
pub struct CreateUserCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(short, long, help = "User name, used for login")]
    pub username: Username,
    #[arg(short, long, help = "User email")]
    pub email: ValidEmail,
    #[arg(short, long, help = "User password, at least 8 characters")]
    pub password: String,
    #[arg(short, long, help = "Grant moderator rights (can manage novels and chapters)")]
    pub moderator: bool,
}

impl Executor for CreateUserCmd {
    async fn run(self) -> anyhow::Result<()> {
        let pool = open_db(&self.backend).await?;
        let repository = novela_dal::user::UserRepository::new(pool);
        let new_user = novela_dal::user::CreateUser {
            username: self.username,
            email: self.email,
            password: self.password,
        };
        new_user.validate()?;
        let user = repository.create(new_user, self.moderator).await?;
        info!(
            "Created user {} with id {} (moderator: {})",
            user.username, user.id, self.moderator
        );

        Ok(())
    }
}

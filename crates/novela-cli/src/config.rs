use clap::{Parser, Subcommand};

use crate::commands::{create_user::CreateUserCmd, seed_genres::SeedGenresCmd};

#[derive(Parser)]
#[command(
    version,
    about,
    long_about = "CLI for novela - administrative commands working directly on the novela database."
)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    CreateUser(CreateUserCmd),
    SeedGenres(SeedGenresCmd),
}

impl crate::commands::Executor for Command {
    async fn run(self) -> anyhow::Result<()> {
        match self {
            Command::CreateUser(cmd) => cmd.run().await,
            Command::SeedGenres(cmd) => cmd.run().await,
        }
    }
}

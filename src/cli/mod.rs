pub mod commands;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "devconnect-api")]
#[command(about = "DevConnect API - developer profiles and posts")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to bind, overrides PORT/API_PORT")]
        port: Option<u16>,

        #[arg(
            long,
            value_name = "NAME",
            help = "Seed a user into the in-memory store and log a token for it"
        )]
        seed_user: Option<String>,
    },

    #[command(about = "Apply database migrations to DATABASE_URL")]
    Migrate,

    #[command(about = "Issue a token for an existing user id")]
    Token {
        #[arg(help = "24-character hex user id")]
        user_id: String,
    },
}

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = AppConfig::from_env()?;

    match cli.command {
        Some(Commands::Serve { port, seed_user }) => commands::serve::handle(config, port, seed_user).await,
        None => commands::serve::handle(config, None, None).await,
        Some(Commands::Migrate) => commands::migrate::handle(config).await,
        Some(Commands::Token { user_id }) => commands::token::handle(config, &user_id, output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["devconnect-api"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_serve_port() {
        let cli = Cli::try_parse_from(["devconnect-api", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(8080), .. })));
    }

    #[test]
    fn token_requires_user_id() {
        assert!(Cli::try_parse_from(["devconnect-api", "token"]).is_err());
        let cli = Cli::try_parse_from(["devconnect-api", "--json", "token", "5f1d7f3e9c1a2b3c4d5e6f70"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
    }
}

//! Command-line interface: server startup, schema management, and user and
//! client provisioning.

use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use crate::config::Config;
use crate::models::{GRANT_TYPE_PASSWORD, GRANT_TYPE_REFRESH_TOKEN};
use crate::repositories::{PgClientRepository, PgUserRepository};
use crate::services::{ClientService, UserService};

#[derive(Parser)]
#[command(name = "identity-service", version, about = "OAuth2 authorization server")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Database schema management
    #[command(subcommand)]
    Db(DbCommand),

    /// User management
    #[command(subcommand)]
    User(UserCommand),

    /// Client management
    #[command(subcommand)]
    Client(ClientCommand),
}

#[derive(Args)]
struct ServeArgs {
    /// Host to bind to (overrides SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides SERVER_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum DbCommand {
    /// Apply all pending migrations
    Create,

    /// Drop every table, including migration bookkeeping
    Drop {
        /// Skip the confirmation requirement
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create a new user
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum ClientCommand {
    /// Create a new OAuth2 client
    Create {
        #[arg(long)]
        name: String,

        /// Redirect URIs (repeatable)
        #[arg(long = "redirect-uri", required = true)]
        redirect_uris: Vec<String>,

        /// Grant types (repeatable)
        #[arg(long = "grant-type", default_values_t = [
            GRANT_TYPE_PASSWORD.to_string(),
            GRANT_TYPE_REFRESH_TOKEN.to_string(),
        ])]
        grant_types: Vec<String>,

        /// Default scopes (repeatable)
        #[arg(long = "scope")]
        scopes: Vec<String>,

        /// Register as a public (non-confidential) client
        #[arg(long)]
        public: bool,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;

    match cli.command {
        Command::Serve(args) => {
            if let Some(host) = args.host {
                config.server_host = host;
            }
            if let Some(port) = args.port {
                config.server_port = port;
            }
            crate::serve(config).await
        }
        Command::Db(command) => run_db(command, &config).await,
        Command::User(command) => run_user(command, &config).await,
        Command::Client(command) => run_client(command, &config).await,
    }
}

async fn connect(config: &Config) -> anyhow::Result<sqlx::PgPool> {
    Ok(PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?)
}

async fn run_db(command: DbCommand, config: &Config) -> anyhow::Result<()> {
    let pool = connect(config).await?;

    match command {
        DbCommand::Create => {
            println!("Applying database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            println!("Database schema is up to date.");
        }
        DbCommand::Drop { yes } => {
            if !yes {
                anyhow::bail!("refusing to drop tables without --yes");
            }
            println!("Dropping database tables...");
            sqlx::query(
                "DROP TABLE IF EXISTS authorization_codes, tokens, clients, users, \
                 _sqlx_migrations CASCADE",
            )
            .execute(&pool)
            .await?;
            println!("Database tables dropped.");
        }
    }

    Ok(())
}

async fn run_user(command: UserCommand, config: &Config) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let users = UserService::new(Arc::new(PgUserRepository::new(pool)));

    match command {
        UserCommand::Create {
            username,
            email,
            password,
        } => {
            let user = users
                .create_user(&username, &email, &password)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;

            println!("User created successfully!");
            println!("  ID:       {}", user.id);
            println!("  Username: {}", user.username);
            println!("  Email:    {}", user.email);
        }
    }

    Ok(())
}

async fn run_client(command: ClientCommand, config: &Config) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let clients = ClientService::new(Arc::new(PgClientRepository::new(pool)));

    match command {
        ClientCommand::Create {
            name,
            redirect_uris,
            grant_types,
            scopes,
            public,
        } => {
            let (client, secret) = clients
                .create_client(&name, redirect_uris, grant_types, scopes, !public)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;

            println!("Client created successfully!");
            println!("  ID:            {}", client.id);
            println!("  Name:          {}", client.client_name);
            println!("  Secret:        {}", secret);
            println!("  Redirect URIs: {}", client.redirect_uris.join(", "));
            println!("  Grant Types:   {}", client.grant_types.join(", "));
            println!(
                "  Scopes:        {}",
                if client.scopes.is_empty() {
                    "None".to_string()
                } else {
                    client.scopes.join(", ")
                }
            );
            println!();
            println!("IMPORTANT: Save the client secret! It won't be shown again.");
        }
    }

    Ok(())
}

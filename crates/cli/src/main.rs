//! Trạm Sách CLI - migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the schema and session tables
//! ts-cli migrate
//!
//! # Create an admin account
//! ts-cli admin create -e admin@example.com -n "Admin Name" -p 'S3cure-pass'
//!
//! # Delete carts idle for a month
//! ts-cli carts purge --idle-days 30
//! ```
//!
//! All commands read `DATABASE_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ts-cli")]
#[command(author, version, about = "Trạm Sách CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Maintain shopping carts
    Carts {
        #[command(subcommand)]
        action: CartsAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Initial password (at least 8 characters)
        #[arg(short, long, env = "TS_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Replace an account's password
    SetPassword {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// New password (at least 8 characters)
        #[arg(short, long, env = "TS_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum CartsAction {
    /// Delete carts not updated for the given number of days
    Purge {
        #[arg(long)]
        idle_days: u32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => commands::admin::create_user(&email, &name, &password).await?,
            AdminAction::SetPassword { email, password } => {
                commands::admin::set_password(&email, &password).await?;
            }
        },
        Commands::Carts { action } => match action {
            CartsAction::Purge { idle_days } => {
                commands::carts::purge(idle_days).await?;
            }
        },
    }
    Ok(())
}

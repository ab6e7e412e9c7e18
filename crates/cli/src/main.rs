//! LedgerDesk CLI - Database migrations and admin bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Run schema and session-store migrations
//! ld-cli migrate
//!
//! # Create the first admin
//! ld-cli admin create -e admin@example.com -n "Admin Name" -p 'long-password'
//!
//! # Reset any profile's password
//! ld-cli admin reset-password -e admin@example.com -p 'new-long-password'
//! ```
//!
//! All commands read `DATABASE_URL` from the environment or `.env`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ld-cli")]
#[command(author, version, about = "LedgerDesk CLI tools")]
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
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin with a password login
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Initial password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Optional phone number
        #[arg(long)]
        phone: Option<String>,
    },
    /// Set a new password for an existing login
    ResetPassword {
        /// Email address of the login
        #[arg(short, long)]
        email: String,

        /// New password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
                phone,
            } => {
                commands::admin::create_admin(&email, &name, &password, phone).await?;
            }
            AdminAction::ResetPassword { email, password } => {
                commands::admin::reset_password(&email, &password).await?;
            }
        },
    }
    Ok(())
}

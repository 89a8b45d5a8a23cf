//! Cobbler CLI - migrations, admin users, option seeding and catalog sync.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! cobbler migrate
//!
//! # Create admin user (password from --password or COBBLER_ADMIN_PASSWORD)
//! cobbler admin create -e admin@example.com -n "Admin Name" -r super_admin
//!
//! # Seed option values from YAML
//! cobbler seed options options.yaml --dry-run
//!
//! # Run one catalog sync from Shopify
//! cobbler sync
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cobbler")]
#[command(author, version, about = "Cobbler CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations against `ADMIN_DATABASE_URL`
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Run one catalog sync from Shopify
    Sync,
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

        /// Admin role (`super_admin`, `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Initial password
        #[arg(long, env = "COBBLER_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert option values from a YAML file, skipping existing names
    Options {
        /// Path to the YAML file
        file: String,

        /// Validate and print the plan without touching the database
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cobbler_cli=info,cobbler_admin=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

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
                role,
                password,
            } => {
                commands::admin::create_user(&email, &name, &role, &password).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Options { file, dry_run } => {
                commands::seed::options(&file, dry_run).await?;
            }
        },
        Commands::Sync => commands::sync::run().await?,
    }
    Ok(())
}

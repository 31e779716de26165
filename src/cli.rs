use anyhow::Result;
use clap::{Parser, Subcommand};
use model::entities::user::Role;
use std::path::PathBuf;

pub mod commands;

use crate::config::{DEFAULT_BIND_ADDRESS, DEFAULT_DATABASE_URL};
use commands::{
    backup_database, create_admin, create_user, init_database, init_database_with_admin,
    optimize_database, seed_departments, serve,
};

#[derive(Parser)]
#[command(name = "vypysky")]
#[command(about = "Discharge records and NSZU corrections: web server and maintenance tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    ///
    /// Runs the migrations first when the database has no `users` table yet.
    Serve {
        /// Database URL, e.g. sqlite://data/app.db?mode=rwc
        #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,

        /// Bind address for the web server
        ///
        /// Format: IP:PORT (e.g., 0.0.0.0:5000, 127.0.0.1:8080)
        #[arg(short, long, env = "BIND_ADDRESS", default_value = DEFAULT_BIND_ADDRESS)]
        bind_address: String,
    },
    /// Create the database tables
    ///
    /// The parent directory of a SQLite file is created automatically.
    InitDb {
        #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },
    /// Create the database tables and an admin account if it is missing
    InitDbWithAdmin {
        #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,

        #[arg(long, default_value = "admin")]
        username: String,

        #[arg(long, default_value = "admin")]
        password: String,
    },
    /// Create an admin account
    CreateAdmin {
        username: String,
        password: String,

        #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },
    /// Create an account with the given role (operator, editor, admin, viewer)
    CreateUser {
        username: String,
        password: String,
        role: Role,

        #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },
    /// Hot backup of the SQLite database, safe while the server runs
    ///
    /// Defaults to backup_YYYYMMDD_HHMMSS.db next to the database file.
    BackupDb {
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },
    /// ANALYZE, VACUUM and PRAGMA optimize, with a size report
    OptimizeDb {
        #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },
    /// Insert the default list of hospital departments
    SeedDepartments {
        #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Serve { database_url, bind_address } => {
                serve(&database_url, &bind_address).await?;
            }
            Commands::InitDb { database_url } => {
                init_database(&database_url).await?;
            }
            Commands::InitDbWithAdmin { database_url, username, password } => {
                init_database_with_admin(&database_url, &username, &password).await?;
            }
            Commands::CreateAdmin { username, password, database_url } => {
                create_admin(&database_url, &username, &password).await?;
            }
            Commands::CreateUser { username, password, role, database_url } => {
                create_user(&database_url, &username, &password, role).await?;
            }
            Commands::BackupDb { output, database_url } => {
                backup_database(&database_url, output).await?;
            }
            Commands::OptimizeDb { database_url } => {
                optimize_database(&database_url).await?;
            }
            Commands::SeedDepartments { database_url } => {
                seed_departments(&database_url).await?;
            }
        }
        Ok(())
    }
}

use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use model::entities::user::Role;
use sea_orm::DatabaseConnection;
use tracing::{debug, error, info, trace};

use super::users::create_account;
use crate::config::connect_database;

/// Opens the database and applies every pending migration.
pub async fn migrate(database_url: &str) -> Result<DatabaseConnection> {
    trace!("Attempting to connect to database");
    let db = match connect_database(database_url).await {
        Ok(connection) => {
            debug!("Database connection established");
            connection
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e);
        }
    };

    info!("Running database migrations");
    match Migrator::up(&db, None).await {
        Ok(_) => debug!("All pending migrations have been applied"),
        Err(e) => {
            error!("Failed to run database migrations: {}", e);
            return Err(e.into());
        }
    }
    Ok(db)
}

pub async fn init_database(database_url: &str) -> Result<()> {
    trace!("Entering init_database function");
    info!("Initializing database");
    migrate(database_url).await?;
    info!("Database initialization completed successfully");
    println!("Initialized the database.");
    Ok(())
}

pub async fn init_database_with_admin(database_url: &str, username: &str, password: &str) -> Result<()> {
    trace!("Entering init_database_with_admin function");
    let db = migrate(database_url).await?;

    if let Some(created) =
        create_account(&db, username, password, Role::Admin, "created by init-db-with-admin").await?
    {
        info!("Admin user created during init: {}", created.username);
        println!("Created admin user {}", created.username);
    }
    println!("Initialized the database (with admin).");
    Ok(())
}

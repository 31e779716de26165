use anyhow::Result;
use migration::{Migrator, MigratorTrait, SchemaManager};
use sea_orm::DatabaseConnection;
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace, warn};

use crate::config::initialize_app_state_with_url;
use crate::router::create_router;

/// Applies the migrations to a database that has never been initialised.
async fn ensure_schema(db: &DatabaseConnection) -> Result<()> {
    if SchemaManager::new(db).has_table("users").await? {
        debug!("Schema present");
        return Ok(());
    }
    warn!("Table 'users' not found, running migrations");
    Migrator::up(db, None).await?;
    info!("Database initialized");
    Ok(())
}

pub async fn serve(database_url: &str, bind_address: &str) -> Result<()> {
    trace!("Entering serve function");
    info!("Vypysky application starting up");
    debug!("Database URL: {}", database_url);
    debug!("Bind address: {}", bind_address);

    // Initialize application state
    trace!("Initializing application state");
    let state = match initialize_app_state_with_url(database_url).await {
        Ok(state) => {
            debug!("Application state initialized successfully");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };
    ensure_schema(&state.db).await?;

    trace!("Creating application router");
    let app = create_router(state);

    info!("Starting server on {}", bind_address);
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => {
            debug!("Successfully bound to address: {}", bind_address);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", bind_address, e);
            return Err(e.into());
        }
    };

    info!("Vypysky server running on http://{}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    #[tokio::test]
    async fn test_ensure_schema_migrates_empty_database() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        assert!(!SchemaManager::new(&db).has_table("users").await.unwrap());

        ensure_schema(&db).await.unwrap();
        assert!(SchemaManager::new(&db).has_table("users").await.unwrap());

        // second call is a no-op
        ensure_schema(&db).await.unwrap();
    }
}

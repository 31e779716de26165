use anyhow::{Result, bail};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use tracing::{debug, info, trace};

use crate::config::{connect_database, sqlite_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    pub size_bytes: i64,
    pub tables: i64,
    pub indexes: i64,
}

impl DatabaseStats {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

async fn scalar(db: &DatabaseConnection, sql: &str) -> Result<i64> {
    let row = db
        .query_one(Statement::from_string(db.get_database_backend(), sql.to_string()))
        .await?;
    Ok(match row {
        Some(row) => row.try_get_by_index(0)?,
        None => 0,
    })
}

pub async fn database_stats(db: &DatabaseConnection) -> Result<DatabaseStats> {
    Ok(DatabaseStats {
        size_bytes: scalar(
            db,
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
        )
        .await?,
        tables: scalar(db, "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'").await?,
        indexes: scalar(db, "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index'").await?,
    })
}

pub async fn optimize_database(database_url: &str) -> Result<()> {
    trace!("Entering optimize_database function");
    let Some(path) = sqlite_path(database_url) else {
        bail!("optimize-db only works with SQLite file databases");
    };
    if !path.exists() {
        bail!("Database file not found: {}", path.display());
    }

    let db = connect_database(database_url).await?;
    let before = database_stats(&db).await?;
    println!(
        "Before: {:.2} MB, {} tables, {} indexes",
        before.size_mb(),
        before.tables,
        before.indexes
    );

    for statement in ["ANALYZE", "VACUUM", "PRAGMA optimize"] {
        debug!("Running {}", statement);
        db.execute_unprepared(statement).await?;
    }

    let after = database_stats(&db).await?;
    println!("After: {:.2} MB", after.size_mb());
    info!(
        "Database {} optimized: {} -> {} bytes",
        path.display(),
        before.size_bytes,
        after.size_bytes
    );
    Ok(())
}

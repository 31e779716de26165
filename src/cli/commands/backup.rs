use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use common::kyiv_now;
use sea_orm::ConnectionTrait;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, trace};

use crate::config::{connect_database, sqlite_path};

/// `<db dir>/backup_YYYYMMDD_HHMMSS.db`
pub fn default_backup_path(database: &Path, at: NaiveDateTime) -> PathBuf {
    let dir = database.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("backup_{}.db", at.format("%Y%m%d_%H%M%S")))
}

/// Quotes a path as an SQL string literal.
fn sql_literal(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

/// Copies a live SQLite database with `VACUUM INTO`, which is consistent
/// under WAL.
pub async fn backup_database(database_url: &str, output: Option<PathBuf>) -> Result<PathBuf> {
    trace!("Entering backup_database function");
    let Some(source) = sqlite_path(database_url) else {
        bail!("Backup command only works with SQLite file databases");
    };
    if !source.exists() {
        bail!("Database file not found: {}", source.display());
    }

    let output = output.unwrap_or_else(|| default_backup_path(&source, kyiv_now()));
    if output.exists() {
        bail!("Backup target already exists: {}", output.display());
    }
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    debug!("Backing up {} to {}", source.display(), output.display());

    let db = connect_database(database_url).await?;
    if let Err(e) = db
        .execute_unprepared(&format!("VACUUM INTO {}", sql_literal(&output)))
        .await
    {
        error!("Database backup failed: {}", e);
        return Err(e).context("Backup failed");
    }

    let size_mb = std::fs::metadata(&output)?.len() as f64 / (1024.0 * 1024.0);
    info!("Database backup created: {}", output.display());
    println!("Backup created successfully: {} ({:.2} MB)", output.display(), size_mb);
    println!("Date: {}", kyiv_now().format("%d.%m.%Y %H:%M:%S"));
    Ok(output)
}

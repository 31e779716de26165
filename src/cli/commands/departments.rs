use anyhow::Result;
use model::entities::department::DEFAULT_DEPARTMENTS;
use sea_orm::DatabaseConnection;
use tracing::{debug, info, trace};

use crate::config::connect_database;
use crate::handlers::admin::insert_department;

/// Inserts the default departments that are missing; returns how many were added.
pub async fn seed_default_departments(db: &DatabaseConnection) -> Result<usize> {
    let mut added = 0;
    for name in DEFAULT_DEPARTMENTS {
        match insert_department(db, name).await? {
            Some(_) => {
                debug!("Department '{}' added", name);
                added += 1;
            }
            None => trace!("Department '{}' already present", name),
        }
    }
    Ok(added)
}

pub async fn seed_departments(database_url: &str) -> Result<()> {
    trace!("Entering seed_departments function");
    let db = connect_database(database_url).await?;
    let added = seed_default_departments(&db).await?;
    info!("Seeded {} departments", added);
    println!(
        "Added {} departments ({} already present).",
        added,
        DEFAULT_DEPARTMENTS.len() - added
    );
    Ok(())
}

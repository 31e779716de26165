//! Queries and document builders behind the dashboard, the statistics page
//! and the Excel/PDF exports.

pub mod error;
pub mod excel;
pub mod nszu;
pub mod pdf;
pub mod records;
pub mod statistics;

#[cfg(test)]
mod testing;

pub use error::{ReportError, Result};
pub use excel::{Cell, Sheet};
pub use pdf::{PdfFonts, PdfTable};

use std::collections::HashMap;

use model::entities::user;
use sea_orm::{DatabaseConnection, EntityTrait};

/// Maps user ids to usernames for the author/editor export columns.
pub async fn usernames(db: &DatabaseConnection) -> Result<HashMap<i32, String>> {
    let users = user::Entity::find().all(db).await?;
    Ok(users.into_iter().map(|u| (u.id, u.username)).collect())
}

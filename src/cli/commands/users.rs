use anyhow::Result;
use model::entities::user::{self, Role};
use sea_orm::DatabaseConnection;
use tracing::{debug, error, info, trace, warn};

use crate::audit::{self, AuditEvent};
use crate::auth::Password;
use crate::config::connect_database;
use crate::handlers::admin::{insert_user, is_unique_violation, username_taken};

/// Creates an account on behalf of the command line; `None` when the username is taken.
pub async fn create_account(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    role: Role,
    details: &str,
) -> Result<Option<user::Model>> {
    trace!("Entering create_account function");
    let username = username.trim();
    if username_taken(db, username).await? {
        warn!("User '{}' already exists", username);
        return Ok(None);
    }

    let password = Password::hash(password)?;
    let created = match insert_user(db, username, &password, role).await {
        Ok(created) => created,
        Err(e) if is_unique_violation(&e) => {
            warn!("User '{}' was created concurrently", username);
            return Ok(None);
        }
        Err(e) => {
            error!("Failed to create user '{}': {}", username, e);
            return Err(e.into());
        }
    };
    audit::record(
        db,
        None,
        AuditEvent::new("user.create")
            .entity("user", Some(created.id))
            .details(details),
    )
    .await;
    debug!("User {} stored with role {}", created.id, created.role);
    Ok(Some(created))
}

pub async fn create_user(database_url: &str, username: &str, password: &str, role: Role) -> Result<()> {
    trace!("Entering create_user function");
    let db = connect_database(database_url).await?;
    let details = format!("created by CLI with role={}", role);
    match create_account(&db, username, password, role, &details).await? {
        Some(created) => {
            info!("User created by CLI: {} with role {}", created.username, created.role);
            println!("Created {} user {}", created.role, created.username);
        }
        None => println!("User already exists."),
    }
    Ok(())
}

pub async fn create_admin(database_url: &str, username: &str, password: &str) -> Result<()> {
    trace!("Entering create_admin function");
    let db = connect_database(database_url).await?;
    match create_account(&db, username, password, Role::Admin, "created by CLI").await? {
        Some(created) => {
            info!("Admin user created by CLI: {}", created.username);
            println!("Created admin user {}", created.username);
        }
        None => println!("User already exists."),
    }
    Ok(())
}

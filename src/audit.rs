//! Audit trail writes. A failing audit insert is logged and never fails the
//! request that triggered it.

use model::entities::audit_log;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::{debug, error};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditEvent {
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i32>,
    pub details: Option<String>,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn entity(mut self, entity_type: impl Into<String>, entity_id: Option<i32>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = entity_id;
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Stores `event` for `user_id` (`None` for CLI actions).
pub async fn record(db: &DatabaseConnection, user_id: Option<i32>, event: AuditEvent) {
    let entry = audit_log::ActiveModel {
        user_id: Set(user_id),
        action: Set(event.action.clone()),
        entity_type: Set(event.entity_type),
        entity_id: Set(event.entity_id),
        details: Set(event.details),
        created_at: Set(common::kyiv_now()),
        ..Default::default()
    };

    match entry.insert(db).await {
        Ok(saved) => debug!("Audit entry {} stored: {}", saved.id, saved.action),
        Err(e) => error!("Failed to store audit entry '{}': {}", event.action, e),
    }
}

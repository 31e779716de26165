use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use moka::future::Cache;
use reports::records::RecordDropdowns;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::auth::session::SessionStore;
use crate::config::Settings;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Dropdown values, invalidated on every record write
    pub cache: Cache<String, CachedData>,
    /// Server-side sessions keyed by the token in the session cookie
    pub sessions: SessionStore,
    /// Signs the session cookie
    pub cookie_key: Key,
    pub settings: Arc<Settings>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db)
            .field("cached_entries", &self.cache.entry_count())
            .field("sessions", &self.sessions.entry_count())
            .field("settings", &self.settings)
            .finish()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Cache key for the dashboard dropdown values.
pub const RECORD_DROPDOWNS_KEY: &str = "record_dropdowns";

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    RecordDropdowns(RecordDropdowns),
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

impl ErrorResponse {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            success: false,
        }
    }
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Identifies a discharge record after a create or update
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordSavedResponse {
    pub record_id: i32,
    pub full_name: String,
}

/// Identifies an NSZU correction after a create
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NszuSavedResponse {
    pub id: i32,
    pub nszu_record_id: String,
    /// Correction date, `YYYY-MM-DD`
    pub date: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::records::api_add_record,
        crate::handlers::records::api_edit_record,
        crate::handlers::nszu::api_add_correction,
    ),
    components(
        schemas(
            ApiResponse<RecordSavedResponse>,
            ApiResponse<NszuSavedResponse>,
            ErrorResponse,
            HealthResponse,
            RecordSavedResponse,
            NszuSavedResponse,
            crate::handlers::records::RecordForm,
            crate::handlers::nszu::NszuForm,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "records", description = "Discharge record endpoints"),
        (name = "nszu", description = "NSZU correction endpoints"),
    ),
    info(
        title = "Vypysky API",
        description = "Discharge records and NSZU corrections. All endpoints require a session cookie obtained from /login.",
        version = "0.1.0",
    )
)]
pub struct ApiDoc;

use crate::handlers::{
    admin::{
        add_user, add_user_page, audit_list, create_department, delete_department, delete_user,
        departments_page, edit_user, edit_user_page, statistics, users_list,
    },
    auth::{change_password, change_password_page, login, login_page, logout},
    exports::{export_nszu, export_records, print_nszu, print_records},
    health::health_check,
    nszu::{
        add_correction, add_correction_page, api_add_correction, delete_correction,
        edit_correction, edit_correction_page, nszu_list,
    },
    records::{
        add_record, add_record_page, api_add_record, api_edit_record, dashboard, delete_record,
        edit_record, edit_record_page,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router,
    routing::{get, post},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/change-password", get(change_password_page).post(change_password))
}

fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/records/add", get(add_record_page).post(add_record))
        .route("/records/:record_id/edit", get(edit_record_page).post(edit_record))
        .route("/records/:record_id/delete", post(delete_record))
        .route("/records/print", post(print_records))
        .route("/export", post(export_records))
        // JSON API
        .route("/api/records/add", post(api_add_record))
        .route("/api/records/:record_id/edit", post(api_edit_record))
}

fn nszu_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(nszu_list))
        .route("/add", get(add_correction_page).post(add_correction))
        .route("/api/add", post(api_add_correction))
        .route("/:correction_id/edit", get(edit_correction_page).post(edit_correction))
        .route("/:correction_id/delete", post(delete_correction))
        .route("/export", post(export_nszu))
        .route("/print", post(print_nszu))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users_list))
        .route("/users/add", get(add_user_page).post(add_user))
        .route("/users/:user_id/edit", get(edit_user_page).post(edit_user))
        .route("/users/:user_id/delete", post(delete_user))
        .route("/departments", get(departments_page).post(create_department))
        .route("/departments/:department_id/delete", post(delete_department))
        .route("/statistics", get(statistics))
        .route("/audit", get(audit_list))
}

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(auth_routes())
        .merge(record_routes())
        .nest("/nszu", nszu_routes())
        .nest("/admin", admin_routes())
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30))),
        )
        .with_state(state)
}

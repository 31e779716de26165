use askama::Template;
use axum::{
    Json,
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use reports::ReportError;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{error, warn};

use crate::flash::{self, Level};
use crate::schemas::ErrorResponse;
use crate::templates::ErrorTemplate;

/// Errors raised by page handlers and the authentication extractor.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("access denied")]
    Forbidden,
    #[error("not found")]
    NotFound,
    /// Rejected form input; shown as a flash on the page at `redirect_to`.
    #[error("{message}")]
    Validation { message: String, redirect_to: String },
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("report error: {0}")]
    Report(#[from] ReportError),
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>, redirect_to: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            redirect_to: redirect_to.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }
}

fn flash_redirect(to: &str, level: Level, message: &str) -> Response {
    (
        AppendHeaders([(SET_COOKIE, flash::set_cookie_value(level, message))]),
        Redirect::to(to),
    )
        .into_response()
}

fn error_page(status: StatusCode, message: &str) -> Response {
    let page = ErrorTemplate {
        code: status.as_u16(),
        message: message.to_string(),
    };
    match page.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(_) => (status, message.to_string()).into_response(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthenticated => flash_redirect(
                "/login",
                Level::Info,
                "Будь ласка, увійдіть для доступу до цієї сторінки.",
            ),
            AppError::Forbidden => flash_redirect("/", Level::Danger, "Доступ заборонено"),
            AppError::Validation {
                message,
                redirect_to,
            } => {
                warn!("Validation failed: {}", message);
                flash_redirect(&redirect_to, Level::Warning, &message)
            }
            AppError::NotFound => error_page(StatusCode::NOT_FOUND, "Сторінку не знайдено"),
            other => {
                error!("Request failed: {}", other);
                error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Внутрішня помилка сервера",
                )
            }
        }
    }
}

/// Error half of the JSON endpoints.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(code, message)))
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Unauthenticated => {
                api_error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", "Authentication required")
            }
            AppError::Forbidden => api_error(StatusCode::FORBIDDEN, "FORBIDDEN", "Доступ заборонено"),
            AppError::NotFound => api_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Запис не знайдено"),
            AppError::Validation { message, .. } => {
                api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            }
            other => {
                error!("API request failed: {}", other);
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Внутрішня помилка сервера",
                )
            }
        }
    }
}

//! Authentication: password hashing, sessions and the `CurrentUser`
//! extractor that doubles as the role guard.

pub mod password;
pub mod session;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::SignedCookieJar;
use model::entities::user::{self, Role};
use sea_orm::EntityTrait;
use tracing::{debug, trace, warn};

use crate::error::{AppError, AppResult};
use crate::schemas::AppState;

pub use password::Password;
pub use session::SESSION_COOKIE;

/// The signed-in user of the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub session_token: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins pass every check.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.is_admin() || roles.contains(&self.role)
    }

    /// Role guard for handlers; `Forbidden` redirects home with a flash.
    pub fn require(&self, roles: &[Role]) -> AppResult<()> {
        if self.has_any_role(roles) {
            Ok(())
        } else {
            warn!(
                "User '{}' with role '{}' denied, requires one of {:?}",
                self.username, self.role, roles
            );
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        self.require(&[])
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        trace!("Resolving current user from session cookie");
        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or(AppError::Unauthenticated)?;

        let session = state
            .sessions
            .get(&token)
            .await
            .ok_or(AppError::Unauthenticated)?;

        let Some(user) = user::Entity::find_by_id(session.user_id)
            .one(&state.db)
            .await?
        else {
            debug!("Session points at deleted user {}", session.user_id);
            session::end(&state.sessions, &token).await;
            return Err(AppError::Unauthenticated);
        };

        Ok(CurrentUser {
            id: user.id,
            username: user.username,
            role: user.role,
            session_token: token,
        })
    }
}

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{CookieJar, SignedCookieJar};
use model::entities::user;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::{debug, info, instrument, trace, warn};
use validator::Validate;

use crate::audit::{self, AuditEvent};
use crate::auth::{CurrentUser, Password, session};
use crate::error::{AppError, AppResult};
use crate::flash::{self, Level};
use crate::helpers::first_message;
use crate::schemas::AppState;
use crate::templates::{ChangePasswordTemplate, Layout, LoginTemplate, render};

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct ChangePasswordForm {
    #[serde(default)]
    pub current_password: String,
    #[validate(length(min = 6, message = "Новий пароль повинен містити щонайменше 6 символів"))]
    #[serde(default)]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Нові паролі не збігаються"))]
    #[serde(default)]
    pub confirm_password: String,
}

#[instrument(skip(jar))]
pub async fn login_page(user: Option<CurrentUser>, jar: CookieJar) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let (jar, flashes) = flash::take(jar);
    let page = LoginTemplate {
        layout: Layout::new("Вхід", None, flashes),
    };
    Ok((jar, render(&page)?).into_response())
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    signed: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    trace!("Entering login function");
    let username = form.username.trim();

    let found = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(&state.db)
        .await?;

    let Some(account) = found.filter(|u| Password::from_hash(u.password_hash.as_str()).verify(&form.password))
    else {
        warn!("Failed login attempt for '{}'", username);
        let jar = flash::push(jar, Level::Danger, "Невірне ім'я користувача або пароль");
        return Ok((jar, Redirect::to("/login")).into_response());
    };

    let token = session::start(&state.sessions, account.id).await;
    let signed = signed.add(session::cookie(token, state.settings.production));
    audit::record(
        &state.db,
        Some(account.id),
        AuditEvent::new("auth.login").entity("user", Some(account.id)),
    )
    .await;
    info!("User '{}' logged in", account.username);

    Ok((signed, jar, Redirect::to("/")).into_response())
}

#[instrument(skip(state, jar, signed))]
pub async fn logout(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    jar: CookieJar,
    signed: SignedCookieJar,
) -> Response {
    if let Some(user) = user {
        session::end(&state.sessions, &user.session_token).await;
        info!("User '{}' logged out", user.username);
    }
    let signed = signed.remove(session::removal_cookie());
    let jar = flash::push(jar, Level::Info, "Ви вийшли з системи");
    (signed, jar, Redirect::to("/login")).into_response()
}

#[instrument(skip(jar))]
pub async fn change_password_page(user: CurrentUser, jar: CookieJar) -> AppResult<Response> {
    let (jar, flashes) = flash::take(jar);
    let page = ChangePasswordTemplate {
        layout: Layout::new("Зміна пароля", Some(&user), flashes),
    };
    Ok((jar, render(&page)?).into_response())
}

#[instrument(skip_all, fields(user = %user.username))]
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<ChangePasswordForm>,
) -> AppResult<Response> {
    trace!("Entering change_password function");
    let account = user::Entity::find_by_id(user.id)
        .one(&state.db)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if !Password::from_hash(account.password_hash.as_str()).verify(&form.current_password) {
        return Err(AppError::validation("Поточний пароль невірний", "/change-password"));
    }
    if let Err(errors) = form.validate() {
        debug!("Password change rejected: {}", errors);
        return Err(AppError::validation(first_message(&errors), "/change-password"));
    }

    let hash = Password::hash(&form.new_password)?;
    let mut active: user::ActiveModel = account.into();
    active.password_hash = Set(hash.into_string());
    active.update(&state.db).await?;

    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("user.password_change").entity("user", Some(user.id)),
    )
    .await;
    info!("User '{}' changed their password", user.username);

    let jar = flash::push(jar, Level::Success, "Пароль успішно змінено");
    Ok((jar, Redirect::to("/")).into_response())
}

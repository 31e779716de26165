//! Administration: users, departments, statistics and the audit trail.

use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use common::{
    DateRange, MonthPeriod, Pagination, format_date, format_datetime, kyiv_now, non_empty,
    parse_iso_date,
};
use model::entities::{
    audit_log, department,
    user::{self, Role},
};
use reports::statistics::period_statistics;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, Iterable, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, trace, warn};
use validator::Validate;

use crate::audit::{self, AuditEvent};
use crate::auth::{CurrentUser, Password, password::MIN_PASSWORD_LENGTH, session};
use crate::error::{AppError, AppResult};
use crate::flash::{self, Level};
use crate::handlers::nszu::{format_amount, summary_rows};
use crate::helpers::{SelectOption, first_message, pager};
use crate::schemas::AppState;
use crate::templates::{
    AuditRow, AuditTemplate, DepartmentRow, DepartmentsTemplate, Layout, StatisticsTemplate,
    UserFormTemplate, UserRow, UsersTemplate, render,
};

fn role_options(current: Role) -> Vec<SelectOption> {
    Role::iter()
        .map(|role| SelectOption::new(role.as_str(), role.label(), Some(current.as_str())))
        .collect()
}

fn parse_role(value: &str, redirect_to: &str) -> AppResult<Role> {
    value
        .parse::<Role>()
        .map_err(|_| AppError::validation("Невідома роль", redirect_to))
}

async fn find_user(state: &AppState, user_id: i32) -> AppResult<user::Model> {
    user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound)
}

#[instrument(skip(state, jar))]
pub async fn users_list(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> AppResult<Response> {
    user.require_admin()?;
    let users = user::Entity::find()
        .order_by_asc(user::Column::Username)
        .all(&state.db)
        .await?;
    debug!("Listing {} users", users.len());

    let rows = users
        .into_iter()
        .map(|u| UserRow {
            is_self: u.id == user.id,
            id: u.id,
            username: u.username,
            role_label: u.role.label().to_string(),
            created_at: format_datetime(u.created_at),
        })
        .collect();
    let (jar, flashes) = flash::take(jar);
    let page = UsersTemplate {
        layout: Layout::new("Користувачі", Some(&user), flashes),
        users: rows,
    };
    Ok((jar, render(&page)?).into_response())
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUserForm {
    #[validate(length(min = 1, max = 80, message = "Ім'я користувача повинно містити від 1 до 80 символів"))]
    #[serde(default)]
    pub username: String,
    #[validate(length(min = 6, message = "Пароль повинен містити щонайменше 6 символів"))]
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

#[instrument(skip(jar))]
pub async fn add_user_page(user: CurrentUser, jar: CookieJar) -> AppResult<Response> {
    user.require_admin()?;
    let (jar, flashes) = flash::take(jar);
    let page = UserFormTemplate {
        layout: Layout::new("Новий користувач", Some(&user), flashes),
        heading: "Новий користувач".to_string(),
        action: "/admin/users/add".to_string(),
        is_edit: false,
        username: String::new(),
        role_options: role_options(Role::Operator),
    };
    Ok((jar, render(&page)?).into_response())
}

/// Stores a new account. Shared with the CLI.
pub async fn insert_user(
    db: &sea_orm::DatabaseConnection,
    username: &str,
    password: &Password,
    role: Role,
) -> Result<user::Model, sea_orm::DbErr> {
    user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password.as_str().to_string()),
        role: Set(role),
        created_at: Set(kyiv_now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// A UNIQUE constraint rejected the row; another request inserted it first.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn duplicate_username(username: &str) -> AppError {
    AppError::validation(
        format!("Користувач \"{}\" вже існує", username),
        "/admin/users/add",
    )
}

pub async fn username_taken(db: &sea_orm::DatabaseConnection, username: &str) -> Result<bool, sea_orm::DbErr> {
    let count = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .count(db)
        .await?;
    Ok(count > 0)
}

#[instrument(skip_all)]
pub async fn add_user(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(mut form): Form<NewUserForm>,
) -> AppResult<Response> {
    trace!("Entering add_user function");
    user.require_admin()?;
    const FORM: &str = "/admin/users/add";
    form.username = form.username.trim().to_string();
    form.validate()
        .map_err(|e| AppError::validation(first_message(&e), FORM))?;
    let role = parse_role(&form.role, FORM)?;

    if username_taken(&state.db, &form.username).await? {
        warn!("Duplicate username '{}' rejected", form.username);
        return Err(duplicate_username(&form.username));
    }

    let password = Password::hash(&form.password)?;
    let created = match insert_user(&state.db, &form.username, &password, role).await {
        Ok(created) => created,
        Err(e) if is_unique_violation(&e) => {
            warn!("Username '{}' was taken concurrently", form.username);
            return Err(duplicate_username(&form.username));
        }
        Err(e) => return Err(e.into()),
    };
    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("user.create")
            .entity("user", Some(created.id))
            .details(format!("username={} role={}", created.username, created.role)),
    )
    .await;
    info!("User '{}' created by {}", created.username, user.username);

    let jar = flash::push(
        jar,
        Level::Success,
        format!("Користувача \"{}\" створено", created.username),
    );
    Ok((jar, Redirect::to("/admin/users")).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EditUserForm {
    pub role: String,
    /// Blank keeps the current password.
    pub password: String,
}

#[instrument(skip(state, jar))]
pub async fn edit_user_page(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(user_id): Path<i32>,
) -> AppResult<Response> {
    user.require_admin()?;
    let target = find_user(&state, user_id).await?;
    let (jar, flashes) = flash::take(jar);
    let page = UserFormTemplate {
        layout: Layout::new("Редагування користувача", Some(&user), flashes),
        heading: format!("Користувач {}", target.username),
        action: format!("/admin/users/{}/edit", target.id),
        is_edit: true,
        username: target.username,
        role_options: role_options(target.role),
    };
    Ok((jar, render(&page)?).into_response())
}

#[instrument(skip_all)]
pub async fn edit_user(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(user_id): Path<i32>,
    Form(form): Form<EditUserForm>,
) -> AppResult<Response> {
    user.require_admin()?;
    let form_url = format!("/admin/users/{}/edit", user_id);
    let target = find_user(&state, user_id).await?;
    let role = parse_role(&form.role, &form_url)?;

    let new_password = match non_empty(&form.password) {
        Some(plain) if plain.chars().count() < MIN_PASSWORD_LENGTH => {
            return Err(AppError::validation(
                "Пароль повинен містити щонайменше 6 символів",
                form_url,
            ));
        }
        Some(plain) => Some(Password::hash(&plain)?),
        None => None,
    };

    let password_changed = new_password.is_some();
    let mut active: user::ActiveModel = target.into();
    active.role = Set(role);
    if let Some(password) = new_password {
        active.password_hash = Set(password.into_string());
    }
    let saved = active.update(&state.db).await?;

    if password_changed && saved.id != user.id {
        session::end_all_for_user(&state.sessions, saved.id);
    }
    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("user.update").entity("user", Some(saved.id)).details(format!(
            "username={} role={} password_changed={}",
            saved.username, saved.role, password_changed
        )),
    )
    .await;
    info!("User '{}' updated by {}", saved.username, user.username);

    let jar = flash::push(
        jar,
        Level::Success,
        format!("Користувача \"{}\" оновлено", saved.username),
    );
    Ok((jar, Redirect::to("/admin/users")).into_response())
}

#[instrument(skip(state, jar))]
pub async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(user_id): Path<i32>,
) -> AppResult<Response> {
    user.require_admin()?;
    if user_id == user.id {
        warn!("User '{}' tried to delete their own account", user.username);
        return Err(AppError::validation(
            "Ви не можете видалити власний обліковий запис",
            "/admin/users",
        ));
    }
    let target = find_user(&state, user_id).await?;
    let username = target.username.clone();
    target.delete(&state.db).await?;
    session::end_all_for_user(&state.sessions, user_id);

    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("user.delete")
            .entity("user", Some(user_id))
            .details(format!("username={}", username)),
    )
    .await;
    info!("User '{}' deleted by {}", username, user.username);

    let jar = flash::push(jar, Level::Danger, format!("Користувача \"{}\" видалено", username));
    Ok((jar, Redirect::to("/admin/users")).into_response())
}

#[instrument(skip(state, jar))]
pub async fn departments_page(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> AppResult<Response> {
    user.require_admin()?;
    let departments = department::Entity::find()
        .order_by_asc(department::Column::Name)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|d| DepartmentRow {
            id: d.id,
            name: d.name,
            created_at: format_datetime(d.created_at),
        })
        .collect();
    let (jar, flashes) = flash::take(jar);
    let page = DepartmentsTemplate {
        layout: Layout::new("Відділення", Some(&user), flashes),
        departments,
    };
    Ok((jar, render(&page)?).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DepartmentForm {
    pub name: String,
}

/// Inserts `name` unless a department with that name exists; `None` when it did.
pub async fn insert_department(
    db: &sea_orm::DatabaseConnection,
    name: &str,
) -> Result<Option<department::Model>, sea_orm::DbErr> {
    let exists = department::Entity::find()
        .filter(department::Column::Name.eq(name))
        .count(db)
        .await?
        > 0;
    if exists {
        return Ok(None);
    }
    let inserted = department::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(kyiv_now()),
        ..Default::default()
    }
    .insert(db)
    .await;
    match inserted {
        Ok(created) => Ok(Some(created)),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

#[instrument(skip(state, jar))]
pub async fn create_department(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<DepartmentForm>,
) -> AppResult<Response> {
    user.require_admin()?;
    let Some(name) = non_empty(&form.name) else {
        return Err(AppError::validation("Вкажіть назву відділення", "/admin/departments"));
    };

    let Some(created) = insert_department(&state.db, &name).await? else {
        return Err(AppError::validation(
            format!("Відділення \"{}\" вже існує", name),
            "/admin/departments",
        ));
    };
    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("department.create")
            .entity("department", Some(created.id))
            .details(format!("name={}", created.name)),
    )
    .await;
    info!("Department '{}' created by {}", created.name, user.username);

    let jar = flash::push(jar, Level::Success, format!("Відділення \"{}\" додано", created.name));
    Ok((jar, Redirect::to("/admin/departments")).into_response())
}

#[instrument(skip(state, jar))]
pub async fn delete_department(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(department_id): Path<i32>,
) -> AppResult<Response> {
    user.require_admin()?;
    let found = department::Entity::find_by_id(department_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound)?;
    let name = found.name.clone();
    found.delete(&state.db).await?;

    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("department.delete")
            .entity("department", Some(department_id))
            .details(format!("name={}", name)),
    )
    .await;
    info!("Department '{}' deleted by {}", name, user.username);

    let jar = flash::push(jar, Level::Danger, format!("Відділення \"{}\" видалено", name));
    Ok((jar, Redirect::to("/admin/departments")).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

impl StatisticsQuery {
    /// Requested period; the current month when both dates are blank.
    pub fn range(&self) -> AppResult<DateRange> {
        let from = self.from_date.as_deref().and_then(non_empty);
        let to = self.to_date.as_deref().and_then(non_empty);
        let (from, to) = match (from, to) {
            (None, None) => return Ok(MonthPeriod::current().range()),
            (Some(from), Some(to)) => (from, to),
            _ => {
                return Err(AppError::validation(
                    "Будь ласка, вкажіть обидві дати",
                    "/admin/statistics",
                ));
            }
        };
        let (Ok(from), Ok(to)) = (parse_iso_date(&from), parse_iso_date(&to)) else {
            return Err(AppError::validation("Невірний формат дати", "/admin/statistics"));
        };
        DateRange::new(from, to).ok_or_else(|| {
            AppError::validation(
                "Дата \"з\" не може бути пізніше дати \"по\"",
                "/admin/statistics",
            )
        })
    }
}

#[instrument(skip(state, jar))]
pub async fn statistics(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Query(query): Query<StatisticsQuery>,
) -> AppResult<Response> {
    trace!("Entering statistics function");
    user.require(&[Role::Viewer])?;
    let range = query.range()?;
    let stats = period_statistics(&state.db, range).await?;

    let (jar, flashes) = flash::take(jar);
    let page = StatisticsTemplate {
        layout: Layout::new("Статистика", Some(&user), flashes),
        from_date: range.from.format("%Y-%m-%d").to_string(),
        to_date: range.to.format("%Y-%m-%d").to_string(),
        period_label: format!("з {} по {}", format_date(range.from), format_date(range.to)),
        total: stats.total,
        deceased: stats.deceased,
        average_k_days: stats
            .average_k_days
            .map(|avg| format!("{:.1}", avg))
            .unwrap_or_else(|| "-".to_string()),
        nszu: summary_rows(&stats.nszu),
        nszu_total_count: stats.nszu.total_count,
        nszu_total_sum: format_amount(stats.nszu.total_sum),
        by_status: stats.by_status,
        by_department: stats.by_department,
        by_physician: stats.by_physician,
        by_month: stats.by_month,
    };
    info!("Statistics for {:?} rendered for '{}'", range, user.username);
    Ok((jar, render(&page)?).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    /// Prefix of the action name, e.g. `record.`
    pub action: Option<String>,
    pub user_id: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

#[instrument(skip(state, jar))]
pub async fn audit_list(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Query(query): Query<AuditQuery>,
) -> AppResult<Response> {
    user.require_admin()?;
    let action = query.action.as_deref().and_then(non_empty);
    let user_id = query
        .user_id
        .as_deref()
        .and_then(|id| id.trim().parse::<i32>().ok());
    let pagination = Pagination::from_query(query.page.as_deref(), query.per_page.as_deref());

    let mut select = audit_log::Entity::find();
    if let Some(prefix) = &action {
        select = select.filter(audit_log::Column::Action.starts_with(prefix.as_str()));
    }
    if let Some(id) = user_id {
        select = select.filter(audit_log::Column::UserId.eq(id));
    }
    let paginator = select
        .order_by_desc(audit_log::Column::CreatedAt)
        .order_by_desc(audit_log::Column::Id)
        .paginate(&state.db, pagination.per_page);
    let total_items = paginator.num_items().await?;
    let entries = paginator.fetch_page(pagination.page_index()).await?;
    debug!("Audit page {} of {} entries", pagination.page, total_items);

    let usernames = reports::usernames(&state.db).await?;
    let rows = entries
        .into_iter()
        .map(|e| AuditRow {
            created_at: format_datetime(e.created_at),
            username: e
                .user_id
                .and_then(|id| usernames.get(&id).cloned())
                .unwrap_or_else(|| "система".to_string()),
            entity: match (e.entity_type, e.entity_id) {
                (Some(kind), Some(id)) => format!("{} #{}", kind, id),
                (Some(kind), None) => kind,
                _ => String::new(),
            },
            action: e.action,
            details: e.details.unwrap_or_default(),
        })
        .collect();

    let mut users: Vec<(i32, String)> = usernames.into_iter().collect();
    users.sort_by(|a, b| a.1.cmp(&b.1));
    let selected = user_id.map(|id| id.to_string());
    let user_options = users
        .into_iter()
        .map(|(id, name)| SelectOption::new(id.to_string(), name, selected.as_deref()))
        .collect();

    let action_filter = action.unwrap_or_default();
    let user_param = selected.unwrap_or_default();
    let per_page = pagination.per_page.to_string();
    let pager = pager(
        "/admin/audit",
        &[
            ("action", action_filter.as_str()),
            ("user_id", user_param.as_str()),
            ("per_page", per_page.as_str()),
        ],
        pagination.info(total_items),
    );

    let (jar, flashes) = flash::take(jar);
    let page = AuditTemplate {
        layout: Layout::new("Журнал дій", Some(&user), flashes),
        entries: rows,
        action_filter,
        user_options,
        pager,
    };
    Ok((jar, render(&page)?).into_response())
}

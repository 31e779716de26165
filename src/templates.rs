//! Askama page templates and the pre-formatted rows they render.

use askama::Template;
use axum::response::Html;
use common::PageInfo;
use model::entities::user::Role;
use reports::statistics::NamedCount;

use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::flash::FlashMessage;
use crate::helpers::SelectOption;

/// Navigation state of the signed-in user.
#[derive(Debug, Clone)]
pub struct UserNav {
    pub username: String,
    pub role_label: String,
    pub is_admin: bool,
    pub can_add_records: bool,
    pub can_edit_records: bool,
    pub can_view_nszu: bool,
    pub can_view_statistics: bool,
}

impl From<&CurrentUser> for UserNav {
    fn from(user: &CurrentUser) -> Self {
        Self {
            username: user.username.clone(),
            role_label: user.role.label().to_string(),
            is_admin: user.is_admin(),
            can_add_records: user.has_any_role(&[Role::Operator]),
            can_edit_records: user.has_any_role(&[Role::Editor]),
            can_view_nszu: user.has_any_role(&[Role::Editor, Role::Viewer]),
            can_view_statistics: user.has_any_role(&[Role::Viewer]),
        }
    }
}

/// Data every page passes to `base.html`.
#[derive(Debug, Clone)]
pub struct Layout {
    pub title: String,
    pub user: Option<UserNav>,
    pub flashes: Vec<FlashMessage>,
}

impl Layout {
    pub fn new(title: impl Into<String>, user: Option<&CurrentUser>, flashes: Vec<FlashMessage>) -> Self {
        Self {
            title: title.into(),
            user: user.map(UserNav::from),
            flashes,
        }
    }
}

pub fn render<T: Template>(template: &T) -> AppResult<Html<String>> {
    Ok(Html(template.render()?))
}

/// Clickable column header that toggles the sort order.
#[derive(Debug, Clone)]
pub struct SortLink {
    pub label: String,
    pub url: String,
    /// `▲`, `▼` or empty.
    pub arrow: String,
}

/// Prev/next links under a paginated table.
#[derive(Debug, Clone)]
pub struct Pager {
    pub info: PageInfo,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
}

#[derive(Template)]
#[template(path = "change_password.html")]
pub struct ChangePasswordTemplate {
    pub layout: Layout,
}

#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: i32,
    pub date_of_discharge: String,
    pub full_name: String,
    pub discharge_department: String,
    pub treating_physician: String,
    pub history: String,
    pub k_days: String,
    pub discharge_status: String,
    pub date_of_death: String,
    pub comment: String,
    pub deceased: bool,
}

/// Current dashboard filter values, echoed back into the form.
#[derive(Debug, Clone, Default)]
pub struct DashboardFilters {
    pub month_filter: String,
    pub all_months: bool,
    pub discharge_status: String,
    pub treating_physician: String,
    pub discharge_department: String,
    pub history: String,
    pub full_name: String,
    pub has_death_date: bool,
    pub sort_by: String,
    pub sort_order: String,
    pub per_page: u64,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub rows: Vec<RecordRow>,
    pub total: u64,
    pub deceased: u64,
    pub discharged: u64,
    pub processing: u64,
    pub violations: u64,
    pub period_label: String,
    pub filters: DashboardFilters,
    pub status_options: Vec<SelectOption>,
    pub physician_options: Vec<SelectOption>,
    pub department_options: Vec<SelectOption>,
    pub sort_links: Vec<SortLink>,
    pub pager: Pager,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_export: bool,
    /// Restricted export columns for viewers.
    pub restricted_export: bool,
    pub today: String,
    /// Current filters as `filter_*` parameters for the record forms.
    pub return_query: String,
    pub return_fields: Vec<(String, String)>,
}

/// Raw values of the record form, kept as typed.
#[derive(Debug, Clone, Default)]
pub struct RecordFormValues {
    pub date_of_discharge: String,
    pub full_name: String,
    pub discharge_department: String,
    pub treating_physician: String,
    pub history: String,
    pub k_days: String,
    pub discharge_status: String,
    pub date_of_death: String,
    pub comment: String,
}

#[derive(Template)]
#[template(path = "record_form.html")]
pub struct RecordFormTemplate {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub is_edit: bool,
    pub values: RecordFormValues,
    pub department_options: Vec<SelectOption>,
    pub status_options: Vec<SelectOption>,
    /// Known physicians for the autocomplete list.
    pub physicians: Vec<String>,
    /// Dashboard filters posted back as hidden `filter_*` inputs.
    pub return_fields: Vec<(String, String)>,
    pub cancel_url: String,
    /// Audit line shown under the edit form.
    pub meta: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NszuRow {
    pub id: i32,
    pub date: String,
    pub nszu_record_id: String,
    pub doctor: String,
    pub status: String,
    pub detail: String,
    pub fakt_summ: String,
    pub comment: String,
}

#[derive(Debug, Clone)]
pub struct StatusSummaryRow {
    pub label: String,
    pub count: u64,
    pub sum: String,
}

#[derive(Debug, Clone, Default)]
pub struct NszuFilters {
    pub month_year: String,
    pub status: String,
    pub doctor: String,
    pub nszu_record_id: String,
    pub sort_by: String,
    pub sort_order: String,
    pub per_page: u64,
}

#[derive(Template)]
#[template(path = "nszu_list.html")]
pub struct NszuListTemplate {
    pub layout: Layout,
    pub rows: Vec<NszuRow>,
    pub summary: Vec<StatusSummaryRow>,
    pub total_count: u64,
    pub total_sum: String,
    pub month_label: String,
    pub prev_month_url: String,
    pub next_month_url: String,
    pub current_month_url: String,
    pub filters: NszuFilters,
    pub status_options: Vec<SelectOption>,
    pub doctor_options: Vec<SelectOption>,
    pub sort_links: Vec<SortLink>,
    pub pager: Pager,
    pub can_edit: bool,
    pub can_delete: bool,
    /// ISO bounds of the shown month, preset in the export form.
    pub range_from: String,
    pub range_to: String,
}

#[derive(Debug, Clone, Default)]
pub struct NszuFormValues {
    pub date: String,
    pub nszu_record_id: String,
    pub doctor: String,
    pub status: String,
    pub detail: String,
    pub fakt_summ: String,
    pub comment: String,
}

#[derive(Template)]
#[template(path = "nszu_form.html")]
pub struct NszuFormTemplate {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub values: NszuFormValues,
    pub status_options: Vec<SelectOption>,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub role_label: String,
    pub created_at: String,
    pub is_self: bool,
}

#[derive(Template)]
#[template(path = "users.html")]
pub struct UsersTemplate {
    pub layout: Layout,
    pub users: Vec<UserRow>,
}

#[derive(Template)]
#[template(path = "user_form.html")]
pub struct UserFormTemplate {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub is_edit: bool,
    pub username: String,
    pub role_options: Vec<SelectOption>,
}

#[derive(Debug, Clone)]
pub struct DepartmentRow {
    pub id: i32,
    pub name: String,
    pub created_at: String,
}

#[derive(Template)]
#[template(path = "departments.html")]
pub struct DepartmentsTemplate {
    pub layout: Layout,
    pub departments: Vec<DepartmentRow>,
}

#[derive(Template)]
#[template(path = "statistics.html")]
pub struct StatisticsTemplate {
    pub layout: Layout,
    pub from_date: String,
    pub to_date: String,
    pub period_label: String,
    pub total: u64,
    pub deceased: u64,
    pub average_k_days: String,
    pub by_status: Vec<NamedCount>,
    pub by_department: Vec<NamedCount>,
    pub by_physician: Vec<NamedCount>,
    pub by_month: Vec<NamedCount>,
    pub nszu: Vec<StatusSummaryRow>,
    pub nszu_total_count: u64,
    pub nszu_total_sum: String,
}

#[derive(Debug, Clone)]
pub struct AuditRow {
    pub created_at: String,
    pub username: String,
    pub action: String,
    pub entity: String,
    pub details: String,
}

#[derive(Template)]
#[template(path = "audit.html")]
pub struct AuditTemplate {
    pub layout: Layout,
    pub entries: Vec<AuditRow>,
    pub action_filter: String,
    pub user_options: Vec<SelectOption>,
    pub pager: Pager,
}

/// Standalone error page, rendered without the layout.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub code: u16,
    pub message: String,
}

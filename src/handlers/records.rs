use axum::{
    Form, Json,
    extract::{Path, Query, RawQuery, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use chrono::NaiveDate;
use common::{
    MonthPeriod, Pagination, format_date, format_datetime, kyiv_now, kyiv_today, non_empty,
    parse_date, parse_integer, parse_optional_date,
};
use model::entities::{
    department,
    record::{self, status},
    user::{self, Role},
};
use reports::records::{self as record_reports, RecordDropdowns, RecordFilter, RecordSort};
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;

use crate::audit::{self, AuditEvent};
use crate::auth::CurrentUser;
use crate::error::{ApiError, AppError, AppResult};
use crate::flash::{self, Level};
use crate::helpers::{SelectOption, pager, query_string, sort_links};
use crate::schemas::{
    ApiResponse, AppState, CachedData, ErrorResponse, RECORD_DROPDOWNS_KEY, RecordSavedResponse,
};
use crate::templates::{
    DashboardFilters, DashboardTemplate, Layout, RecordFormTemplate, RecordFormValues, RecordRow,
    render,
};

/// Sortable dashboard columns in display order.
const SORT_COLUMNS: [(&str, &str); 9] = [
    ("id", "ID"),
    ("date_of_discharge", "Дата виписки"),
    ("full_name", "ПІБ"),
    ("discharge_department", "Відділення"),
    ("treating_physician", "Лікар"),
    ("history", "Історія"),
    ("k_days", "К днів"),
    ("discharge_status", "Статус"),
    ("date_of_death", "Дата смерті"),
];

/// `1`, `true` or `yes` in a query or form value.
pub(crate) fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Dashboard dropdown values, served from the TTL cache.
pub(crate) async fn cached_dropdowns(state: &AppState) -> AppResult<RecordDropdowns> {
    if let Some(CachedData::RecordDropdowns(dropdowns)) = state.cache.get(RECORD_DROPDOWNS_KEY).await {
        trace!("Dropdown values served from cache");
        return Ok(dropdowns);
    }
    let dropdowns = record_reports::dropdowns(&state.db).await?;
    state
        .cache
        .insert(
            RECORD_DROPDOWNS_KEY.to_string(),
            CachedData::RecordDropdowns(dropdowns.clone()),
        )
        .await;
    Ok(dropdowns)
}

async fn invalidate_dropdowns(state: &AppState) {
    state.cache.invalidate(RECORD_DROPDOWNS_KEY).await;
    debug!("Dropdown cache invalidated");
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub month_filter: Option<String>,
    pub all_months: Option<String>,
    pub discharge_status: Option<String>,
    pub treating_physician: Option<String>,
    pub discharge_department: Option<String>,
    pub history: Option<String>,
    pub full_name: Option<String>,
    pub has_death_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

/// Dashboard filters carried through the record forms as `filter_*` fields,
/// so add, edit and delete land back on the same filtered list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DashboardReturn {
    pub filter_month_filter: Option<String>,
    pub filter_all_months: Option<String>,
    pub filter_discharge_status: Option<String>,
    pub filter_treating_physician: Option<String>,
    pub filter_discharge_department: Option<String>,
    pub filter_history: Option<String>,
    pub filter_full_name: Option<String>,
    pub filter_has_death_date: Option<String>,
}

impl DashboardReturn {
    fn from_filters(filters: &DashboardFilters) -> Self {
        let flag = |on: bool| on.then(|| "1".to_string());
        Self {
            filter_month_filter: non_empty(&filters.month_filter),
            filter_all_months: flag(filters.all_months),
            filter_discharge_status: non_empty(&filters.discharge_status),
            filter_treating_physician: non_empty(&filters.treating_physician),
            filter_discharge_department: non_empty(&filters.discharge_department),
            filter_history: non_empty(&filters.history),
            filter_full_name: non_empty(&filters.full_name),
            filter_has_death_date: flag(filters.has_death_date),
        }
    }

    /// `(dashboard parameter, value)` pairs in dashboard order.
    fn dashboard_params(&self) -> [(&'static str, &str); 8] {
        fn value(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or_default()
        }
        [
            ("month_filter", value(&self.filter_month_filter)),
            ("all_months", value(&self.filter_all_months)),
            ("discharge_status", value(&self.filter_discharge_status)),
            ("treating_physician", value(&self.filter_treating_physician)),
            ("discharge_department", value(&self.filter_discharge_department)),
            ("history", value(&self.filter_history)),
            ("full_name", value(&self.filter_full_name)),
            ("has_death_date", value(&self.filter_has_death_date)),
        ]
    }

    /// Non-blank `(filter_* name, value)` pairs for hidden inputs.
    pub fn hidden_fields(&self) -> Vec<(String, String)> {
        self.dashboard_params()
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(name, value)| (format!("filter_{}", name), value.to_string()))
            .collect()
    }

    /// Query string of the hidden fields, for links to the record forms.
    pub fn form_query(&self) -> String {
        let fields = self.hidden_fields();
        let pairs: Vec<(&str, &str)> = fields.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
        query_string(&pairs)
    }

    /// `path` with the filters attached, used when a form is sent back.
    pub fn form_url(&self, path: &str) -> String {
        match self.form_query() {
            query if query.is_empty() => path.to_string(),
            query => format!("{}?{}", path, query),
        }
    }

    /// Filtered dashboard URL, optionally scrolled to `#record-<id>`.
    pub fn url(&self, anchor: Option<i32>) -> String {
        let query = query_string(&self.dashboard_params());
        let mut url = if query.is_empty() {
            "/".to_string()
        } else {
            format!("/?{}", query)
        };
        if let Some(id) = anchor {
            url.push_str(&format!("#record-{}", id));
        }
        url
    }
}

/// Record form as posted from the HTML pages: the record itself plus the
/// dashboard state to return to.
#[derive(Debug, Default, Deserialize)]
pub struct RecordPageForm {
    #[serde(flatten)]
    pub record: RecordForm,
    #[serde(flatten)]
    pub back: DashboardReturn,
}

fn optional(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(non_empty)
}

fn record_row(r: record::Model) -> RecordRow {
    RecordRow {
        id: r.id,
        date_of_discharge: r.date_of_discharge.map(format_date).unwrap_or_default(),
        deceased: r.is_deceased(),
        full_name: r.full_name,
        discharge_department: r.discharge_department.unwrap_or_default(),
        treating_physician: r.treating_physician.unwrap_or_default(),
        history: r.history.unwrap_or_default(),
        k_days: r.k_days.map(|k| k.to_string()).unwrap_or_default(),
        discharge_status: r.discharge_status.unwrap_or_default(),
        date_of_death: r.date_of_death.map(format_date).unwrap_or_default(),
        comment: r.comment.unwrap_or_default(),
    }
}

/// Dashboard: filtered, sorted and paginated list of records for a month.
#[instrument(skip(state, jar))]
pub async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    RawQuery(raw_query): RawQuery,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Response> {
    trace!("Entering dashboard function");
    if user.role == Role::Viewer && raw_query.as_deref().is_none_or(str::is_empty) {
        debug!("Viewer without filters sent to statistics");
        return Ok(Redirect::to("/admin/statistics").into_response());
    }

    let month = MonthPeriod::parse_or_current(query.month_filter.as_deref());
    let all_months = is_truthy(query.all_months.as_deref());
    let filter = RecordFilter {
        period: (!all_months).then(|| month.range()),
        discharge_status: optional(&query.discharge_status),
        treating_physician: optional(&query.treating_physician),
        discharge_department: optional(&query.discharge_department),
        history: optional(&query.history),
        full_name: optional(&query.full_name),
        has_death_date: is_truthy(query.has_death_date.as_deref()),
    };
    let sort = RecordSort::parse(query.sort_by.as_deref(), query.sort_order.as_deref());
    let pagination = Pagination::from_query(query.page.as_deref(), query.per_page.as_deref());
    debug!("Dashboard filter: {:?}, sort: {:?}", filter, sort);

    let counts = record_reports::counts(&state.db, &filter).await?;
    let (records, page_info) = record_reports::page(&state.db, &filter, sort, pagination).await?;
    let dropdowns = cached_dropdowns(&state).await?;

    let filters = DashboardFilters {
        month_filter: month.to_string(),
        all_months,
        discharge_status: filter.discharge_status.clone().unwrap_or_default(),
        treating_physician: filter.treating_physician.clone().unwrap_or_default(),
        discharge_department: filter.discharge_department.clone().unwrap_or_default(),
        history: filter.history.clone().unwrap_or_default(),
        full_name: filter.full_name.clone().unwrap_or_default(),
        has_death_date: filter.has_death_date,
        sort_by: sort.column.map(|c| c.as_str()).unwrap_or_default().to_string(),
        sort_order: if sort.descending { "desc" } else { "asc" }.to_string(),
        per_page: pagination.per_page,
    };

    let per_page = pagination.per_page.to_string();
    let params: Vec<(&str, &str)> = vec![
        ("month_filter", filters.month_filter.as_str()),
        ("all_months", if all_months { "1" } else { "" }),
        ("discharge_status", filters.discharge_status.as_str()),
        ("treating_physician", filters.treating_physician.as_str()),
        ("discharge_department", filters.discharge_department.as_str()),
        ("history", filters.history.as_str()),
        ("full_name", filters.full_name.as_str()),
        ("has_death_date", if filters.has_death_date { "1" } else { "" }),
        ("per_page", per_page.as_str()),
    ];
    let active_column = sort
        .column
        .map(|c| c.as_str())
        .unwrap_or("date_of_discharge");
    let links = sort_links("/", &params, &SORT_COLUMNS, active_column, sort.descending);
    let mut pager_params = params.clone();
    pager_params.push(("sort_by", filters.sort_by.as_str()));
    pager_params.push(("sort_order", filters.sort_order.as_str()));
    let pager = pager("/", &pager_params, page_info);

    let status_options = SelectOption::plain(&dropdowns.statuses, filter.discharge_status.as_deref());
    let physician_options =
        SelectOption::plain(&dropdowns.physicians, filter.treating_physician.as_deref());
    let department_options =
        SelectOption::plain(&dropdowns.departments, filter.discharge_department.as_deref());

    let period_label = if all_months {
        "усі місяці".to_string()
    } else {
        month.display_name()
    };

    let back = DashboardReturn::from_filters(&filters);
    let (jar, flashes) = flash::take(jar);
    let page = DashboardTemplate {
        layout: Layout::new("Записи", Some(&user), flashes),
        return_query: back.form_query(),
        return_fields: back.hidden_fields(),
        rows: records.into_iter().map(record_row).collect(),
        total: counts.total,
        deceased: counts.deceased,
        discharged: counts.discharged,
        processing: counts.processing,
        violations: counts.violations,
        period_label,
        status_options,
        physician_options,
        department_options,
        sort_links: links,
        pager,
        can_edit: user.has_any_role(&[Role::Editor]),
        can_delete: user.is_admin(),
        can_export: user.has_any_role(&[Role::Editor, Role::Viewer]),
        restricted_export: user.role == Role::Viewer,
        today: kyiv_today().format("%Y-%m-%d").to_string(),
        filters,
    };
    info!("Dashboard rendered for '{}' with {} records", user.username, counts.total);
    Ok((jar, render(&page)?).into_response())
}

/// Raw record form as submitted by the browser or the JSON-less API client.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct RecordForm {
    /// `DD.MM.YYYY` or `YYYY-MM-DD`
    pub date_of_discharge: String,
    pub full_name: String,
    pub discharge_department: String,
    pub treating_physician: String,
    pub history: String,
    pub k_days: String,
    /// Ignored on create; new records always start as `Опрацьовується`
    pub discharge_status: String,
    pub date_of_death: String,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Create,
    Update,
}

/// The HTML forms and the API word their errors differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Page,
    Api,
}

/// A record form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecord {
    pub date_of_discharge: NaiveDate,
    pub full_name: String,
    pub discharge_department: Option<String>,
    pub treating_physician: String,
    pub history: String,
    pub k_days: i32,
    pub discharge_status: Option<String>,
    pub date_of_death: Option<NaiveDate>,
    pub comment: Option<String>,
}

impl RecordForm {
    pub fn validate(&self, action: RecordAction, channel: Channel) -> Result<ValidRecord, String> {
        let discharge_department = non_empty(&self.discharge_department);
        let discharge_status = non_empty(&self.discharge_status);

        let mut missing = [
            &self.date_of_discharge,
            &self.full_name,
            &self.treating_physician,
            &self.history,
            &self.k_days,
        ]
        .iter()
        .any(|value| value.trim().is_empty());
        if action == RecordAction::Update {
            missing |= discharge_department.is_none() || discharge_status.is_none();
        }
        if missing {
            let message = match (action, channel) {
                (RecordAction::Create, Channel::Page) => {
                    "Будь ласка, заповніть усі обов'язкові поля (виключаючи відділення)"
                }
                _ => "Будь ласка, заповніть усі обов'язкові поля",
            };
            return Err(message.to_string());
        }

        let date_of_discharge = parse_date(&self.date_of_discharge).map_err(|_| match channel {
            Channel::Page => "Дата виписки повинна бути у форматі ДД.ММ.РРРР або РРРР-ММ-ДД".to_string(),
            Channel::Api => "Невірний формат дати виписки".to_string(),
        })?;

        let k_days = parse_integer(&self.k_days)
            .map_err(|_| "\"К днів\" повинно бути цілим числом".to_string())?;

        let date_of_death = parse_optional_date(&self.date_of_death).map_err(|_| match channel {
            Channel::Page => "Дата смерті повинна бути у форматі ДД.ММ.РРРР або РРРР-ММ-ДД".to_string(),
            Channel::Api => "Невірний формат дати смерті".to_string(),
        })?;
        if date_of_death.is_some_and(|death| death < date_of_discharge) {
            return Err("Дата смерті не може бути раніше дати виписки".to_string());
        }

        Ok(ValidRecord {
            date_of_discharge,
            full_name: self.full_name.trim().to_string(),
            discharge_department,
            treating_physician: self.treating_physician.trim().to_string(),
            history: self.history.trim().to_string(),
            k_days,
            discharge_status: match action {
                RecordAction::Create => Some(status::PROCESSING.to_string()),
                RecordAction::Update => discharge_status,
            },
            date_of_death,
            comment: non_empty(&self.comment),
        })
    }
}

impl ValidRecord {
    fn apply(self, active: &mut record::ActiveModel, user_id: i32) {
        active.date_of_discharge = Set(Some(self.date_of_discharge));
        active.full_name = Set(self.full_name);
        active.discharge_department = Set(self.discharge_department);
        active.treating_physician = Set(Some(self.treating_physician));
        active.history = Set(Some(self.history));
        active.k_days = Set(Some(self.k_days));
        active.discharge_status = Set(self.discharge_status);
        active.date_of_death = Set(self.date_of_death);
        active.comment = Set(self.comment);
        active.updated_by = Set(Some(user_id));
        active.updated_at = Set(kyiv_now());
    }
}

async fn create_record(state: &AppState, user: &CurrentUser, valid: ValidRecord) -> AppResult<record::Model> {
    let now = kyiv_now();
    let mut active = record::ActiveModel {
        created_by: Set(Some(user.id)),
        created_at: Set(now),
        ..Default::default()
    };
    valid.apply(&mut active, user.id);
    let saved = active.insert(&state.db).await?;

    invalidate_dropdowns(state).await;
    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("record.create")
            .entity("record", Some(saved.id))
            .details(format!("full_name={}", saved.full_name)),
    )
    .await;
    info!("Record created: {} by {}", saved.id, user.username);
    Ok(saved)
}

async fn update_record(
    state: &AppState,
    user: &CurrentUser,
    existing: record::Model,
    valid: ValidRecord,
) -> AppResult<record::Model> {
    let mut active: record::ActiveModel = existing.into();
    valid.apply(&mut active, user.id);
    let saved = active.update(&state.db).await?;

    invalidate_dropdowns(state).await;
    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("record.update")
            .entity("record", Some(saved.id))
            .details(format!("full_name={}", saved.full_name)),
    )
    .await;
    info!("Record updated: {} by {}", saved.id, user.username);
    Ok(saved)
}

async fn find_record(state: &AppState, record_id: i32) -> AppResult<record::Model> {
    record::Entity::find_by_id(record_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound)
}

/// Department names for the form, keeping a stored value that was since deleted.
async fn department_options(state: &AppState, current: Option<&str>) -> AppResult<Vec<SelectOption>> {
    let mut names: Vec<String> = department::Entity::find()
        .order_by_asc(department::Column::Name)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|d| d.name)
        .collect();
    if let Some(current) = current.filter(|c| !names.iter().any(|n| n == c)) {
        names.push(current.to_string());
    }
    Ok(SelectOption::plain(&names, current))
}

fn status_options(current: Option<&str>) -> Vec<SelectOption> {
    let mut statuses: Vec<String> = status::ALL.iter().map(|s| s.to_string()).collect();
    if let Some(current) = current.filter(|c| !status::ALL.contains(c)) {
        statuses.push(current.to_string());
    }
    SelectOption::plain(&statuses, current)
}

#[instrument(skip(state, jar))]
pub async fn add_record_page(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Query(back): Query<DashboardReturn>,
) -> AppResult<Response> {
    user.require(&[Role::Operator])?;
    let (jar, flashes) = flash::take(jar);
    let page = RecordFormTemplate {
        layout: Layout::new("Додати запис", Some(&user), flashes),
        heading: "Новий запис".to_string(),
        action: "/records/add".to_string(),
        is_edit: false,
        values: RecordFormValues::default(),
        department_options: department_options(&state, None).await?,
        status_options: Vec::new(),
        physicians: cached_dropdowns(&state).await?.physicians,
        return_fields: back.hidden_fields(),
        cancel_url: back.url(None),
        meta: None,
    };
    Ok((jar, render(&page)?).into_response())
}

#[instrument(skip(state, jar))]
pub async fn add_record(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<RecordPageForm>,
) -> AppResult<Response> {
    trace!("Entering add_record function");
    user.require(&[Role::Operator])?;
    let RecordPageForm { record: form, back } = form;
    let valid = form
        .validate(RecordAction::Create, Channel::Page)
        .map_err(|message| AppError::validation(message, back.form_url("/records/add")))?;

    let saved = create_record(&state, &user, valid).await?;
    let jar = flash::push(
        jar,
        Level::Success,
        format!("Запис \"{}\" успішно додано", saved.full_name),
    );
    Ok((jar, Redirect::to(&back.url(Some(saved.id)))).into_response())
}

/// Add a discharge record
#[utoipa::path(
    post,
    path = "/api/records/add",
    tag = "records",
    request_body(content = RecordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Record created", body = ApiResponse<RecordSavedResponse>),
        (status = 400, description = "Invalid form values", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn api_add_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<RecordForm>,
) -> Result<Json<ApiResponse<RecordSavedResponse>>, ApiError> {
    info!("API add_record called by {}", user.username);
    user.require(&[Role::Operator])?;
    let valid = form
        .validate(RecordAction::Create, Channel::Api)
        .map_err(|message| AppError::validation(message, "/records/add"))?;

    let saved = create_record(&state, &user, valid).await?;
    Ok(Json(ApiResponse {
        message: format!("Запис \"{}\" успішно додано", saved.full_name),
        data: RecordSavedResponse {
            record_id: saved.id,
            full_name: saved.full_name,
        },
        success: true,
    }))
}

async fn username_of(state: &AppState, user_id: Option<i32>) -> AppResult<String> {
    let Some(id) = user_id else {
        return Ok("-".to_string());
    };
    Ok(user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .map(|u| u.username)
        .unwrap_or_else(|| "-".to_string()))
}

#[instrument(skip(state, jar))]
pub async fn edit_record_page(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(record_id): Path<i32>,
    Query(back): Query<DashboardReturn>,
) -> AppResult<Response> {
    user.require(&[Role::Editor])?;
    let r = find_record(&state, record_id).await?;

    let meta = format!(
        "Створено: {} ({}), оновлено: {} ({})",
        format_datetime(r.created_at),
        username_of(&state, r.created_by).await?,
        format_datetime(r.updated_at),
        username_of(&state, r.updated_by).await?,
    );
    let departments = department_options(&state, r.discharge_department.as_deref()).await?;
    let statuses = status_options(r.discharge_status.as_deref());

    let values = RecordFormValues {
        date_of_discharge: r.date_of_discharge.map(format_date).unwrap_or_default(),
        full_name: r.full_name.clone(),
        discharge_department: r.discharge_department.clone().unwrap_or_default(),
        treating_physician: r.treating_physician.clone().unwrap_or_default(),
        history: r.history.clone().unwrap_or_default(),
        k_days: r.k_days.map(|k| k.to_string()).unwrap_or_default(),
        discharge_status: r.discharge_status.clone().unwrap_or_default(),
        date_of_death: r.date_of_death.map(format_date).unwrap_or_default(),
        comment: r.comment.clone().unwrap_or_default(),
    };

    let (jar, flashes) = flash::take(jar);
    let page = RecordFormTemplate {
        layout: Layout::new(format!("Запис #{}", r.id), Some(&user), flashes),
        heading: format!("Редагування запису #{}", r.id),
        action: format!("/records/{}/edit", r.id),
        is_edit: true,
        values,
        department_options: departments,
        status_options: statuses,
        physicians: cached_dropdowns(&state).await?.physicians,
        return_fields: back.hidden_fields(),
        cancel_url: back.url(Some(r.id)),
        meta: Some(meta),
    };
    Ok((jar, render(&page)?).into_response())
}

#[instrument(skip(state, jar))]
pub async fn edit_record(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(record_id): Path<i32>,
    Form(form): Form<RecordPageForm>,
) -> AppResult<Response> {
    trace!("Entering edit_record function for record_id: {}", record_id);
    user.require(&[Role::Editor])?;
    let existing = find_record(&state, record_id).await?;
    let RecordPageForm { record: form, back } = form;
    let valid = form.validate(RecordAction::Update, Channel::Page).map_err(|message| {
        AppError::validation(message, back.form_url(&format!("/records/{}/edit", record_id)))
    })?;

    let saved = update_record(&state, &user, existing, valid).await?;
    let jar = flash::push(
        jar,
        Level::Success,
        format!("Запис #{} ({}) успішно оновлено", saved.id, saved.full_name),
    );
    Ok((jar, Redirect::to(&back.url(Some(saved.id)))).into_response())
}

/// Update a discharge record
#[utoipa::path(
    post,
    path = "/api/records/{record_id}/edit",
    tag = "records",
    params(
        ("record_id" = i32, Path, description = "Record ID"),
    ),
    request_body(content = RecordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Record updated", body = ApiResponse<RecordSavedResponse>),
        (status = 400, description = "Invalid form values", body = ErrorResponse),
        (status = 404, description = "Record not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn api_edit_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(record_id): Path<i32>,
    Form(form): Form<RecordForm>,
) -> Result<Json<ApiResponse<RecordSavedResponse>>, ApiError> {
    info!("API edit_record called by {} for record {}", user.username, record_id);
    user.require(&[Role::Editor])?;
    let existing = find_record(&state, record_id).await?;
    let valid = form
        .validate(RecordAction::Update, Channel::Api)
        .map_err(|message| AppError::validation(message, format!("/records/{}/edit", record_id)))?;

    let saved = update_record(&state, &user, existing, valid).await?;
    Ok(Json(ApiResponse {
        message: format!("Запис \"{}\" успішно оновлено", saved.full_name),
        data: RecordSavedResponse {
            record_id: saved.id,
            full_name: saved.full_name,
        },
        success: true,
    }))
}

#[instrument(skip(state, jar))]
pub async fn delete_record(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(record_id): Path<i32>,
    Form(back): Form<DashboardReturn>,
) -> AppResult<Response> {
    user.require_admin()?;
    let r = find_record(&state, record_id).await?;
    let (id, full_name) = (r.id, r.full_name.clone());
    r.delete(&state.db).await?;

    invalidate_dropdowns(&state).await;
    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("record.delete")
            .entity("record", Some(id))
            .details(format!("full_name={}", full_name)),
    )
    .await;
    info!("Record deleted: {} by {}", id, user.username);

    let jar = flash::push(jar, Level::Danger, format!("Запис #{} ({}) видалено", id, full_name));
    Ok((jar, Redirect::to(&back.url(None))).into_response())
}

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use chrono::NaiveDate;
use common::{MonthPeriod, Pagination, format_date, kyiv_now, non_empty, parse_date, parse_decimal};
use model::entities::{nszu_correction::{self, NszuStatus}, user::Role};
use reports::nszu::{self as nszu_reports, NszuFilter, NszuSort, NszuSummary};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Iterable, ModelTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;

use crate::audit::{self, AuditEvent};
use crate::auth::CurrentUser;
use crate::error::{ApiError, AppError, AppResult};
use crate::flash::{self, Level};
use crate::helpers::{SelectOption, pager, query_string, sort_links};
use crate::schemas::{ApiResponse, AppState, ErrorResponse, NszuSavedResponse};
use crate::templates::{
    Layout, NszuFilters, NszuFormTemplate, NszuFormValues, NszuListTemplate, NszuRow,
    StatusSummaryRow, render,
};

const SORT_COLUMNS: [(&str, &str); 6] = [
    ("id", "ID"),
    ("date", "Дата"),
    ("nszu_record_id", "НСЗУ ID"),
    ("doctor", "Лікар"),
    ("status", "Статус"),
    ("fakt_summ", "Факт. сума"),
];

/// Amounts are shown with two decimals.
pub(crate) fn format_amount(value: Decimal) -> String {
    format!("{:.2}", value)
}

pub(crate) fn summary_rows(summary: &NszuSummary) -> Vec<StatusSummaryRow> {
    summary
        .per_status
        .iter()
        .map(|total| StatusSummaryRow {
            label: total.status.label().to_string(),
            count: total.count,
            sum: format_amount(total.sum),
        })
        .collect()
}

fn status_options(current: Option<&str>) -> Vec<SelectOption> {
    NszuStatus::iter()
        .map(|status| SelectOption::new(status.label(), status.label(), current))
        .collect()
}

fn list_url(month: MonthPeriod) -> String {
    format!("/nszu?{}", query_string(&[("month_year", month.to_string().as_str())]))
}

#[derive(Debug, Default, Deserialize)]
pub struct NszuListQuery {
    pub month_year: Option<String>,
    pub status: Option<String>,
    pub doctor: Option<String>,
    pub nszu_record_id: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

fn nszu_row(c: nszu_correction::Model) -> NszuRow {
    NszuRow {
        id: c.id,
        date: format_date(c.date),
        nszu_record_id: c.nszu_record_id,
        doctor: c.doctor,
        status: c.status.label().to_string(),
        detail: c.detail.unwrap_or_default(),
        fakt_summ: format_amount(c.fakt_summ),
        comment: c.comment.unwrap_or_default(),
    }
}

/// Monthly list of NSZU corrections with per-status totals.
#[instrument(skip(state, jar))]
pub async fn nszu_list(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Query(query): Query<NszuListQuery>,
) -> AppResult<Response> {
    trace!("Entering nszu_list function");
    user.require(&[Role::Editor, Role::Viewer])?;

    let month = MonthPeriod::parse_or_current(query.month_year.as_deref());
    let status_label = query.status.as_deref().and_then(non_empty);
    let filter = NszuFilter {
        status: status_label.as_deref().and_then(NszuStatus::from_label),
        doctor: query.doctor.as_deref().and_then(non_empty),
        nszu_record_id: query.nszu_record_id.as_deref().and_then(non_empty),
        ..NszuFilter::new(month.range())
    };
    let sort = NszuSort::parse(query.sort_by.as_deref(), query.sort_order.as_deref());
    let pagination = Pagination::from_query(query.page.as_deref(), query.per_page.as_deref());
    debug!("NSZU filter: {:?}, sort: {:?}", filter, sort);

    let (corrections, page_info) = nszu_reports::page(&state.db, &filter, sort, pagination).await?;
    let summary = nszu_reports::summary(&state.db, &filter).await?;
    let doctors = nszu_reports::doctors(&state.db).await?;

    let filters = NszuFilters {
        month_year: month.to_string(),
        status: filter.status.map(|s| s.label().to_string()).unwrap_or_default(),
        doctor: filter.doctor.clone().unwrap_or_default(),
        nszu_record_id: filter.nszu_record_id.clone().unwrap_or_default(),
        sort_by: sort.column.as_str().to_string(),
        sort_order: if sort.descending { "desc" } else { "asc" }.to_string(),
        per_page: pagination.per_page,
    };

    let per_page = pagination.per_page.to_string();
    let params: Vec<(&str, &str)> = vec![
        ("month_year", filters.month_year.as_str()),
        ("status", filters.status.as_str()),
        ("doctor", filters.doctor.as_str()),
        ("nszu_record_id", filters.nszu_record_id.as_str()),
        ("per_page", per_page.as_str()),
    ];
    let links = sort_links("/nszu", &params, &SORT_COLUMNS, sort.column.as_str(), sort.descending);
    let mut pager_params = params.clone();
    pager_params.push(("sort_by", filters.sort_by.as_str()));
    pager_params.push(("sort_order", filters.sort_order.as_str()));
    let pager = pager("/nszu", &pager_params, page_info);

    let range = month.range();
    let (jar, flashes) = flash::take(jar);
    let page = NszuListTemplate {
        layout: Layout::new("Перевірки НСЗУ", Some(&user), flashes),
        rows: corrections.into_iter().map(nszu_row).collect(),
        summary: summary_rows(&summary),
        total_count: summary.total_count,
        total_sum: format_amount(summary.total_sum),
        month_label: month.display_name(),
        prev_month_url: list_url(month.prev()),
        next_month_url: list_url(month.next()),
        current_month_url: "/nszu".to_string(),
        status_options: status_options(filter.status.map(|s| s.label())),
        doctor_options: SelectOption::plain(&doctors, filter.doctor.as_deref()),
        sort_links: links,
        pager,
        can_edit: user.has_any_role(&[Role::Editor]),
        can_delete: user.is_admin(),
        range_from: range.from.format("%Y-%m-%d").to_string(),
        range_to: range.to.format("%Y-%m-%d").to_string(),
        filters,
    };
    info!(
        "NSZU list rendered for '{}': {} corrections in {}",
        user.username, summary.total_count, month
    );
    Ok((jar, render(&page)?).into_response())
}

/// Raw NSZU correction form.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct NszuForm {
    /// `DD.MM.YYYY` or `YYYY-MM-DD`
    pub date: String,
    pub nszu_record_id: String,
    pub doctor: String,
    /// Defaults to `В обробці` when blank on create
    pub status: String,
    pub detail: String,
    /// Comma or dot as decimal separator; blank or `-` is zero
    pub fakt_summ: String,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NszuAction {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCorrection {
    pub date: NaiveDate,
    pub nszu_record_id: String,
    pub doctor: String,
    pub status: NszuStatus,
    pub detail: Option<String>,
    pub fakt_summ: Decimal,
    pub comment: Option<String>,
}

impl NszuForm {
    pub fn validate(&self, action: NszuAction) -> Result<ValidCorrection, String> {
        let status = non_empty(&self.status);
        let mut missing = [&self.date, &self.nszu_record_id, &self.doctor]
            .iter()
            .any(|value| value.trim().is_empty());
        if action == NszuAction::Update {
            missing |= status.is_none();
        }
        if missing {
            return Err(match action {
                NszuAction::Create => {
                    "Будь ласка, заповніть усі обов'язкові поля (дата, НСЗУ ID, лікар)"
                }
                NszuAction::Update => "Будь ласка, заповніть усі обов'язкові поля",
            }
            .to_string());
        }

        let date = parse_date(&self.date)
            .map_err(|_| "Дата повинна бути у форматі ДД.ММ.РРРР або РРРР-ММ-ДД".to_string())?;
        let fakt_summ = parse_decimal(&self.fakt_summ)
            .map_err(|_| "Фактична сума повинна бути числом".to_string())?;
        let status = match status {
            Some(label) => NszuStatus::from_label(&label)
                .ok_or_else(|| format!("Невідомий статус \"{}\"", label))?,
            None => NszuStatus::default(),
        };

        Ok(ValidCorrection {
            date,
            nszu_record_id: self.nszu_record_id.trim().to_string(),
            doctor: self.doctor.trim().to_string(),
            status,
            detail: non_empty(&self.detail),
            fakt_summ: fakt_summ.round_dp(2),
            comment: non_empty(&self.comment),
        })
    }
}

impl ValidCorrection {
    fn apply(self, active: &mut nszu_correction::ActiveModel, user_id: i32) {
        active.date = Set(self.date);
        active.nszu_record_id = Set(self.nszu_record_id);
        active.doctor = Set(self.doctor);
        active.status = Set(self.status);
        active.detail = Set(self.detail);
        active.fakt_summ = Set(self.fakt_summ);
        active.comment = Set(self.comment);
        active.updated_by = Set(Some(user_id));
        active.updated_at = Set(kyiv_now());
    }
}

async fn create_correction(
    state: &AppState,
    user: &CurrentUser,
    valid: ValidCorrection,
) -> AppResult<nszu_correction::Model> {
    let mut active = nszu_correction::ActiveModel {
        created_by: Set(Some(user.id)),
        created_at: Set(kyiv_now()),
        ..Default::default()
    };
    valid.apply(&mut active, user.id);
    let saved = active.insert(&state.db).await?;

    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("nszu.create")
            .entity("nszu_correction", Some(saved.id))
            .details(format!("nszu_record_id={}", saved.nszu_record_id)),
    )
    .await;
    info!("NSZU correction created: {} by {}", saved.id, user.username);
    Ok(saved)
}

async fn find_correction(state: &AppState, id: i32) -> AppResult<nszu_correction::Model> {
    nszu_correction::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound)
}

#[instrument(skip(jar))]
pub async fn add_correction_page(user: CurrentUser, jar: CookieJar) -> AppResult<Response> {
    user.require(&[Role::Editor])?;
    let (jar, flashes) = flash::take(jar);
    let page = NszuFormTemplate {
        layout: Layout::new("Додати перевірку НСЗУ", Some(&user), flashes),
        heading: "Нова перевірка НСЗУ".to_string(),
        action: "/nszu/add".to_string(),
        values: NszuFormValues::default(),
        status_options: status_options(Some(NszuStatus::default().label())),
    };
    Ok((jar, render(&page)?).into_response())
}

#[instrument(skip(state, jar))]
pub async fn add_correction(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<NszuForm>,
) -> AppResult<Response> {
    trace!("Entering add_correction function");
    user.require(&[Role::Editor])?;
    let valid = form
        .validate(NszuAction::Create)
        .map_err(|message| AppError::validation(message, "/nszu/add"))?;

    let saved = create_correction(&state, &user, valid).await?;
    let jar = flash::push(
        jar,
        Level::Success,
        format!("Запис перевірки НСЗУ #{} успішно додано", saved.id),
    );
    Ok((jar, Redirect::to("/nszu")).into_response())
}

/// Add an NSZU correction
#[utoipa::path(
    post,
    path = "/nszu/api/add",
    tag = "nszu",
    request_body(content = NszuForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Correction created", body = ApiResponse<NszuSavedResponse>),
        (status = 400, description = "Invalid form values", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn api_add_correction(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<NszuForm>,
) -> Result<(StatusCode, Json<ApiResponse<NszuSavedResponse>>), ApiError> {
    info!("API add_correction called by {}", user.username);
    user.require(&[Role::Editor])?;
    let valid = form
        .validate(NszuAction::Create)
        .map_err(|message| AppError::validation(message, "/nszu/add"))?;

    let saved = create_correction(&state, &user, valid).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            message: format!("Запис перевірки НСЗУ #{} успішно додано", saved.id),
            data: NszuSavedResponse {
                id: saved.id,
                nszu_record_id: saved.nszu_record_id,
                date: saved.date.format("%Y-%m-%d").to_string(),
            },
            success: true,
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn edit_correction_page(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(correction_id): Path<i32>,
) -> AppResult<Response> {
    user.require(&[Role::Editor])?;
    let c = find_correction(&state, correction_id).await?;

    let values = NszuFormValues {
        date: format_date(c.date),
        nszu_record_id: c.nszu_record_id.clone(),
        doctor: c.doctor.clone(),
        status: c.status.label().to_string(),
        detail: c.detail.clone().unwrap_or_default(),
        fakt_summ: format_amount(c.fakt_summ),
        comment: c.comment.clone().unwrap_or_default(),
    };
    let (jar, flashes) = flash::take(jar);
    let page = NszuFormTemplate {
        layout: Layout::new(format!("Перевірка НСЗУ #{}", c.id), Some(&user), flashes),
        heading: format!("Редагування перевірки НСЗУ #{}", c.id),
        action: format!("/nszu/{}/edit", c.id),
        status_options: status_options(Some(c.status.label())),
        values,
    };
    Ok((jar, render(&page)?).into_response())
}

#[instrument(skip(state, jar))]
pub async fn edit_correction(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(correction_id): Path<i32>,
    Form(form): Form<NszuForm>,
) -> AppResult<Response> {
    trace!("Entering edit_correction function for id: {}", correction_id);
    user.require(&[Role::Editor])?;
    let existing = find_correction(&state, correction_id).await?;
    let valid = form
        .validate(NszuAction::Update)
        .map_err(|message| AppError::validation(message, format!("/nszu/{}/edit", correction_id)))?;

    let mut active: nszu_correction::ActiveModel = existing.into();
    valid.apply(&mut active, user.id);
    let saved = active.update(&state.db).await?;

    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("nszu.update")
            .entity("nszu_correction", Some(saved.id))
            .details(format!("nszu_record_id={}", saved.nszu_record_id)),
    )
    .await;
    info!("NSZU correction updated: {} by {}", saved.id, user.username);

    let jar = flash::push(
        jar,
        Level::Success,
        format!("Запис перевірки НСЗУ #{} успішно оновлено", saved.id),
    );
    Ok((jar, Redirect::to(&list_url(MonthPeriod::containing(saved.date)))).into_response())
}

#[instrument(skip(state, jar))]
pub async fn delete_correction(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(correction_id): Path<i32>,
) -> AppResult<Response> {
    user.require_admin()?;
    let c = find_correction(&state, correction_id).await?;
    let (id, nszu_record_id, month) = (c.id, c.nszu_record_id.clone(), MonthPeriod::containing(c.date));
    c.delete(&state.db).await?;

    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("nszu.delete")
            .entity("nszu_correction", Some(id))
            .details(format!("nszu_record_id={}", nszu_record_id)),
    )
    .await;
    info!("NSZU correction deleted: {} by {}", id, user.username);

    let jar = flash::push(jar, Level::Danger, format!("Запис перевірки НСЗУ #{} видалено", id));
    Ok((jar, Redirect::to(&list_url(month))).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> NszuForm {
        NszuForm {
            date: "03.03.2025".to_string(),
            nszu_record_id: " A-100 ".to_string(),
            doctor: "Петренко".to_string(),
            fakt_summ: "1 250,50".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_defaults() {
        let valid = valid_form().validate(NszuAction::Create).unwrap();
        assert_eq!(valid.status, NszuStatus::InProgress);
        assert_eq!(valid.nszu_record_id, "A-100");
        assert_eq!(valid.fakt_summ, Decimal::new(125050, 2));
        assert_eq!(valid.detail, None);
    }

    #[test]
    fn test_blank_or_dash_sum_is_zero() {
        let mut form = valid_form();
        form.fakt_summ = "-".to_string();
        assert_eq!(form.validate(NszuAction::Create).unwrap().fakt_summ, Decimal::ZERO);
        form.fakt_summ.clear();
        assert_eq!(form.validate(NszuAction::Create).unwrap().fakt_summ, Decimal::ZERO);
    }

    #[test]
    fn test_validation_messages() {
        let mut form = valid_form();
        form.doctor.clear();
        assert_eq!(
            form.validate(NszuAction::Create).unwrap_err(),
            "Будь ласка, заповніть усі обов'язкові поля (дата, НСЗУ ID, лікар)"
        );

        // status is mandatory on update only
        let form = valid_form();
        assert_eq!(
            form.validate(NszuAction::Update).unwrap_err(),
            "Будь ласка, заповніть усі обов'язкові поля"
        );

        let mut form = valid_form();
        form.date = "03/03/2025".to_string();
        assert_eq!(
            form.validate(NszuAction::Create).unwrap_err(),
            "Дата повинна бути у форматі ДД.ММ.РРРР або РРРР-ММ-ДД"
        );

        let mut form = valid_form();
        form.fakt_summ = "сто".to_string();
        assert_eq!(
            form.validate(NszuAction::Create).unwrap_err(),
            "Фактична сума повинна бути числом"
        );
    }

    #[test]
    fn test_status_label_parsed() {
        let mut form = valid_form();
        form.status = "Оплачено".to_string();
        assert_eq!(form.validate(NszuAction::Update).unwrap().status, NszuStatus::Paid);
        form.status = "Скасовано".to_string();
        assert!(form.validate(NszuAction::Update).is_err());
    }

    #[test]
    fn test_summary_rows_format() {
        let summary = NszuSummary::from_corrections(std::iter::empty());
        let rows = summary_rows(&summary);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].label, "В обробці");
        assert_eq!(rows[0].sum, "0.00");
    }
}

//! Excel and PDF downloads for records and NSZU corrections.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use common::{DateRange, MonthPeriod, kyiv_now, kyiv_today, non_empty, parse_iso_date};
use model::entities::{nszu_correction::NszuStatus, user::Role};
use reports::nszu::{self as nszu_reports, NszuFilter};
use reports::records::{self as record_reports, ExportColumns, ExportPeriod, RecordFilter};
use serde::Deserialize;
use tracing::{error, info, instrument, trace};

use crate::audit::{self, AuditEvent};
use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::flash::{self, Level};
use crate::handlers::records::is_truthy;
use crate::helpers::{PDF_CONTENT_TYPE, XLSX_CONTENT_TYPE, download};
use crate::schemas::AppState;

const EXPORT_ROLES: [Role; 2] = [Role::Editor, Role::Viewer];

/// Parses both ends of an ISO date range from `<input type="date">` values.
fn parse_range(
    from: &str,
    to: &str,
    missing: &str,
    invalid: &str,
    redirect_to: &str,
) -> AppResult<DateRange> {
    if from.trim().is_empty() || to.trim().is_empty() {
        return Err(AppError::validation(missing, redirect_to));
    }
    let (Ok(from), Ok(to)) = (parse_iso_date(from), parse_iso_date(to)) else {
        return Err(AppError::validation(invalid, redirect_to));
    };
    DateRange::new(from, to)
        .ok_or_else(|| AppError::validation("Дата \"з\" не може бути пізніше дати \"по\"", redirect_to))
}

fn pdf_failed(jar: CookieJar, redirect_to: &str, err: reports::ReportError) -> Response {
    error!("PDF generation failed: {}", err);
    let jar = flash::push(jar, Level::Danger, "Помилка при генерації PDF");
    (jar, Redirect::to(redirect_to)).into_response()
}

/// Record export/print form. Filters mirror the dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordExportForm {
    /// `month` (default) or `range`
    pub export_mode: String,
    pub month_filter: String,
    pub from_date: String,
    pub to_date: String,
    pub discharge_status: String,
    pub treating_physician: String,
    pub discharge_department: String,
    pub history: String,
    pub full_name: String,
    pub has_death_date: String,
}

impl RecordExportForm {
    pub fn period(&self) -> AppResult<ExportPeriod> {
        if self.export_mode.trim() == "range" {
            let range = parse_range(
                &self.from_date,
                &self.to_date,
                "Будь ласка, вкажіть обидві дати для експорту",
                "Невірний формат дати",
                "/",
            )?;
            return Ok(ExportPeriod::Range(range));
        }
        if self.month_filter.trim().is_empty() {
            return Err(AppError::validation("Будь ласка, вкажіть місяць для експорту", "/"));
        }
        MonthPeriod::parse(&self.month_filter)
            .map(ExportPeriod::Month)
            .ok_or_else(|| AppError::validation("Невірний формат місяця (очікується YYYY-MM)", "/"))
    }

    pub fn filter(&self, range: DateRange) -> RecordFilter {
        RecordFilter {
            period: Some(range),
            discharge_status: non_empty(&self.discharge_status),
            treating_physician: non_empty(&self.treating_physician),
            discharge_department: non_empty(&self.discharge_department),
            history: non_empty(&self.history),
            full_name: non_empty(&self.full_name),
            has_death_date: is_truthy(Some(self.has_death_date.as_str())),
        }
    }
}

#[instrument(skip(state))]
pub async fn export_records(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<RecordExportForm>,
) -> AppResult<Response> {
    trace!("Entering export_records function");
    user.require(&EXPORT_ROLES)?;
    let period = form.period()?;
    let filter = form.filter(period.range());

    let records = record_reports::find_for_export(&state.db, &filter).await?;
    if records.is_empty() {
        return Err(AppError::validation("Записів не знайдено для експорту", "/"));
    }

    let columns = if user.role == Role::Viewer {
        ExportColumns::Restricted
    } else {
        ExportColumns::Full
    };
    let usernames = reports::usernames(&state.db).await?;
    let bytes = record_reports::export_sheet(&records, &usernames, columns).to_xlsx()?;
    let filename = period.export_filename();

    let scope = match period {
        ExportPeriod::Month(month) => format!("month={}", month.file_label()),
        ExportPeriod::Range(range) => format!("from={} to={}", range.from, range.to),
    };
    let details = format!(
        "{} status={} count={}",
        scope,
        form.discharge_status.trim(),
        records.len()
    );
    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("records.export").entity("export", None).details(details.clone()),
    )
    .await;
    info!("Records export by {}: {} ({:?})", user.username, details, columns);

    Ok(download(bytes, &filename, XLSX_CONTENT_TYPE))
}

#[instrument(skip(state, jar))]
pub async fn print_records(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<RecordExportForm>,
) -> AppResult<Response> {
    trace!("Entering print_records function");
    user.require(&EXPORT_ROLES)?;
    let range = parse_range(
        &form.from_date,
        &form.to_date,
        "Будь ласка, вкажіть обидві дати для друку",
        "Невірний формат дати",
        "/",
    )?;
    let records = record_reports::find_for_export(&state.db, &form.filter(range)).await?;
    if records.is_empty() {
        return Err(AppError::validation("Записів не знайдено для друку", "/"));
    }

    let table = record_reports::print_table(&records, range, &user.username, kyiv_now());
    let bytes = match table.render(&state.settings.pdf_fonts) {
        Ok(bytes) => bytes,
        Err(e) => return Ok(pdf_failed(jar, "/", e)),
    };

    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("records.print")
            .entity("print", None)
            .details(format!("from={} to={} count={}", range.from, range.to, records.len())),
    )
    .await;
    info!("Records print by {}: {} records", user.username, records.len());

    Ok(download(bytes, &record_reports::print_filename(kyiv_today()), PDF_CONTENT_TYPE))
}

/// NSZU export/print form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NszuExportForm {
    pub from_date: String,
    pub to_date: String,
    pub status: String,
    pub doctor: String,
    pub nszu_record_id: String,
}

impl NszuExportForm {
    pub fn filter(&self, range: DateRange) -> NszuFilter {
        NszuFilter {
            status: NszuStatus::from_label(&self.status),
            doctor: non_empty(&self.doctor),
            nszu_record_id: non_empty(&self.nszu_record_id),
            ..NszuFilter::new(range)
        }
    }
}

#[instrument(skip(state))]
pub async fn export_nszu(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<NszuExportForm>,
) -> AppResult<Response> {
    trace!("Entering export_nszu function");
    user.require(&EXPORT_ROLES)?;
    let range = parse_range(
        &form.from_date,
        &form.to_date,
        "Будь ласка, вкажіть обидві дати (з та по) для експорту",
        "Невірний формат дати для експорту",
        "/nszu",
    )?;
    let filter = form.filter(range);

    let corrections = nszu_reports::find_for_export(&state.db, &filter).await?;
    if corrections.is_empty() {
        return Err(AppError::validation(
            "Записів не знайдено для обраного діапазону дат",
            "/nszu",
        ));
    }

    let usernames = reports::usernames(&state.db).await?;
    let bytes = nszu_reports::export_sheet(&corrections, &usernames).to_xlsx()?;
    let filename = nszu_reports::export_filename(range, filter.status, kyiv_today());

    let details = format!(
        "from={} to={} status={} doctor={} count={}",
        range.from,
        range.to,
        filter.status.map(|s| s.label()).unwrap_or_default(),
        filter.doctor.as_deref().unwrap_or_default(),
        corrections.len()
    );
    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("nszu.export").entity("export", None).details(details.clone()),
    )
    .await;
    info!("NSZU export by {}: {}", user.username, details);

    Ok(download(bytes, &filename, XLSX_CONTENT_TYPE))
}

#[instrument(skip(state, jar))]
pub async fn print_nszu(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<NszuExportForm>,
) -> AppResult<Response> {
    trace!("Entering print_nszu function");
    user.require(&EXPORT_ROLES)?;
    let range = parse_range(
        &form.from_date,
        &form.to_date,
        "Будь ласка, вкажіть обидві дати для друку",
        "Невірний формат дати для друку",
        "/nszu",
    )?;
    let corrections = nszu_reports::find_for_export(&state.db, &form.filter(range)).await?;
    if corrections.is_empty() {
        return Err(AppError::validation(
            "Записів не знайдено для обраного діапазону дат",
            "/nszu",
        ));
    }

    let table = nszu_reports::print_table(&corrections, range, &user.username, kyiv_now());
    let bytes = match table.render(&state.settings.pdf_fonts) {
        Ok(bytes) => bytes,
        Err(e) => return Ok(pdf_failed(jar, "/nszu", e)),
    };

    audit::record(
        &state.db,
        Some(user.id),
        AuditEvent::new("nszu.print")
            .entity("print", None)
            .details(format!("from={} to={} count={}", range.from, range.to, corrections.len())),
    )
    .await;
    info!("NSZU print by {}: {} corrections", user.username, corrections.len());

    Ok(download(bytes, &nszu_reports::print_filename(kyiv_today()), PDF_CONTENT_TYPE))
}

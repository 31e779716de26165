//! Discharge record queries: dashboard filters, sorting, counters and the
//! export/print layouts.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use common::{DateRange, MonthPeriod, PageInfo, Pagination, format_date, format_datetime};
use model::entities::record::{self, status};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use tracing::{debug, instrument, trace};

use crate::error::Result;
use crate::excel::{Cell, Sheet};
use crate::pdf::PdfTable;

/// Filters accepted by the dashboard, the export and the print form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Inclusive discharge date range; `None` means all months.
    pub period: Option<DateRange>,
    pub discharge_status: Option<String>,
    pub treating_physician: Option<String>,
    pub discharge_department: Option<String>,
    /// Substring of the case history number.
    pub history: Option<String>,
    /// Substring of the patient name.
    pub full_name: Option<String>,
    pub has_death_date: bool,
}

impl RecordFilter {
    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(range) = self.period {
            condition = condition
                .add(record::Column::DateOfDischarge.gte(range.from))
                .add(record::Column::DateOfDischarge.lte(range.to));
        }
        if let Some(value) = &self.discharge_status {
            condition = condition.add(record::Column::DischargeStatus.eq(value.as_str()));
        }
        if let Some(value) = &self.treating_physician {
            condition = condition.add(record::Column::TreatingPhysician.eq(value.as_str()));
        }
        if let Some(value) = &self.discharge_department {
            condition = condition.add(record::Column::DischargeDepartment.eq(value.as_str()));
        }
        if let Some(value) = &self.history {
            condition = condition.add(record::Column::History.contains(value.as_str()));
        }
        if let Some(value) = &self.full_name {
            condition = condition.add(record::Column::FullName.contains(value.as_str()));
        }
        if self.has_death_date {
            condition = condition.add(record::Column::DateOfDeath.is_not_null());
        }
        condition
    }
}

/// Columns the dashboard can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSortColumn {
    Id,
    DateOfDischarge,
    FullName,
    DischargeDepartment,
    TreatingPhysician,
    History,
    KDays,
    DischargeStatus,
    DateOfDeath,
    CreatedAt,
    UpdatedAt,
}

impl RecordSortColumn {
    pub fn parse(value: &str) -> Option<Self> {
        let column = match value.trim() {
            "id" => Self::Id,
            "date_of_discharge" => Self::DateOfDischarge,
            "full_name" => Self::FullName,
            "discharge_department" => Self::DischargeDepartment,
            "treating_physician" => Self::TreatingPhysician,
            "history" => Self::History,
            "k_days" => Self::KDays,
            "discharge_status" => Self::DischargeStatus,
            "date_of_death" => Self::DateOfDeath,
            "created_at" => Self::CreatedAt,
            "updated_at" => Self::UpdatedAt,
            _ => return None,
        };
        Some(column)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::DateOfDischarge => "date_of_discharge",
            Self::FullName => "full_name",
            Self::DischargeDepartment => "discharge_department",
            Self::TreatingPhysician => "treating_physician",
            Self::History => "history",
            Self::KDays => "k_days",
            Self::DischargeStatus => "discharge_status",
            Self::DateOfDeath => "date_of_death",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    fn column(&self) -> record::Column {
        match self {
            Self::Id => record::Column::Id,
            Self::DateOfDischarge => record::Column::DateOfDischarge,
            Self::FullName => record::Column::FullName,
            Self::DischargeDepartment => record::Column::DischargeDepartment,
            Self::TreatingPhysician => record::Column::TreatingPhysician,
            Self::History => record::Column::History,
            Self::KDays => record::Column::KDays,
            Self::DischargeStatus => record::Column::DischargeStatus,
            Self::DateOfDeath => record::Column::DateOfDeath,
            Self::CreatedAt => record::Column::CreatedAt,
            Self::UpdatedAt => record::Column::UpdatedAt,
        }
    }

    /// Text columns are compared case-insensitively.
    fn is_text(&self) -> bool {
        matches!(
            self,
            Self::FullName
                | Self::DischargeDepartment
                | Self::TreatingPhysician
                | Self::History
                | Self::DischargeStatus
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordSort {
    /// `None` keeps the default ordering: newest discharge first.
    pub column: Option<RecordSortColumn>,
    pub descending: bool,
}

impl RecordSort {
    /// Unknown columns fall back to the default ordering; anything but
    /// `asc` sorts descending.
    pub fn parse(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        Self {
            column: sort_by.and_then(RecordSortColumn::parse),
            descending: !matches!(sort_order.map(str::trim), Some("asc")),
        }
    }

    pub fn order(&self) -> Order {
        if self.descending { Order::Desc } else { Order::Asc }
    }

    pub fn apply(&self, select: Select<record::Entity>) -> Select<record::Entity> {
        match self.column {
            None => select
                .order_by_desc(record::Column::DateOfDischarge)
                .order_by_desc(record::Column::CreatedAt),
            Some(column) if column.is_text() => {
                let lowered: SimpleExpr = Func::lower(Expr::col(column.column())).into();
                select
                    .order_by(lowered, self.order())
                    .order_by_desc(record::Column::Id)
            }
            Some(column) => select
                .order_by(column.column(), self.order())
                .order_by_desc(record::Column::Id),
        }
    }
}

/// Dashboard counters over the filtered set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub total: u64,
    /// Records with a date of death.
    pub deceased: u64,
    /// The following three only count records without a date of death.
    pub discharged: u64,
    pub processing: u64,
    pub violations: u64,
}

#[derive(Debug, FromQueryResult)]
struct StatusCount {
    discharge_status: Option<String>,
    count: i64,
}

#[instrument(skip(db))]
pub async fn counts(db: &DatabaseConnection, filter: &RecordFilter) -> Result<RecordCounts> {
    let condition = filter.condition();

    let total = record::Entity::find()
        .filter(condition.clone())
        .count(db)
        .await?;
    let deceased = record::Entity::find()
        .filter(condition.clone())
        .filter(record::Column::DateOfDeath.is_not_null())
        .count(db)
        .await?;

    let per_status = record::Entity::find()
        .select_only()
        .column(record::Column::DischargeStatus)
        .column_as(Expr::col(record::Column::Id).count(), "count")
        .filter(condition)
        .filter(record::Column::DateOfDeath.is_null())
        .group_by(record::Column::DischargeStatus)
        .into_model::<StatusCount>()
        .all(db)
        .await?;

    let mut counts = RecordCounts {
        total,
        deceased,
        ..Default::default()
    };
    for row in per_status {
        let count = row.count.max(0) as u64;
        match row.discharge_status.as_deref() {
            Some(status::DISCHARGED) => counts.discharged += count,
            Some(status::PROCESSING) => counts.processing += count,
            Some(status::VIOLATIONS) => counts.violations += count,
            _ => {}
        }
    }
    debug!("Record counts: {:?}", counts);
    Ok(counts)
}

/// One page of filtered, sorted records.
#[instrument(skip(db))]
pub async fn page(
    db: &DatabaseConnection,
    filter: &RecordFilter,
    sort: RecordSort,
    pagination: Pagination,
) -> Result<(Vec<record::Model>, PageInfo)> {
    let select = sort.apply(record::Entity::find().filter(filter.condition()));
    let paginator = select.paginate(db, pagination.per_page);
    let total_items = paginator.num_items().await?;
    let records = paginator.fetch_page(pagination.page_index()).await?;
    trace!("Fetched {} of {} records", records.len(), total_items);
    Ok((records, pagination.info(total_items)))
}

/// Values offered in the dashboard filter dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDropdowns {
    pub statuses: Vec<String>,
    pub physicians: Vec<String>,
    pub departments: Vec<String>,
}

async fn distinct_values(db: &DatabaseConnection, column: record::Column) -> Result<Vec<String>> {
    let values = record::Entity::find()
        .select_only()
        .column(column)
        .distinct()
        .filter(column.is_not_null())
        .filter(column.ne(""))
        .order_by_asc(column)
        .into_tuple::<String>()
        .all(db)
        .await?;
    Ok(values)
}

#[instrument(skip(db))]
pub async fn dropdowns(db: &DatabaseConnection) -> Result<RecordDropdowns> {
    let mut statuses = distinct_values(db, record::Column::DischargeStatus).await?;
    statuses.extend(status::ALL.iter().map(|s| s.to_string()));
    statuses.sort();
    statuses.dedup();

    Ok(RecordDropdowns {
        statuses,
        physicians: distinct_values(db, record::Column::TreatingPhysician).await?,
        departments: distinct_values(db, record::Column::DischargeDepartment).await?,
    })
}

/// All matching records, newest discharge first.
#[instrument(skip(db))]
pub async fn find_for_export(db: &DatabaseConnection, filter: &RecordFilter) -> Result<Vec<record::Model>> {
    let records = record::Entity::find()
        .filter(filter.condition())
        .filter(record::Column::DateOfDischarge.is_not_null())
        .order_by_desc(record::Column::DateOfDischarge)
        .order_by_desc(record::Column::Id)
        .all(db)
        .await?;
    Ok(records)
}

/// Period selected on the export form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPeriod {
    Month(MonthPeriod),
    Range(DateRange),
}

impl ExportPeriod {
    pub fn range(&self) -> DateRange {
        match self {
            ExportPeriod::Month(month) => month.range(),
            ExportPeriod::Range(range) => *range,
        }
    }

    pub fn export_filename(&self) -> String {
        match self {
            ExportPeriod::Month(month) => format!("vipiski_export_{}.xlsx", month.file_label()),
            ExportPeriod::Range(range) => format!("vipiski_export_{}.xlsx", range.file_label()),
        }
    }
}

/// Which columns an export contains. Viewers get the restricted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportColumns {
    Restricted,
    Full,
}

pub const RESTRICTED_HEADERS: [&str; 8] = [
    "ID",
    "Дата виписки",
    "ПІБ",
    "Відділення",
    "Лікар",
    "Історія хвороби",
    "К днів",
    "Статус виписки",
];

pub const FULL_HEADERS: [&str; 14] = [
    "ID",
    "Дата виписки",
    "ПІБ",
    "Відділення",
    "Лікар",
    "Історія хвороби",
    "К днів",
    "Статус виписки",
    "Дата смерті",
    "Коментар",
    "Створено",
    "Оновлено",
    "Автор",
    "Редактор",
];

fn date_cell(value: Option<NaiveDate>) -> Cell {
    value.map(|d| Cell::Text(format_date(d))).unwrap_or(Cell::Empty)
}

fn datetime_cell(value: NaiveDateTime) -> Cell {
    Cell::Text(format_datetime(value))
}

fn username_cell(usernames: &HashMap<i32, String>, id: Option<i32>) -> Cell {
    Cell::optional_text(id.and_then(|id| usernames.get(&id)).map(String::as_str))
}

pub fn export_sheet(
    records: &[record::Model],
    usernames: &HashMap<i32, String>,
    columns: ExportColumns,
) -> Sheet {
    let headers: &[&str] = match columns {
        ExportColumns::Restricted => &RESTRICTED_HEADERS,
        ExportColumns::Full => &FULL_HEADERS,
    };
    let mut sheet = Sheet::new("Записи", headers);

    for r in records {
        let mut row = vec![
            Cell::Integer(r.id as i64),
            date_cell(r.date_of_discharge),
            Cell::text(r.full_name.as_str()),
            Cell::optional_text(r.discharge_department.as_deref()),
            Cell::optional_text(r.treating_physician.as_deref()),
            Cell::optional_text(r.history.as_deref()),
            r.k_days.map(|k| Cell::Integer(k as i64)).unwrap_or(Cell::Empty),
            Cell::optional_text(r.discharge_status.as_deref()),
        ];
        if columns == ExportColumns::Full {
            row.extend([
                date_cell(r.date_of_death),
                Cell::optional_text(r.comment.as_deref()),
                datetime_cell(r.created_at),
                datetime_cell(r.updated_at),
                username_cell(usernames, r.created_by),
                username_cell(usernames, r.updated_by),
            ]);
        }
        sheet.push_row(row);
    }
    sheet
}

pub fn print_filename(today: NaiveDate) -> String {
    format!("vipiski_print_{}.pdf", today.format("%d-%m-%Y"))
}

pub fn print_table(
    records: &[record::Model],
    range: DateRange,
    generated_by: &str,
    generated_at: NaiveDateTime,
) -> PdfTable {
    let rows = records
        .iter()
        .enumerate()
        .map(|(index, r)| {
            vec![
                (index + 1).to_string(),
                r.date_of_discharge.map(format_date).unwrap_or_default(),
                r.full_name.clone(),
                r.discharge_department.clone().unwrap_or_default(),
                r.treating_physician.clone().unwrap_or_default(),
                r.history.clone().unwrap_or_default(),
                r.k_days.map(|k| k.to_string()).unwrap_or_default(),
                r.discharge_status.clone().unwrap_or_default(),
                r.date_of_death.map(format_date).unwrap_or_default(),
            ]
        })
        .collect();

    PdfTable {
        title: "Виписки".to_string(),
        subtitle: vec![
            format!("Період: з {} по {}", format_date(range.from), format_date(range.to)),
            format!("Записів: {}", records.len()),
            format!("Сформував: {}, {}", generated_by, format_datetime(generated_at)),
        ],
        headers: [
            "№", "Дата виписки", "ПІБ", "Відділення", "Лікар", "Історія", "К днів", "Статус",
            "Дата смерті",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect(),
        weights: vec![1, 3, 6, 4, 4, 3, 2, 4, 3],
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    async fn seed(db: &DatabaseConnection) {
        insert_record(db, "Коваленко Анна", date(2025, 3, 3), "Хірургічне", "Петренко", status::DISCHARGED, None).await;
        insert_record(db, "Бондар Олег", date(2025, 3, 10), "Терапевтичне", "Іваненко", status::PROCESSING, None).await;
        insert_record(db, "Ткаченко Ірина", date(2025, 3, 20), "Хірургічне", "Петренко", status::VIOLATIONS, None).await;
        insert_record(db, "Мельник Петро", date(2025, 3, 25), "Хірургічне", "Петренко", status::DISCHARGED, Some(date(2025, 3, 26))).await;
        insert_record(db, "Кравець Ольга", date(2025, 2, 14), "Терапевтичне", "Іваненко", status::DISCHARGED, None).await;
    }

    fn march() -> RecordFilter {
        RecordFilter {
            period: Some(MonthPeriod::new(2025, 3).unwrap().range()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_counts_split_deceased_from_statuses() {
        let db = setup_db().await;
        seed(&db).await;

        let counts = counts(&db, &march()).await.unwrap();
        assert_eq!(
            counts,
            RecordCounts {
                total: 4,
                deceased: 1,
                discharged: 1,
                processing: 1,
                violations: 1,
            }
        );

        let all = counts_for_all(&db).await;
        assert_eq!(all.total, 5);
        assert_eq!(all.discharged, 2);
    }

    async fn counts_for_all(db: &DatabaseConnection) -> RecordCounts {
        counts(db, &RecordFilter::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_filters_combine() {
        let db = setup_db().await;
        seed(&db).await;

        let filter = RecordFilter {
            treating_physician: Some("Петренко".to_string()),
            discharge_department: Some("Хірургічне".to_string()),
            ..march()
        };
        let (records, info) = page(&db, &filter, RecordSort::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(info.total_items, 3);
        assert_eq!(records.len(), 3);

        let deceased_only = RecordFilter {
            has_death_date: true,
            ..march()
        };
        let (records, _) = page(&db, &deceased_only, RecordSort::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].full_name, "Мельник Петро");

        let by_name = RecordFilter {
            full_name: Some("Бондар".to_string()),
            ..Default::default()
        };
        let (records, _) = page(&db, &by_name, RecordSort::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_default_sort_is_newest_first() {
        let db = setup_db().await;
        seed(&db).await;

        let (records, _) = page(&db, &march(), RecordSort::default(), Pagination::default())
            .await
            .unwrap();
        let dates: Vec<_> = records.iter().map(|r| r.date_of_discharge.unwrap()).collect();
        assert_eq!(
            dates,
            vec![date(2025, 3, 25), date(2025, 3, 20), date(2025, 3, 10), date(2025, 3, 3)]
        );
    }

    #[tokio::test]
    async fn test_sort_by_id_ascending_and_pagination() {
        let db = setup_db().await;
        seed(&db).await;

        let sort = RecordSort::parse(Some("id"), Some("asc"));
        let pagination = Pagination { page: 2, per_page: 2 };
        let (records, info) = page(&db, &RecordFilter::default(), sort, pagination)
            .await
            .unwrap();
        assert_eq!(info.pages, 3);
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_sort_parsing() {
        let sort = RecordSort::parse(Some("full_name"), None);
        assert_eq!(sort.column, Some(RecordSortColumn::FullName));
        assert!(sort.descending);

        let sort = RecordSort::parse(Some("password_hash"), Some("asc"));
        assert_eq!(sort.column, None);
        assert!(!sort.descending);
    }

    #[tokio::test]
    async fn test_dropdowns_include_known_statuses() {
        let db = setup_db().await;
        seed(&db).await;

        let dropdowns = dropdowns(&db).await.unwrap();
        assert_eq!(dropdowns.physicians, vec!["Іваненко".to_string(), "Петренко".to_string()]);
        assert_eq!(dropdowns.departments.len(), 2);
        for known in status::ALL {
            assert!(dropdowns.statuses.iter().any(|s| s == known));
        }
    }

    #[tokio::test]
    async fn test_export_sheet_columns() {
        let db = setup_db().await;
        seed(&db).await;
        let author = insert_user(&db, "author").await;

        let mut records = find_for_export(&db, &march()).await.unwrap();
        assert_eq!(records.len(), 4);
        records[0].created_by = Some(author.id);

        let usernames = HashMap::from([(author.id, author.username.clone())]);

        let restricted = export_sheet(&records, &usernames, ExportColumns::Restricted);
        assert_eq!(restricted.headers.len(), 8);
        assert!(restricted.rows.iter().all(|row| row.len() == 8));

        let full = export_sheet(&records, &usernames, ExportColumns::Full);
        assert_eq!(full.headers.len(), 14);
        assert_eq!(full.rows[0][12], Cell::text("author"));
        assert_eq!(full.rows[0][8], Cell::text("26.03.2025"));
        assert_eq!(full.rows[1][12], Cell::Empty);
    }

    #[test]
    fn test_export_filenames() {
        let month = ExportPeriod::Month(MonthPeriod::new(2025, 3).unwrap());
        assert_eq!(month.export_filename(), "vipiski_export_03-2025.xlsx");

        let range = ExportPeriod::Range(DateRange::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap());
        assert_eq!(range.export_filename(), "vipiski_export_01-01-2025_31-01-2025.xlsx");
        assert_eq!(print_filename(date(2025, 4, 2)), "vipiski_print_02-04-2025.pdf");
    }
}

//! NSZU correction queries, per-status totals and export layouts.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use common::{DateRange, PageInfo, Pagination, format_date, format_datetime};
use model::entities::nszu_correction::{self, NszuStatus};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, Iterable, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select,
};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::excel::{Cell, Sheet};
use crate::pdf::PdfTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NszuFilter {
    pub range: DateRange,
    pub status: Option<NszuStatus>,
    pub doctor: Option<String>,
    /// Substring of the NSZU record id.
    pub nszu_record_id: Option<String>,
}

impl NszuFilter {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            status: None,
            doctor: None,
            nszu_record_id: None,
        }
    }

    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all()
            .add(nszu_correction::Column::Date.gte(self.range.from))
            .add(nszu_correction::Column::Date.lte(self.range.to));
        if let Some(status) = self.status {
            condition = condition.add(nszu_correction::Column::Status.eq(status));
        }
        if let Some(doctor) = &self.doctor {
            condition = condition.add(nszu_correction::Column::Doctor.eq(doctor.as_str()));
        }
        if let Some(id) = &self.nszu_record_id {
            condition = condition.add(nszu_correction::Column::NszuRecordId.contains(id.as_str()));
        }
        condition
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NszuSortColumn {
    Id,
    Date,
    NszuRecordId,
    Doctor,
    Status,
    FaktSumm,
}

impl NszuSortColumn {
    pub fn parse(value: &str) -> Option<Self> {
        let column = match value.trim() {
            "id" => Self::Id,
            "date" => Self::Date,
            "nszu_record_id" => Self::NszuRecordId,
            "doctor" => Self::Doctor,
            "status" => Self::Status,
            "fakt_summ" => Self::FaktSumm,
            _ => return None,
        };
        Some(column)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Date => "date",
            Self::NszuRecordId => "nszu_record_id",
            Self::Doctor => "doctor",
            Self::Status => "status",
            Self::FaktSumm => "fakt_summ",
        }
    }

    fn column(&self) -> nszu_correction::Column {
        match self {
            Self::Id => nszu_correction::Column::Id,
            Self::Date => nszu_correction::Column::Date,
            Self::NszuRecordId => nszu_correction::Column::NszuRecordId,
            Self::Doctor => nszu_correction::Column::Doctor,
            Self::Status => nszu_correction::Column::Status,
            Self::FaktSumm => nszu_correction::Column::FaktSumm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NszuSort {
    pub column: NszuSortColumn,
    pub descending: bool,
}

impl Default for NszuSort {
    fn default() -> Self {
        Self {
            column: NszuSortColumn::Date,
            descending: true,
        }
    }
}

impl NszuSort {
    pub fn parse(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        Self {
            column: sort_by.and_then(NszuSortColumn::parse).unwrap_or(NszuSortColumn::Date),
            descending: !matches!(sort_order.map(str::trim), Some("asc")),
        }
    }

    pub fn apply(&self, select: Select<nszu_correction::Entity>) -> Select<nszu_correction::Entity> {
        let order = if self.descending { Order::Desc } else { Order::Asc };
        select
            .order_by(self.column.column(), order)
            .order_by_desc(nszu_correction::Column::CreatedAt)
    }
}

#[instrument(skip(db))]
pub async fn page(
    db: &DatabaseConnection,
    filter: &NszuFilter,
    sort: NszuSort,
    pagination: Pagination,
) -> Result<(Vec<nszu_correction::Model>, PageInfo)> {
    let paginator = sort
        .apply(nszu_correction::Entity::find().filter(filter.condition()))
        .paginate(db, pagination.per_page);
    let total_items = paginator.num_items().await?;
    let corrections = paginator.fetch_page(pagination.page_index()).await?;
    Ok((corrections, pagination.info(total_items)))
}

/// Count and paid amount for one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTotal {
    pub status: NszuStatus,
    pub count: u64,
    pub sum: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NszuSummary {
    /// Every status, in declaration order, including empty ones.
    pub per_status: Vec<StatusTotal>,
    pub total_count: u64,
    pub total_sum: Decimal,
}

impl NszuSummary {
    pub fn from_corrections<'a>(corrections: impl IntoIterator<Item = &'a nszu_correction::Model>) -> Self {
        let mut per_status: Vec<StatusTotal> = NszuStatus::iter()
            .map(|status| StatusTotal {
                status,
                count: 0,
                sum: Decimal::ZERO,
            })
            .collect();
        let mut total_count = 0;
        let mut total_sum = Decimal::ZERO;

        for correction in corrections {
            if let Some(total) = per_status.iter_mut().find(|t| t.status == correction.status) {
                total.count += 1;
                total.sum += correction.fakt_summ;
            }
            total_count += 1;
            total_sum += correction.fakt_summ;
        }

        Self {
            per_status,
            total_count,
            total_sum,
        }
    }

    pub fn for_status(&self, status: NszuStatus) -> Option<&StatusTotal> {
        self.per_status.iter().find(|t| t.status == status)
    }
}

/// Totals over the whole filtered set, not just the current page.
#[instrument(skip(db))]
pub async fn summary(db: &DatabaseConnection, filter: &NszuFilter) -> Result<NszuSummary> {
    let corrections = nszu_correction::Entity::find()
        .filter(filter.condition())
        .all(db)
        .await?;
    let summary = NszuSummary::from_corrections(&corrections);
    debug!(
        "NSZU summary: {} corrections, total {}",
        summary.total_count, summary.total_sum
    );
    Ok(summary)
}

/// Distinct doctors for the filter dropdown.
pub async fn doctors(db: &DatabaseConnection) -> Result<Vec<String>> {
    let doctors = nszu_correction::Entity::find()
        .select_only()
        .column(nszu_correction::Column::Doctor)
        .distinct()
        .filter(nszu_correction::Column::Doctor.ne(""))
        .order_by_asc(nszu_correction::Column::Doctor)
        .into_tuple::<String>()
        .all(db)
        .await?;
    Ok(doctors)
}

#[instrument(skip(db))]
pub async fn find_for_export(
    db: &DatabaseConnection,
    filter: &NszuFilter,
) -> Result<Vec<nszu_correction::Model>> {
    let corrections = nszu_correction::Entity::find()
        .filter(filter.condition())
        .order_by_desc(nszu_correction::Column::Date)
        .order_by_desc(nszu_correction::Column::Id)
        .all(db)
        .await?;
    Ok(corrections)
}

pub const EXPORT_HEADERS: [&str; 12] = [
    "ID",
    "Дата",
    "НСЗУ ID",
    "Лікар",
    "Статус",
    "Деталі",
    "Факт. сума",
    "Коментар",
    "Створив",
    "Створено",
    "Оновив",
    "Оновлено",
];

pub fn export_sheet(corrections: &[nszu_correction::Model], usernames: &HashMap<i32, String>) -> Sheet {
    let username = |id: Option<i32>| {
        Cell::optional_text(id.and_then(|id| usernames.get(&id)).map(String::as_str))
    };

    let mut sheet = Sheet::new("NSZU", &EXPORT_HEADERS);
    for c in corrections {
        sheet.push_row(vec![
            Cell::Integer(c.id as i64),
            Cell::Text(format_date(c.date)),
            Cell::text(c.nszu_record_id.as_str()),
            Cell::text(c.doctor.as_str()),
            Cell::text(c.status.label()),
            Cell::optional_text(c.detail.as_deref()),
            Cell::Amount(c.fakt_summ),
            Cell::optional_text(c.comment.as_deref()),
            username(c.created_by),
            Cell::Text(format_datetime(c.created_at)),
            username(c.updated_by),
            Cell::Text(format_datetime(c.updated_at)),
        ]);
    }
    sheet
}

/// `nszu_YYYY-MM[_status]_DD-MM-YYYY.xlsx`, the month taken from the range start.
pub fn export_filename(range: DateRange, status: Option<NszuStatus>, today: NaiveDate) -> String {
    let mut parts = vec!["nszu".to_string(), range.from.format("%Y-%m").to_string()];
    if let Some(status) = status {
        parts.push(status.label().replace(' ', "-"));
    }
    parts.push(today.format("%d-%m-%Y").to_string());
    format!("{}.xlsx", parts.join("_"))
}

pub fn print_filename(today: NaiveDate) -> String {
    format!("nszu_print_{}.pdf", today.format("%d-%m-%Y"))
}

pub fn print_table(
    corrections: &[nszu_correction::Model],
    range: DateRange,
    generated_by: &str,
    generated_at: NaiveDateTime,
) -> PdfTable {
    let summary = NszuSummary::from_corrections(corrections);
    let rows = corrections
        .iter()
        .enumerate()
        .map(|(index, c)| {
            vec![
                (index + 1).to_string(),
                format_date(c.date),
                c.nszu_record_id.clone(),
                c.doctor.clone(),
                c.status.label().to_string(),
                c.detail.clone().unwrap_or_default(),
                format!("{:.2}", c.fakt_summ),
                c.comment.clone().unwrap_or_default(),
            ]
        })
        .collect();

    PdfTable {
        title: "Перевірки НСЗУ".to_string(),
        subtitle: vec![
            format!("Період: з {} по {}", format_date(range.from), format_date(range.to)),
            format!(
                "Записів: {}, загальна сума: {:.2}",
                summary.total_count, summary.total_sum
            ),
            format!("Сформував: {}, {}", generated_by, format_datetime(generated_at)),
        ],
        headers: ["№", "Дата", "НСЗУ ID", "Лікар", "Статус", "Деталі", "Факт. сума", "Коментар"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        weights: vec![1, 2, 3, 4, 3, 5, 2, 4],
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use common::MonthPeriod;

    fn march() -> NszuFilter {
        NszuFilter::new(MonthPeriod::new(2025, 3).unwrap().range())
    }

    async fn seed(db: &DatabaseConnection) {
        insert_correction(db, date(2025, 3, 1), "A-100", "Петренко", NszuStatus::Paid, Decimal::new(10050, 2)).await;
        insert_correction(db, date(2025, 3, 5), "A-101", "Петренко", NszuStatus::Paid, Decimal::new(2000, 2)).await;
        insert_correction(db, date(2025, 3, 9), "B-200", "Іваненко", NszuStatus::InProgress, Decimal::ZERO).await;
        insert_correction(db, date(2025, 4, 1), "A-102", "Петренко", NszuStatus::Paid, Decimal::new(5000, 2)).await;
    }

    #[tokio::test]
    async fn test_summary_per_status() {
        let db = setup_db().await;
        seed(&db).await;

        let summary = summary(&db, &march()).await.unwrap();
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.total_sum, Decimal::new(12050, 2));

        let paid = summary.for_status(NszuStatus::Paid).unwrap();
        assert_eq!(paid.count, 2);
        assert_eq!(paid.sum, Decimal::new(12050, 2));

        let not_payable = summary.for_status(NszuStatus::NotPayable).unwrap();
        assert_eq!(not_payable.count, 0);
        assert_eq!(summary.per_status.len(), 4);
    }

    #[tokio::test]
    async fn test_filters_and_sorting() {
        let db = setup_db().await;
        seed(&db).await;

        let filter = NszuFilter {
            nszu_record_id: Some("A-".to_string()),
            ..march()
        };
        let sort = NszuSort::parse(Some("nszu_record_id"), Some("desc"));
        let (rows, info) = page(&db, &filter, sort, Pagination::default()).await.unwrap();
        assert_eq!(info.total_items, 2);
        assert_eq!(rows[0].nszu_record_id, "A-101");
        assert_eq!(rows[1].nszu_record_id, "A-100");

        let filter = NszuFilter {
            status: Some(NszuStatus::InProgress),
            ..march()
        };
        let (rows, _) = page(&db, &filter, NszuSort::default(), Pagination::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].doctor, "Іваненко");
    }

    #[tokio::test]
    async fn test_export_sheet() {
        let db = setup_db().await;
        seed(&db).await;

        let corrections = find_for_export(&db, &march()).await.unwrap();
        let sheet = export_sheet(&corrections, &HashMap::new());
        assert_eq!(sheet.name, "NSZU");
        assert_eq!(sheet.headers.len(), 12);
        assert_eq!(sheet.rows[0][1], Cell::text("09.03.2025"));
        assert_eq!(sheet.rows[2][6], Cell::Amount(Decimal::new(10050, 2)));

        let doctors = doctors(&db).await.unwrap();
        assert_eq!(doctors, vec!["Іваненко".to_string(), "Петренко".to_string()]);
    }

    #[test]
    fn test_export_filename() {
        let range = MonthPeriod::new(2025, 3).unwrap().range();
        assert_eq!(
            export_filename(range, None, date(2025, 4, 2)),
            "nszu_2025-03_02-04-2025.xlsx"
        );
        assert_eq!(
            export_filename(range, Some(NszuStatus::NotPayable), date(2025, 4, 2)),
            "nszu_2025-03_Не-підлягає-оплаті_02-04-2025.xlsx"
        );
        assert_eq!(print_filename(date(2025, 4, 2)), "nszu_print_02-04-2025.pdf");
    }
}

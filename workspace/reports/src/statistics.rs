//! Aggregations for the statistics page, computed with `GROUP BY`.

use common::DateRange;
use model::entities::record;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QuerySelect,
};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::nszu::{self, NszuFilter, NszuSummary};

/// Label used for records where the grouped column is empty.
pub const UNSPECIFIED: &str = "Не вказано";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodStatistics {
    pub range: DateRange,
    pub total: u64,
    pub deceased: u64,
    pub by_status: Vec<NamedCount>,
    pub by_department: Vec<NamedCount>,
    pub by_physician: Vec<NamedCount>,
    /// `YYYY-MM` buckets in calendar order.
    pub by_month: Vec<NamedCount>,
    pub average_k_days: Option<f64>,
    pub nszu: NszuSummary,
}

#[derive(Debug, FromQueryResult)]
struct GroupRow {
    name: Option<String>,
    count: i64,
}

fn period_condition(range: DateRange) -> Condition {
    Condition::all()
        .add(record::Column::DateOfDischarge.gte(range.from))
        .add(record::Column::DateOfDischarge.lte(range.to))
}

fn into_named(rows: Vec<GroupRow>) -> Vec<NamedCount> {
    let mut counts: Vec<NamedCount> = rows
        .into_iter()
        .map(|row| NamedCount {
            name: row
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNSPECIFIED.to_string()),
            count: row.count.max(0) as u64,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    counts
}

async fn count_by(db: &DatabaseConnection, range: DateRange, column: record::Column) -> Result<Vec<NamedCount>> {
    let rows = record::Entity::find()
        .select_only()
        .column_as(column, "name")
        .column_as(Expr::col(record::Column::Id).count(), "count")
        .filter(period_condition(range))
        .group_by(column)
        .into_model::<GroupRow>()
        .all(db)
        .await?;
    Ok(into_named(rows))
}

async fn count_by_month(db: &DatabaseConnection, range: DateRange) -> Result<Vec<NamedCount>> {
    let month = Expr::cust("strftime('%Y-%m', date_of_discharge)");
    let rows = record::Entity::find()
        .select_only()
        .column_as(month.clone(), "name")
        .column_as(Expr::col(record::Column::Id).count(), "count")
        .filter(period_condition(range))
        .group_by(month)
        .into_model::<GroupRow>()
        .all(db)
        .await?;
    let mut months = into_named(rows);
    months.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(months)
}

#[instrument(skip(db))]
pub async fn period_statistics(db: &DatabaseConnection, range: DateRange) -> Result<PeriodStatistics> {
    let total = record::Entity::find()
        .filter(period_condition(range))
        .count(db)
        .await?;
    let deceased = record::Entity::find()
        .filter(period_condition(range))
        .filter(record::Column::DateOfDeath.is_not_null())
        .count(db)
        .await?;

    let average_k_days = record::Entity::find()
        .select_only()
        .column_as(SimpleExpr::from(Func::avg(Expr::col(record::Column::KDays))), "avg")
        .filter(period_condition(range))
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?
        .flatten();

    let statistics = PeriodStatistics {
        range,
        total,
        deceased,
        by_status: count_by(db, range, record::Column::DischargeStatus).await?,
        by_department: count_by(db, range, record::Column::DischargeDepartment).await?,
        by_physician: count_by(db, range, record::Column::TreatingPhysician).await?,
        by_month: count_by_month(db, range).await?,
        average_k_days,
        nszu: nszu::summary(db, &NszuFilter::new(range)).await?,
    };
    debug!(
        "Statistics for {:?}: {} records, {} deceased",
        range, statistics.total, statistics.deceased
    );
    Ok(statistics)
}

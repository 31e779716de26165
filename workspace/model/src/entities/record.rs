use sea_orm::entity::prelude::*;

/// Discharge statuses used by the dashboard counters.
pub mod status {
    /// Assigned to every new record.
    pub const PROCESSING: &str = "Опрацьовується";
    pub const DISCHARGED: &str = "Виписаний";
    pub const VIOLATIONS: &str = "Порушені вимоги";

    pub const ALL: &[&str] = &[PROCESSING, DISCHARGED, VIOLATIONS];
}

/// A discharge record ("виписка").
///
/// `discharge_department` stores the department name rather than a key so
/// that renaming or deleting a department never rewrites history.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub date_of_discharge: Option<Date>,
    pub full_name: String,
    pub discharge_department: Option<String>,
    pub treating_physician: Option<String>,
    pub history: Option<String>,
    /// Bed-days ("К днів").
    pub k_days: Option<i32>,
    pub discharge_status: Option<String>,
    pub date_of_death: Option<Date>,
    pub comment: Option<String>,
    pub created_by: Option<i32>,
    pub created_at: DateTime,
    pub updated_by: Option<i32>,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Creator,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UpdatedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Updater,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_deceased(&self) -> bool {
        self.date_of_death.is_some()
    }
}

use std::fmt;

use sea_orm::Iterable;
use sea_orm::entity::prelude::*;

/// Processing state of an NSZU correction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(40))")]
pub enum NszuStatus {
    #[default]
    #[sea_orm(string_value = "В обробці")]
    InProgress,
    #[sea_orm(string_value = "Опрацьовано")]
    Processed,
    #[sea_orm(string_value = "Оплачено")]
    Paid,
    #[sea_orm(string_value = "Не підлягає оплаті")]
    NotPayable,
}

impl NszuStatus {
    pub fn label(&self) -> &'static str {
        match self {
            NszuStatus::InProgress => "В обробці",
            NszuStatus::Processed => "Опрацьовано",
            NszuStatus::Paid => "Оплачено",
            NszuStatus::NotPayable => "Не підлягає оплаті",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::iter().find(|status| status.label() == label)
    }
}

impl fmt::Display for NszuStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A correction received from NSZU for a treated case.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "nszu_corrections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub date: Date,
    pub nszu_record_id: String,
    pub doctor: String,
    pub status: NszuStatus,
    pub detail: Option<String>,
    /// Actually paid amount.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub fakt_summ: Decimal,
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

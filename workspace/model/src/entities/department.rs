use sea_orm::entity::prelude::*;

/// Hospital department a record can be discharged from.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "departments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Departments seeded by `seed-departments`.
pub const DEFAULT_DEPARTMENTS: &[&str] = &[
    "Гінекологічне",
    "Реанімаційне",
    "Кардіологічне",
    "Хірургічне",
    "Терапевтичне",
    "Травматологічне",
    "Отоларингологічне",
    "Педіатричне",
    "Паліативне",
    "Гастроентерологічне",
    "Ендокринологічне",
    "Урологічне",
    "Реабілітаційне",
    "Нейрохірургічне",
    "Неврологічне",
    "Нефрологічне",
    "НЕМД",
];

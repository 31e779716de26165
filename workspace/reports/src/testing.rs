//! Database fixtures shared by the query tests.

use chrono::{NaiveDate, NaiveDateTime};
use migration::{Migrator, MigratorTrait};
use model::entities::{nszu_correction, record, user};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    db
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn timestamp(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(10, 0, 0).unwrap()
}

pub async fn insert_user(db: &DatabaseConnection, username: &str) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set("hash".to_string()),
        role: Set(user::Role::Editor),
        created_at: Set(timestamp(2025, 1, 1)),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Inserts a record; `status` and `death` are the fields tests vary most.
pub async fn insert_record(
    db: &DatabaseConnection,
    full_name: &str,
    discharged: NaiveDate,
    department: &str,
    physician: &str,
    status: &str,
    death: Option<NaiveDate>,
) -> record::Model {
    record::ActiveModel {
        date_of_discharge: Set(Some(discharged)),
        full_name: Set(full_name.to_string()),
        discharge_department: Set(Some(department.to_string())),
        treating_physician: Set(Some(physician.to_string())),
        history: Set(Some(format!("H-{}", full_name.len()))),
        k_days: Set(Some(5)),
        discharge_status: Set(Some(status.to_string())),
        date_of_death: Set(death),
        comment: Set(None),
        created_by: Set(None),
        created_at: Set(discharged.and_hms_opt(8, 0, 0).unwrap()),
        updated_by: Set(None),
        updated_at: Set(discharged.and_hms_opt(8, 0, 0).unwrap()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_correction(
    db: &DatabaseConnection,
    on: NaiveDate,
    nszu_record_id: &str,
    doctor: &str,
    status: nszu_correction::NszuStatus,
    fakt_summ: Decimal,
) -> nszu_correction::Model {
    nszu_correction::ActiveModel {
        date: Set(on),
        nszu_record_id: Set(nszu_record_id.to_string()),
        doctor: Set(doctor.to_string()),
        status: Set(status),
        detail: Set(None),
        fakt_summ: Set(fakt_summ),
        comment: Set(None),
        created_by: Set(None),
        created_at: Set(on.and_hms_opt(9, 0, 0).unwrap()),
        updated_by: Set(None),
        updated_at: Set(on.and_hms_opt(9, 0, 0).unwrap()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

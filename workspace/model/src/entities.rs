//! SeaORM entities for the discharge-records service.

pub mod audit_log;
pub mod department;
pub mod nszu_correction;
pub mod record;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::audit_log::Entity as AuditLog;
    pub use super::department::Entity as Department;
    pub use super::nszu_correction::Entity as NszuCorrection;
    pub use super::record::Entity as Record;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    fn now() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    async fn create_user(db: &DatabaseConnection, name: &str, role: user::Role) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            username: Set(name.to_string()),
            password_hash: Set("hash".to_string()),
            role: Set(role),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let operator = create_user(&db, "operator1", user::Role::Operator).await?;
        let editor = create_user(&db, "editor1", user::Role::Editor).await?;

        department::ActiveModel {
            name: Set("Хірургічне".to_string()),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let record = record::ActiveModel {
            date_of_discharge: Set(NaiveDate::from_ymd_opt(2025, 3, 1)),
            full_name: Set("Шевченко Тарас".to_string()),
            discharge_department: Set(Some("Хірургічне".to_string())),
            treating_physician: Set(Some("Іваненко".to_string())),
            history: Set(Some("123/25".to_string())),
            k_days: Set(Some(7)),
            discharge_status: Set(Some(record::status::PROCESSING.to_string())),
            created_by: Set(Some(operator.id)),
            created_at: Set(now()),
            updated_by: Set(Some(operator.id)),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let correction = nszu_correction::ActiveModel {
            date: Set(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()),
            nszu_record_id: Set("NSZU-001".to_string()),
            doctor: Set("Іваненко".to_string()),
            status: Set(nszu_correction::NszuStatus::Paid),
            fakt_summ: Set(Decimal::new(125050, 2)),
            created_by: Set(Some(editor.id)),
            created_at: Set(now()),
            updated_by: Set(Some(editor.id)),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let loaded = NszuCorrection::find_by_id(correction.id).one(&db).await?.unwrap();
        assert_eq!(loaded.status, nszu_correction::NszuStatus::Paid);
        assert_eq!(loaded.fakt_summ, Decimal::new(125050, 2));

        audit_log::ActiveModel {
            user_id: Set(Some(operator.id)),
            action: Set("record.create".to_string()),
            entity_type: Set(Some("record".to_string())),
            entity_id: Set(Some(record.id)),
            details: Set(None),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let entries = operator.find_related(AuditLog).all(&db).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "record.create");

        // Removing the author keeps the record and the audit trail.
        operator.delete(&db).await?;
        let record = Record::find_by_id(record.id).one(&db).await?.unwrap();
        assert_eq!(record.created_by, None);
        let orphaned = AuditLog::find()
            .filter(audit_log::Column::UserId.is_null())
            .all(&db)
            .await?;
        assert_eq!(orphaned.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_unique_username() -> Result<(), DbErr> {
        let db = setup_db().await?;

        create_user(&db, "same", user::Role::Operator).await?;
        let duplicate = create_user(&db, "same", user::Role::Editor).await;
        assert!(duplicate.is_err());

        let count = User::find().all(&db).await?.len();
        assert_eq!(count, 1);
        Ok(())
    }
}

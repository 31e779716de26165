use sea_orm_migration::prelude::*;

use crate::m20250101_000001_create_tables::{AuditLogs, Departments, NszuCorrections, Records};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Indexes backing the dashboard filters, sorting and statistics.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let record_indexes = [
            ("idx_record_discharge_status", Records::DischargeStatus),
            ("idx_record_treating_physician", Records::TreatingPhysician),
            ("idx_record_discharge_department", Records::DischargeDepartment),
            ("idx_record_date_of_discharge", Records::DateOfDischarge),
            ("idx_record_full_name", Records::FullName),
            ("idx_record_updated_at", Records::UpdatedAt),
        ];
        for (name, column) in record_indexes {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Records::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        let nszu_indexes = [
            ("idx_nszu_date", NszuCorrections::Date),
            ("idx_nszu_doctor", NszuCorrections::Doctor),
            ("idx_nszu_status", NszuCorrections::Status),
        ];
        for (name, column) in nszu_indexes {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(NszuCorrections::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_departments_name")
                    .table(Departments::Table)
                    .col(Departments::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_logs_created_at")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let indexes = [
            ("idx_record_discharge_status", "records"),
            ("idx_record_treating_physician", "records"),
            ("idx_record_discharge_department", "records"),
            ("idx_record_date_of_discharge", "records"),
            ("idx_record_full_name", "records"),
            ("idx_record_updated_at", "records"),
            ("idx_nszu_date", "nszu_corrections"),
            ("idx_nszu_doctor", "nszu_corrections"),
            ("idx_nszu_status", "nszu_corrections"),
            ("idx_departments_name", "departments"),
            ("idx_audit_logs_created_at", "audit_logs"),
        ];
        for (name, table) in indexes {
            manager
                .drop_index(Index::drop().name(name).table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

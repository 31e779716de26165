use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_len(Users::Username, 80).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string_len(Users::Role, 20).default("operator"))
                    .col(date_time(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create departments table
        manager
            .create_table(
                Table::create()
                    .table(Departments::Table)
                    .if_not_exists()
                    .col(pk_auto(Departments::Id))
                    .col(string_len(Departments::Name, 100).unique_key())
                    .col(date_time(Departments::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create records table
        manager
            .create_table(
                Table::create()
                    .table(Records::Table)
                    .if_not_exists()
                    .col(pk_auto(Records::Id))
                    .col(date_null(Records::DateOfDischarge))
                    .col(string_len(Records::FullName, 200))
                    .col(string_len_null(Records::DischargeDepartment, 100))
                    .col(string_len_null(Records::TreatingPhysician, 200))
                    .col(string_len_null(Records::History, 100))
                    .col(integer_null(Records::KDays))
                    .col(string_len_null(Records::DischargeStatus, 50))
                    .col(date_null(Records::DateOfDeath))
                    .col(text_null(Records::Comment))
                    .col(integer_null(Records::CreatedBy))
                    .col(date_time(Records::CreatedAt))
                    .col(integer_null(Records::UpdatedBy))
                    .col(date_time(Records::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_records_created_by")
                            .from(Records::Table, Records::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_records_updated_by")
                            .from(Records::Table, Records::UpdatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create nszu_corrections table
        manager
            .create_table(
                Table::create()
                    .table(NszuCorrections::Table)
                    .if_not_exists()
                    .col(pk_auto(NszuCorrections::Id))
                    .col(date(NszuCorrections::Date))
                    .col(string_len(NszuCorrections::NszuRecordId, 100))
                    .col(string_len(NszuCorrections::Doctor, 200))
                    .col(string_len(NszuCorrections::Status, 40).default("В обробці"))
                    .col(text_null(NszuCorrections::Detail))
                    .col(decimal(NszuCorrections::FaktSumm).decimal_len(16, 4).default(0))
                    .col(text_null(NszuCorrections::Comment))
                    .col(integer_null(NszuCorrections::CreatedBy))
                    .col(date_time(NszuCorrections::CreatedAt))
                    .col(integer_null(NszuCorrections::UpdatedBy))
                    .col(date_time(NszuCorrections::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_nszu_corrections_created_by")
                            .from(NszuCorrections::Table, NszuCorrections::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_nszu_corrections_updated_by")
                            .from(NszuCorrections::Table, NszuCorrections::UpdatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create audit_logs table
        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(pk_auto(AuditLogs::Id))
                    .col(integer_null(AuditLogs::UserId))
                    .col(string_len(AuditLogs::Action, 100))
                    .col(string_len_null(AuditLogs::EntityType, 50))
                    .col(integer_null(AuditLogs::EntityId))
                    .col(text_null(AuditLogs::Details))
                    .col(date_time(AuditLogs::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_audit_logs_user")
                            .from(AuditLogs::Table, AuditLogs::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NszuCorrections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Records::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Departments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Departments {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Records {
    Table,
    Id,
    DateOfDischarge,
    FullName,
    DischargeDepartment,
    TreatingPhysician,
    History,
    KDays,
    DischargeStatus,
    DateOfDeath,
    Comment,
    CreatedBy,
    CreatedAt,
    UpdatedBy,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum NszuCorrections {
    Table,
    Id,
    Date,
    NszuRecordId,
    Doctor,
    Status,
    Detail,
    FaktSumm,
    Comment,
    CreatedBy,
    CreatedAt,
    UpdatedBy,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum AuditLogs {
    Table,
    Id,
    UserId,
    Action,
    EntityType,
    EntityId,
    Details,
    CreatedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PasswordResetOtps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PasswordResetOtps::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PasswordResetOtps::Email).string().not_null())
                    .col(
                        ColumnDef::new(PasswordResetOtps::OtpHash)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetOtps::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetOtps::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Not unique: racing reissues may briefly leave two rows
        manager
            .create_index(
                Index::create()
                    .name("idx_password_reset_otps_email")
                    .table(PasswordResetOtps::Table)
                    .col(PasswordResetOtps::Email)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PasswordResetOtps::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PasswordResetOtps {
    Table,
    Id,
    Email,
    OtpHash,
    ExpiresAt,
    CreatedAt,
}

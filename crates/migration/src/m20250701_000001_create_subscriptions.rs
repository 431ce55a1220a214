//! Create `subscriptions` table.
//!
//! `id`, `created_at` and `version` are filled by column defaults so the
//! insert path can read them back with `RETURNING`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(big_integer(Subscriptions::Id).primary_key().auto_increment())
                    .col(string_len(Subscriptions::ServiceName, 500).not_null())
                    .col(
                        integer(Subscriptions::Price)
                            .not_null()
                            .check(Expr::col(Subscriptions::Price).gte(0)),
                    )
                    .col(uuid(Subscriptions::UserId).not_null())
                    .col(date(Subscriptions::StartDate).not_null())
                    .col(ColumnDef::new(Subscriptions::EndDate).date().null())
                    .col(
                        timestamp_with_time_zone(Subscriptions::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(integer(Subscriptions::Version).not_null().default(1))
                    .check(
                        Expr::col(Subscriptions::EndDate)
                            .is_null()
                            .or(Expr::col(Subscriptions::EndDate).gte(Expr::col(Subscriptions::StartDate))),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Subscriptions::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    ServiceName,
    Price,
    UserId,
    StartDate,
    EndDate,
    CreatedAt,
    Version,
}

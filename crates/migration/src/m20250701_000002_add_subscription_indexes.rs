use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // user_id filter on list and sum
        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_user_id")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // start_date range scan for the price sum
        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_start_date")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::StartDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Full-text match on service_name; must use the same expression as the list query.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_subscriptions_service_name_fts \
                 ON subscriptions USING GIN (to_tsvector('simple', service_name))",
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_subscriptions_service_name_fts")
            .await?;
        manager
            .drop_index(Index::drop().name("idx_subscriptions_start_date").table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_subscriptions_user_id").table(Subscriptions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Subscriptions { Table, UserId, StartDate }

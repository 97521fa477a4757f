use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create crawler_raw table (extracted listing items)
        manager
            .create_table(
                Table::create()
                    .table(CrawlerRaw::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlerRaw::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CrawlerRaw::ConfigCode).string().not_null())
                    .col(ColumnDef::new(CrawlerRaw::JobId).big_integer().not_null())
                    .col(ColumnDef::new(CrawlerRaw::Title).string().not_null())
                    .col(ColumnDef::new(CrawlerRaw::Link).string().not_null())
                    .col(ColumnDef::new(CrawlerRaw::Price).double())
                    .col(ColumnDef::new(CrawlerRaw::PriceString).string())
                    .col(ColumnDef::new(CrawlerRaw::Oldprice).double())
                    .col(ColumnDef::new(CrawlerRaw::Discount).double())
                    .col(
                        ColumnDef::new(CrawlerRaw::Created)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CrawlerRaw::Modified)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawler_raw_job_id")
                    .table(CrawlerRaw::Table)
                    .col(CrawlerRaw::JobId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawler_raw_config_code")
                    .table(CrawlerRaw::Table)
                    .col(CrawlerRaw::ConfigCode)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlerRaw::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CrawlerRaw {
    Table,
    Id,
    ConfigCode,
    JobId,
    Title,
    Link,
    Price,
    PriceString,
    Oldprice,
    Discount,
    Created,
    Modified,
}

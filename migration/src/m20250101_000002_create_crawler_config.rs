use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create crawler_config table
        manager
            .create_table(
                Table::create()
                    .table(CrawlerConfig::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlerConfig::Code)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CrawlerConfig::StartUrl).string().not_null())
                    .col(ColumnDef::new(CrawlerConfig::AllItemsSel).string().not_null())
                    .col(ColumnDef::new(CrawlerConfig::TitleSel).string().not_null())
                    .col(ColumnDef::new(CrawlerConfig::LinkSel).string().not_null())
                    .col(ColumnDef::new(CrawlerConfig::PriceSel).string().not_null())
                    .col(
                        ColumnDef::new(CrawlerConfig::UseNextPageButton)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(CrawlerConfig::NextPageButtonSel).string())
                    .col(
                        ColumnDef::new(CrawlerConfig::UseUrlPageParameter)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(CrawlerConfig::UrlPageParameter).string())
                    .col(
                        ColumnDef::new(CrawlerConfig::UseInfiniteScroll)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(CrawlerConfig::MaxPages).integer())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlerConfig::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CrawlerConfig {
    Table,
    Code,
    StartUrl,
    AllItemsSel,
    TitleSel,
    LinkSel,
    PriceSel,
    UseNextPageButton,
    NextPageButtonSel,
    UseUrlPageParameter,
    UrlPageParameter,
    UseInfiniteScroll,
    MaxPages,
}

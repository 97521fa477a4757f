use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create job table
        manager
            .create_table(
                Table::create()
                    .table(Job::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Job::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Job::ConfigCode).string().not_null())
                    .col(ColumnDef::new(Job::WebsiteCode).string().not_null())
                    .col(ColumnDef::new(Job::JobType).string().not_null().default("CRAWL"))
                    .col(ColumnDef::new(Job::Status).string().not_null().default("Created"))
                    .col(ColumnDef::new(Job::TestRun).boolean().not_null().default(false))
                    .col(ColumnDef::new(Job::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Job::FinishedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Job::Created)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Job::Modified)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Job::ModifiedBy).string().not_null().default("SYSTEM"))
                    .to_owned(),
            )
            .await?;

        // The eligibility query filters on status + job_type and joins on website_code
        manager
            .create_index(
                Index::create()
                    .name("idx_job_status_type")
                    .table(Job::Table)
                    .col(Job::Status)
                    .col(Job::JobType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_website_code")
                    .table(Job::Table)
                    .col(Job::WebsiteCode)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Job::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Job {
    Table,
    Id,
    ConfigCode,
    WebsiteCode,
    JobType,
    Status,
    TestRun,
    StartedAt,
    FinishedAt,
    Created,
    Modified,
    ModifiedBy,
}

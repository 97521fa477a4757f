use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create job_error table (append-only crawl failure records)
        manager
            .create_table(
                Table::create()
                    .table(JobError::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobError::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobError::JobId).big_integer().not_null())
                    .col(ColumnDef::new(JobError::Source).string().not_null())
                    .col(ColumnDef::new(JobError::Category).string().not_null())
                    .col(ColumnDef::new(JobError::JobType).string().not_null().default("CRAWL"))
                    .col(ColumnDef::new(JobError::Error).text().not_null())
                    .col(
                        ColumnDef::new(JobError::Created)
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
                    .name("idx_job_error_job_id")
                    .table(JobError::Table)
                    .col(JobError::JobId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobError::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JobError {
    Table,
    Id,
    JobId,
    Source,
    Category,
    JobType,
    Error,
    Created,
}

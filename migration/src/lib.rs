// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_job;
mod m20250101_000002_create_crawler_config;
mod m20250101_000003_create_crawler_raw;
mod m20250101_000004_create_job_error;

/// 数据库迁移器
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    /// 获取所有迁移
    ///
    /// # 返回值
    ///
    /// 返回迁移列表
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_job::Migration),
            Box::new(m20250101_000002_create_crawler_config::Migration),
            Box::new(m20250101_000003_create_crawler_raw::Migration),
            Box::new(m20250101_000004_create_job_error::Migration),
        ]
    }
}

// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_config::CrawlConfig;
use crate::domain::models::item::Item;
use crate::domain::models::job::CrawlJob;
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 行数据不合法（缺失字段或分页模式配置冲突）
    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

impl RepositoryError {
    /// 判断错误是否为瞬态（可重试）
    ///
    /// # 返回值
    ///
    /// 连接类数据库错误返回true，其余返回false
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RepositoryError::Database(DbErr::Conn(_))
                | RepositoryError::Database(DbErr::ConnectionAcquire(_))
        )
    }
}

/// 作业仓库特质
///
/// 定义调度器与持久化层之间的全部数据访问接口。
/// 状态更新带状态守卫：终态作业不会被任何 mark_* 操作复活。
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 获取下一个可调度的作业
    ///
    /// 选取最老的（id 升序）状态为 Created 的 CRAWL 作业，
    /// 且其 website_code 当前没有 Running 作业。
    /// "就绪且该网站未在运行" 的组合条件在存储层原子求值。
    async fn fetch_next_eligible(&self) -> Result<Option<CrawlJob>, RepositoryError>;

    /// 按编码加载爬取配置，校验失败返回 MalformedRow
    async fn fetch_config(&self, code: &str) -> Result<CrawlConfig, RepositoryError>;

    /// 标记作业为 Running（仅允许从 Created 转换）
    async fn mark_running(&self, id: i64) -> Result<(), RepositoryError>;

    /// 标记作业为 Finished（仅允许从 Running 转换，幂等）
    async fn mark_finished(&self, id: i64) -> Result<(), RepositoryError>;

    /// 标记作业为 Failed（仅允许从 Running 转换，幂等）
    async fn mark_failed(&self, id: i64) -> Result<(), RepositoryError>;

    /// 批量持久化条目
    ///
    /// 按 BATCH_SIZE 分批插入，整个调用处于同一个事务内；
    /// 任何一批失败都会回滚全部插入。
    async fn insert_items(
        &self,
        config_code: &str,
        job_id: i64,
        items: &[Item],
    ) -> Result<(), RepositoryError>;

    /// 追加一条爬取错误记录
    async fn insert_error(
        &self,
        job_id: i64,
        website_code: &str,
        config_code: &str,
        message: &str,
    ) -> Result<(), RepositoryError>;
}

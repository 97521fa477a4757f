// Copyright 2025 pricewatch
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::crawl_config::{CrawlConfig, PaginationMode};
use crate::domain::models::item::Item;
use crate::domain::models::job::{CrawlJob, JobStatus};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::infrastructure::database::entities::{crawler_config, crawler_raw, job, job_error};
use crate::utils::retry::{with_retry, RetryPolicy};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter, Set,
    Statement, TransactionTrait,
};
use std::sync::Arc;

/// title/link 列的最大长度
const TITLE_LINK_MAX_LEN: usize = 255;
/// price_string 列的最大长度
const PRICE_STRING_MAX_LEN: usize = 60;

/// 修改者标记，所有调度器发起的状态转换都使用它
const MODIFIED_BY_SYSTEM: &str = "SYSTEM";

/// 调度器消费的作业类型
const JOB_TYPE_CRAWL: &str = "CRAWL";

/// 选取最老的可调度作业：Created 状态的 CRAWL 作业，
/// 且同一 website_code 当前没有 Running 作业。
const NEXT_ELIGIBLE_SQL: &str = r#"
SELECT "job".* FROM "job"
WHERE "job"."status" = $1
  AND "job"."job_type" = $2
  AND NOT EXISTS (
    SELECT 1 FROM "job" AS "running"
    WHERE "running"."website_code" = "job"."website_code"
      AND "running"."status" = $3
      AND "running"."job_type" = $2
  )
ORDER BY "job"."id" ASC
LIMIT 1
"#;

/// 作业仓库实现
///
/// 基于SeaORM实现的作业数据访问层。所有操作对连接类错误
/// 做有限次指数退避重试。
#[derive(Clone)]
pub struct JobRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
    /// 瞬态错误重试策略
    retry: RetryPolicy,
    /// 条目入库批次大小
    batch_size: usize,
}

impl JobRepositoryImpl {
    /// 创建新的作业仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    /// * `batch_size` - 条目入库的批次大小
    pub fn new(db: Arc<DatabaseConnection>, batch_size: usize) -> Self {
        Self {
            db,
            retry: RetryPolicy::default(),
            batch_size,
        }
    }
}

fn job_from_model(model: job::Model) -> Result<CrawlJob, RepositoryError> {
    let status: JobStatus = model.status.parse().map_err(|_| {
        RepositoryError::MalformedRow(format!(
            "job {}: unknown status {:?}",
            model.id, model.status
        ))
    })?;
    Ok(CrawlJob {
        id: model.id,
        config_code: model.config_code,
        website_code: model.website_code,
        job_type: model.job_type,
        status,
        test_run: model.test_run,
        started_at: model.started_at,
        finished_at: model.finished_at,
        created: model.created,
        modified: model.modified,
        modified_by: model.modified_by,
    })
}

/// 把配置行转换并校验为领域配置
///
/// 三种分页模式必须且只能启用一种，启用的模式必须带有
/// 对应的参数/选择器，四个提取选择器必须非空。
fn config_from_model(model: crawler_config::Model) -> Result<CrawlConfig, RepositoryError> {
    let enabled_modes = [
        model.use_url_page_parameter,
        model.use_next_page_button,
        model.use_infinite_scroll,
    ]
    .iter()
    .filter(|enabled| **enabled)
    .count();
    if enabled_modes != 1 {
        return Err(RepositoryError::MalformedRow(format!(
            "config {}: exactly one pagination mode must be enabled, found {}",
            model.code, enabled_modes
        )));
    }

    let pagination = if model.use_url_page_parameter {
        let parameter = model
            .url_page_parameter
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                RepositoryError::MalformedRow(format!(
                    "config {}: url_page_parameter is required",
                    model.code
                ))
            })?;
        PaginationMode::UrlParameter { parameter }
    } else if model.use_next_page_button {
        let selector = model
            .next_page_button_sel
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                RepositoryError::MalformedRow(format!(
                    "config {}: next_page_button_sel is required",
                    model.code
                ))
            })?;
        PaginationMode::NextButton { selector }
    } else {
        PaginationMode::InfiniteScroll
    };

    let max_pages = match model.max_pages {
        None => None,
        Some(pages) => Some(u32::try_from(pages).map_err(|_| {
            RepositoryError::MalformedRow(format!(
                "config {}: max_pages must be non-negative",
                model.code
            ))
        })?),
    };

    Ok(CrawlConfig {
        start_url: required_field(&model.start_url, "start_url", &model.code)?,
        all_items_selector: required_field(&model.all_items_sel, "all_items_sel", &model.code)?,
        title_selector: required_field(&model.title_sel, "title_sel", &model.code)?,
        link_selector: required_field(&model.link_sel, "link_sel", &model.code)?,
        price_selector: required_field(&model.price_sel, "price_sel", &model.code)?,
        code: model.code,
        pagination,
        max_pages,
    })
}

fn required_field(value: &str, field: &str, code: &str) -> Result<String, RepositoryError> {
    if value.trim().is_empty() {
        return Err(RepositoryError::MalformedRow(format!(
            "config {}: {} is empty",
            code, field
        )));
    }
    Ok(value.to_string())
}

/// 按字符截断到列的最大长度
fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[async_trait]
impl JobRepository for JobRepositoryImpl {
    async fn fetch_next_eligible(&self) -> Result<Option<CrawlJob>, RepositoryError> {
        let model = with_retry(&self.retry, RepositoryError::is_transient, || async {
            job::Entity::find()
                .from_raw_sql(Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    NEXT_ELIGIBLE_SQL,
                    [
                        JobStatus::Created.to_string().into(),
                        JOB_TYPE_CRAWL.into(),
                        JobStatus::Running.to_string().into(),
                    ],
                ))
                .one(self.db.as_ref())
                .await
                .map_err(RepositoryError::from)
        })
        .await?;

        model.map(job_from_model).transpose()
    }

    async fn fetch_config(&self, code: &str) -> Result<CrawlConfig, RepositoryError> {
        let model = with_retry(&self.retry, RepositoryError::is_transient, || async {
            crawler_config::Entity::find_by_id(code)
                .one(self.db.as_ref())
                .await
                .map_err(RepositoryError::from)
        })
        .await?
        .ok_or(RepositoryError::NotFound)?;

        config_from_model(model)
    }

    async fn mark_running(&self, id: i64) -> Result<(), RepositoryError> {
        let result = with_retry(&self.retry, RepositoryError::is_transient, || async {
            job::Entity::update_many()
                .col_expr(job::Column::Status, Expr::value(JobStatus::Running.to_string()))
                .col_expr(job::Column::StartedAt, Expr::value(Utc::now().fixed_offset()))
                .col_expr(job::Column::Modified, Expr::value(Utc::now().fixed_offset()))
                .col_expr(job::Column::ModifiedBy, Expr::value(MODIFIED_BY_SYSTEM))
                .filter(job::Column::Id.eq(id))
                .filter(job::Column::Status.eq(JobStatus::Created.to_string()))
                .exec(self.db.as_ref())
                .await
                .map_err(RepositoryError::from)
        })
        .await?;

        // 0 行说明作业已被拿走或不存在，调用方应放弃这个作业
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_finished(&self, id: i64) -> Result<(), RepositoryError> {
        self.finish_with_status(id, JobStatus::Finished).await
    }

    async fn mark_failed(&self, id: i64) -> Result<(), RepositoryError> {
        self.finish_with_status(id, JobStatus::Failed).await
    }

    async fn insert_items(
        &self,
        config_code: &str,
        job_id: i64,
        items: &[Item],
    ) -> Result<(), RepositoryError> {
        if items.is_empty() {
            return Ok(());
        }

        with_retry(&self.retry, RepositoryError::is_transient, || async {
            // 所有批次处于同一事务：任何一批失败都回滚全部
            let txn = self.db.begin().await?;
            for chunk in items.chunks(self.batch_size) {
                let rows = chunk.iter().map(|item| crawler_raw::ActiveModel {
                    config_code: Set(config_code.to_string()),
                    job_id: Set(job_id),
                    title: Set(truncate_chars(&item.title, TITLE_LINK_MAX_LEN)),
                    link: Set(truncate_chars(&item.link, TITLE_LINK_MAX_LEN)),
                    price: Set(Some(item.price_value)),
                    price_string: Set(Some(truncate_chars(
                        &item.price_text,
                        PRICE_STRING_MAX_LEN,
                    ))),
                    oldprice: Set(item.old_price),
                    discount: Set(item.discount),
                    ..Default::default()
                });
                crawler_raw::Entity::insert_many(rows).exec(&txn).await?;
            }
            txn.commit().await?;
            Ok(())
        })
        .await
    }

    async fn insert_error(
        &self,
        job_id: i64,
        website_code: &str,
        config_code: &str,
        message: &str,
    ) -> Result<(), RepositoryError> {
        with_retry(&self.retry, RepositoryError::is_transient, || async {
            let row = job_error::ActiveModel {
                job_id: Set(job_id),
                source: Set(website_code.to_string()),
                category: Set(config_code.to_string()),
                job_type: Set(JOB_TYPE_CRAWL.to_string()),
                error: Set(message.to_string()),
                ..Default::default()
            };
            job_error::Entity::insert(row).exec(self.db.as_ref()).await?;
            Ok(())
        })
        .await
    }
}

impl JobRepositoryImpl {
    /// 终态转换，只允许从 Running 出发；0 行受影响视为幂等成功
    async fn finish_with_status(&self, id: i64, status: JobStatus) -> Result<(), RepositoryError> {
        with_retry(&self.retry, RepositoryError::is_transient, || async {
            job::Entity::update_many()
                .col_expr(job::Column::Status, Expr::value(status.to_string()))
                .col_expr(job::Column::FinishedAt, Expr::value(Utc::now().fixed_offset()))
                .col_expr(job::Column::Modified, Expr::value(Utc::now().fixed_offset()))
                .col_expr(job::Column::ModifiedBy, Expr::value(MODIFIED_BY_SYSTEM))
                .filter(job::Column::Id.eq(id))
                .filter(job::Column::Status.eq(JobStatus::Running.to_string()))
                .exec(self.db.as_ref())
                .await
                .map_err(RepositoryError::from)
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn repo_with_update_result(rows_affected: u64) -> JobRepositoryImpl {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected,
            }])
            .into_connection();
        JobRepositoryImpl::new(Arc::new(db), 100)
    }

    #[tokio::test]
    async fn test_mark_running_claims_created_job() {
        let repo = repo_with_update_result(1);
        assert!(repo.mark_running(7).await.is_ok());
    }

    #[tokio::test]
    async fn test_mark_running_on_claimed_job_is_not_found() {
        // 状态守卫：作业已不在 Created 状态时更新不到任何行
        let repo = repo_with_update_result(0);
        let err = repo.mark_running(7).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_mark_finished_on_terminal_job_is_idempotent() {
        // 终态作业不会被复活，0 行受影响视为成功
        let repo = repo_with_update_result(0);
        assert!(repo.mark_finished(7).await.is_ok());
    }

    #[tokio::test]
    async fn test_mark_failed_on_terminal_job_is_idempotent() {
        let repo = repo_with_update_result(0);
        assert!(repo.mark_failed(7).await.is_ok());
    }

    fn base_model() -> crawler_config::Model {
        crawler_config::Model {
            code: "SHOP-A".to_string(),
            start_url: "https://shop.example/catalog".to_string(),
            all_items_sel: ".product".to_string(),
            title_sel: ".title".to_string(),
            link_sel: ".link".to_string(),
            price_sel: ".price".to_string(),
            use_next_page_button: false,
            next_page_button_sel: None,
            use_url_page_parameter: true,
            url_page_parameter: Some("?page=".to_string()),
            use_infinite_scroll: false,
            max_pages: Some(10),
        }
    }

    #[test]
    fn test_valid_url_parameter_config() {
        let config = config_from_model(base_model()).unwrap();
        assert_eq!(
            config.pagination,
            PaginationMode::UrlParameter {
                parameter: "?page=".to_string()
            }
        );
        assert_eq!(config.max_pages, Some(10));
    }

    #[test]
    fn test_no_pagination_mode_is_rejected() {
        let mut model = base_model();
        model.use_url_page_parameter = false;
        let err = config_from_model(model).unwrap_err();
        assert!(matches!(err, RepositoryError::MalformedRow(_)));
    }

    #[test]
    fn test_multiple_pagination_modes_are_rejected() {
        let mut model = base_model();
        model.use_infinite_scroll = true;
        let err = config_from_model(model).unwrap_err();
        assert!(matches!(err, RepositoryError::MalformedRow(_)));
    }

    #[test]
    fn test_enabled_mode_requires_its_parameter() {
        let mut model = base_model();
        model.url_page_parameter = None;
        assert!(config_from_model(model).is_err());

        let mut model = base_model();
        model.use_url_page_parameter = false;
        model.use_next_page_button = true;
        model.next_page_button_sel = Some("  ".to_string());
        assert!(config_from_model(model).is_err());
    }

    #[test]
    fn test_empty_selector_is_rejected() {
        let mut model = base_model();
        model.price_sel = "".to_string();
        let err = config_from_model(model).unwrap_err();
        assert!(err.to_string().contains("price_sel"));
    }

    #[test]
    fn test_negative_max_pages_is_rejected() {
        let mut model = base_model();
        model.max_pages = Some(-1);
        assert!(config_from_model(model).is_err());
    }

    #[test]
    fn test_infinite_scroll_needs_no_extra_fields() {
        let mut model = base_model();
        model.use_url_page_parameter = false;
        model.url_page_parameter = None;
        model.use_infinite_scroll = true;
        model.max_pages = None;
        let config = config_from_model(model).unwrap();
        assert_eq!(config.pagination, PaginationMode::InfiniteScroll);
        assert_eq!(config.max_pages, None);
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("€€€€", 2), "€€");
        assert_eq!(truncate_chars("short", 255), "short");
    }
}

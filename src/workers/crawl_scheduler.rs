// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SchedulerSettings;
use crate::domain::models::crawl_config::CrawlConfig;
use crate::domain::models::job::CrawlJob;
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::domain::services::crawl_execution::run_crawl;
use crate::engines::traits::PageDriverFactory;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// 测试运行强制的页数上限
pub const TEST_RUN_PAGE_LIMIT: u32 = 2;

/// 排空等待的轮询间隔
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 爬取作业调度器
///
/// 周期性轮询作业表，为每个可调度的作业生成一个异步执行任务。
/// 两个调度约束：
/// - 同时执行的作业数不超过 `max_concurrent_jobs`
/// - 同一 website_code 同时只有一个作业在执行（存储层过滤加
///   进程内运行集合双重保证）
pub struct CrawlScheduler<R, F> {
    repository: Arc<R>,
    factory: Arc<F>,
    settings: SchedulerSettings,
    /// 正在执行的作业的 website_code 集合
    running_websites: Arc<Mutex<HashSet<String>>>,
}

impl<R, F> CrawlScheduler<R, F>
where
    R: JobRepository + 'static,
    F: PageDriverFactory + 'static,
{
    pub fn new(repository: Arc<R>, factory: Arc<F>, settings: SchedulerSettings) -> Self {
        Self {
            repository,
            factory,
            settings,
            running_websites: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// 调度主循环
    ///
    /// 每个轮询周期最多启动一个作业。仓库层瞬态错误已在其内部
    /// 重试过，到达这里的错误会放缓下一次轮询。
    pub async fn run(&self) {
        info!(
            check_interval_ms = self.settings.check_interval_ms,
            max_concurrent_jobs = self.settings.max_concurrent_jobs,
            "Crawl scheduler started"
        );
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.settings.check_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.poll_once().await {
                error!("Scheduler poll failed: {}", e);
                tokio::time::sleep(Duration::from_millis(self.settings.check_interval_ms)).await;
            }
        }
    }

    /// 单次调度：选取并启动最多一个作业
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(handle))` - 启动了一个作业执行任务
    /// * `Ok(None)` - 本轮没有可启动的作业
    /// * `Err(RepositoryError)` - 作业选取失败
    pub async fn poll_once(&self) -> Result<Option<JoinHandle<()>>, RepositoryError> {
        if self.running_websites.lock().len() >= self.settings.max_concurrent_jobs {
            return Ok(None);
        }

        let Some(job) = self.repository.fetch_next_eligible().await? else {
            return Ok(None);
        };

        // 存储层过滤与进程内集合之间存在窗口：作业刚结束时
        // 数据库已是终态而集合还未清理，反之亦然。以进程内
        // 集合为准做二次检查。
        {
            let mut running = self.running_websites.lock();
            if running.contains(&job.website_code) {
                return Ok(None);
            }
            running.insert(job.website_code.clone());
        }
        let guard = RunningGuard {
            websites: self.running_websites.clone(),
            website_code: job.website_code.clone(),
        };

        match self.repository.mark_running(job.id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => {
                // 作业在选取和认领之间被别的进程拿走了
                warn!(job_id = job.id, "Job was claimed elsewhere, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        let config = match self.repository.fetch_config(&job.config_code).await {
            Ok(config) => config,
            Err(e) => {
                error!(
                    job_id = job.id,
                    config_code = %job.config_code,
                    "Failed to load crawl config: {}",
                    e
                );
                if let Err(persist) = self
                    .repository
                    .insert_error(job.id, &job.website_code, &job.config_code, &e.to_string())
                    .await
                {
                    error!(job_id = job.id, "Failed to record job error: {}", persist);
                }
                if let Err(mark) = self.repository.mark_failed(job.id).await {
                    error!(job_id = job.id, "Failed to mark job as failed: {}", mark);
                }
                return Ok(None);
            }
        };

        let page_limit = if job.test_run {
            TEST_RUN_PAGE_LIMIT
        } else {
            config.max_pages.unwrap_or(self.settings.page_limit)
        };

        let repository = self.repository.clone();
        let factory = self.factory.clone();
        let handle = tokio::spawn(async move {
            execute_job(repository, factory, job, config, page_limit, guard).await;
        });
        Ok(Some(handle))
    }

    /// 等待在途作业结束，超过宽限时间后放弃
    pub async fn wait_for_drain(&self) {
        let deadline = tokio::time::Instant::now()
            + Duration::from_millis(self.settings.shutdown_grace_ms);
        loop {
            let remaining = self.running_websites.lock().len();
            if remaining == 0 {
                info!("All crawl jobs drained");
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    remaining = remaining,
                    "Shutdown grace period expired with jobs still running"
                );
                return;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    #[cfg(test)]
    pub(crate) fn running_websites(&self) -> Arc<Mutex<HashSet<String>>> {
        self.running_websites.clone()
    }
}

/// 运行集合占位守卫，作业结束（含panic）时释放网站
struct RunningGuard {
    websites: Arc<Mutex<HashSet<String>>>,
    website_code: String,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.websites.lock().remove(&self.website_code);
    }
}

/// 执行单个作业并落盘结果
///
/// 爬取结果非空时先入库再标记 Finished；入库失败或爬取失败
/// 都会记录错误并标记 Failed。状态落盘失败只记日志，守卫的
/// Drop 保证网站总会被释放。
async fn execute_job<R, F>(
    repository: Arc<R>,
    factory: Arc<F>,
    job: CrawlJob,
    config: CrawlConfig,
    page_limit: u32,
    _guard: RunningGuard,
) where
    R: JobRepository,
    F: PageDriverFactory,
{
    info!(
        job_id = job.id,
        config_code = %config.code,
        website_code = %job.website_code,
        test_run = job.test_run,
        page_limit = page_limit,
        "Starting crawl job"
    );

    match run_crawl(factory.as_ref(), &config, page_limit).await {
        Ok(items) if items.is_empty() => {
            warn!(job_id = job.id, "Crawl produced no items, finishing job");
            if let Err(e) = repository.mark_finished(job.id).await {
                error!(job_id = job.id, "Failed to mark job as finished: {}", e);
            }
        }
        Ok(items) => match repository.insert_items(&config.code, job.id, &items).await {
            Ok(()) => {
                if let Err(e) = repository.mark_finished(job.id).await {
                    error!(job_id = job.id, "Failed to mark job as finished: {}", e);
                    return;
                }
                info!(
                    job_id = job.id,
                    items = items.len(),
                    "Crawl job finished"
                );
            }
            Err(e) => {
                error!(job_id = job.id, "Failed to persist crawled items: {}", e);
                record_failure(&*repository, &job, &config.code, &e.to_string()).await;
            }
        },
        Err(e) => {
            error!(job_id = job.id, "Crawl job failed: {}", e);
            record_failure(&*repository, &job, &config.code, &e.to_string()).await;
        }
    }
}

async fn record_failure<R: JobRepository>(
    repository: &R,
    job: &CrawlJob,
    config_code: &str,
    message: &str,
) {
    if let Err(e) = repository
        .insert_error(job.id, &job.website_code, config_code, message)
        .await
    {
        error!(job_id = job.id, "Failed to record job error: {}", e);
    }
    if let Err(e) = repository.mark_failed(job.id).await {
        error!(job_id = job.id, "Failed to mark job as failed: {}", e);
    }
}

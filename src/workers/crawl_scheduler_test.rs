// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SchedulerSettings;
use crate::domain::models::crawl_config::{CrawlConfig, PaginationMode};
use crate::domain::models::item::Item;
use crate::domain::models::job::{CrawlJob, JobStatus};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::engines::mock_driver::{test_config, MockElement, MockFactory};
use crate::workers::crawl_scheduler::CrawlScheduler;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct MockJobRepository {
    jobs: Mutex<VecDeque<CrawlJob>>,
    configs: Mutex<HashMap<String, CrawlConfig>>,
    /// mark_running 返回 NotFound 的作业，模拟被其他进程认领
    claimed_elsewhere: Mutex<HashSet<i64>>,
    fetch_calls: AtomicUsize,
    running: Mutex<Vec<i64>>,
    finished: Mutex<Vec<i64>>,
    failed: Mutex<Vec<i64>>,
    inserted_items: Mutex<Vec<(String, i64, Vec<Item>)>>,
    errors: Mutex<Vec<(i64, String, String, String)>>,
}

#[async_trait]
impl JobRepository for MockJobRepository {
    async fn fetch_next_eligible(&self) -> Result<Option<CrawlJob>, RepositoryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.jobs.lock().pop_front())
    }

    async fn fetch_config(&self, code: &str) -> Result<CrawlConfig, RepositoryError> {
        self.configs
            .lock()
            .get(code)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn mark_running(&self, id: i64) -> Result<(), RepositoryError> {
        if self.claimed_elsewhere.lock().contains(&id) {
            return Err(RepositoryError::NotFound);
        }
        self.running.lock().push(id);
        Ok(())
    }

    async fn mark_finished(&self, id: i64) -> Result<(), RepositoryError> {
        self.finished.lock().push(id);
        Ok(())
    }

    async fn mark_failed(&self, id: i64) -> Result<(), RepositoryError> {
        self.failed.lock().push(id);
        Ok(())
    }

    async fn insert_items(
        &self,
        config_code: &str,
        job_id: i64,
        items: &[Item],
    ) -> Result<(), RepositoryError> {
        self.inserted_items
            .lock()
            .push((config_code.to_string(), job_id, items.to_vec()));
        Ok(())
    }

    async fn insert_error(
        &self,
        job_id: i64,
        website_code: &str,
        config_code: &str,
        message: &str,
    ) -> Result<(), RepositoryError> {
        self.errors.lock().push((
            job_id,
            website_code.to_string(),
            config_code.to_string(),
            message.to_string(),
        ));
        Ok(())
    }
}

fn make_job(id: i64, config_code: &str, website_code: &str, test_run: bool) -> CrawlJob {
    let now = Utc::now().fixed_offset();
    CrawlJob {
        id,
        config_code: config_code.to_string(),
        website_code: website_code.to_string(),
        job_type: "CRAWL".to_string(),
        status: JobStatus::Created,
        test_run,
        started_at: None,
        finished_at: None,
        created: now,
        modified: now,
        modified_by: "SYSTEM".to_string(),
    }
}

fn url_mode() -> PaginationMode {
    PaginationMode::UrlParameter {
        parameter: "?page=".to_string(),
    }
}

fn scheduler_settings() -> SchedulerSettings {
    SchedulerSettings {
        check_interval_ms: 5000,
        max_concurrent_jobs: 5,
        page_limit: 20,
        batch_size: 100,
        shutdown_grace_ms: 5000,
    }
}

fn scheduler_with(
    repository: Arc<MockJobRepository>,
    factory: MockFactory,
) -> CrawlScheduler<MockJobRepository, MockFactory> {
    CrawlScheduler::new(repository, Arc::new(factory), scheduler_settings())
}

#[tokio::test(start_paused = true)]
async fn test_poll_executes_job_to_completion() {
    let repository = Arc::new(MockJobRepository::default());
    repository.jobs.lock().push_back(make_job(1, "SHOP-A", "WEB-A", false));
    repository
        .configs
        .lock()
        .insert("SHOP-A".to_string(), test_config("SHOP-A", url_mode()));
    let factory = MockFactory::with_pages(vec![
        vec![
            MockElement::listing("Kettle", "https://shop.example/p/kettle", "10,00"),
            MockElement::listing("Toaster", "https://shop.example/p/toaster", "20,00"),
        ],
        vec![MockElement::listing("Kettle", "https://shop.example/p/kettle", "10,00")],
    ]);
    let scheduler = scheduler_with(repository.clone(), factory);

    let handle = scheduler.poll_once().await.unwrap().expect("job should start");
    handle.await.unwrap();

    assert_eq!(repository.running.lock().clone(), vec![1]);
    assert_eq!(repository.finished.lock().clone(), vec![1]);
    assert!(repository.failed.lock().is_empty());
    let inserted = repository.inserted_items.lock();
    assert_eq!(inserted.len(), 1);
    let (config_code, job_id, items) = &inserted[0];
    assert_eq!(config_code, "SHOP-A");
    assert_eq!(*job_id, 1);
    assert_eq!(items.len(), 2);
    // 网站在作业结束后被释放
    assert!(scheduler.running_websites().lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_running_website_is_not_scheduled_again() {
    let repository = Arc::new(MockJobRepository::default());
    repository.jobs.lock().push_back(make_job(2, "SHOP-A", "WEB-A", false));
    let scheduler = scheduler_with(repository.clone(), MockFactory::default());
    scheduler.running_websites().lock().insert("WEB-A".to_string());

    let started = scheduler.poll_once().await.unwrap();

    assert!(started.is_none());
    assert!(repository.running.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_limit_skips_polling() {
    let repository = Arc::new(MockJobRepository::default());
    let scheduler = scheduler_with(repository.clone(), MockFactory::default());
    {
        let websites = scheduler.running_websites();
        let mut running = websites.lock();
        for i in 0..5 {
            running.insert(format!("WEB-{}", i));
        }
    }

    let started = scheduler.poll_once().await.unwrap();

    assert!(started.is_none());
    // 容量已满时连作业表都不查询
    assert_eq!(repository.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_job_claimed_elsewhere_releases_website() {
    let repository = Arc::new(MockJobRepository::default());
    repository.jobs.lock().push_back(make_job(3, "SHOP-A", "WEB-A", false));
    repository.claimed_elsewhere.lock().insert(3);
    let scheduler = scheduler_with(repository.clone(), MockFactory::default());

    let started = scheduler.poll_once().await.unwrap();

    assert!(started.is_none());
    assert!(scheduler.running_websites().lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_config_fails_job() {
    let repository = Arc::new(MockJobRepository::default());
    repository.jobs.lock().push_back(make_job(4, "GONE", "WEB-A", false));
    let scheduler = scheduler_with(repository.clone(), MockFactory::default());

    let started = scheduler.poll_once().await.unwrap();

    assert!(started.is_none());
    assert_eq!(repository.failed.lock().clone(), vec![4]);
    let errors = repository.errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, 4);
    assert_eq!(errors[0].1, "WEB-A");
    assert_eq!(errors[0].2, "GONE");
    assert!(scheduler.running_websites().lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_crawl_failure_records_error_and_marks_failed() {
    let repository = Arc::new(MockJobRepository::default());
    repository.jobs.lock().push_back(make_job(5, "SHOP-A", "WEB-A", false));
    repository
        .configs
        .lock()
        .insert("SHOP-A".to_string(), test_config("SHOP-A", url_mode()));
    // 第一页就没有条目
    let factory = MockFactory::with_pages(vec![vec![]]);
    let scheduler = scheduler_with(repository.clone(), factory);

    let handle = scheduler.poll_once().await.unwrap().expect("job should start");
    handle.await.unwrap();

    assert_eq!(repository.failed.lock().clone(), vec![5]);
    assert!(repository.finished.lock().is_empty());
    let errors = repository.errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].3,
        "All items selector has not found any items on 1st page"
    );
    assert!(scheduler.running_websites().lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_test_run_is_capped_at_two_pages() {
    let repository = Arc::new(MockJobRepository::default());
    repository.jobs.lock().push_back(make_job(6, "SHOP-A", "WEB-A", true));
    repository
        .configs
        .lock()
        .insert("SHOP-A".to_string(), test_config("SHOP-A", url_mode()));
    let factory = MockFactory::with_pages(vec![
        vec![MockElement::listing("A", "https://shop.example/p/a", "1,00")],
        vec![MockElement::listing("B", "https://shop.example/p/b", "2,00")],
        vec![MockElement::listing("C", "https://shop.example/p/c", "3,00")],
    ]);
    let scheduler = scheduler_with(repository.clone(), factory);

    let handle = scheduler.poll_once().await.unwrap().expect("job should start");
    handle.await.unwrap();

    let inserted = repository.inserted_items.lock();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].2.len(), 2);
    assert_eq!(repository.finished.lock().clone(), vec![6]);
}

#[tokio::test(start_paused = true)]
async fn test_max_pages_from_config_overrides_default() {
    let repository = Arc::new(MockJobRepository::default());
    repository.jobs.lock().push_back(make_job(7, "SHOP-A", "WEB-A", false));
    let mut config = test_config("SHOP-A", url_mode());
    config.max_pages = Some(1);
    repository.configs.lock().insert("SHOP-A".to_string(), config);
    let factory = MockFactory::with_pages(vec![
        vec![MockElement::listing("A", "https://shop.example/p/a", "1,00")],
        vec![MockElement::listing("B", "https://shop.example/p/b", "2,00")],
    ]);
    let scheduler = scheduler_with(repository.clone(), factory);

    let handle = scheduler.poll_once().await.unwrap().expect("job should start");
    handle.await.unwrap();

    let inserted = repository.inserted_items.lock();
    assert_eq!(inserted[0].2.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_job_for_same_website_waits_for_first() {
    let repository = Arc::new(MockJobRepository::default());
    repository.jobs.lock().push_back(make_job(10, "SHOP-A", "acme", false));
    repository.jobs.lock().push_back(make_job(11, "SHOP-A", "acme", false));
    repository
        .configs
        .lock()
        .insert("SHOP-A".to_string(), test_config("SHOP-A", url_mode()));
    // 前两个快照供作业10消费，后两个供作业11消费
    let factory = MockFactory::with_pages(vec![
        vec![MockElement::listing("A", "https://shop.example/p/a", "1,00")],
        vec![MockElement::listing("A", "https://shop.example/p/a", "1,00")],
        vec![MockElement::listing("B", "https://shop.example/p/b", "2,00")],
        vec![MockElement::listing("B", "https://shop.example/p/b", "2,00")],
    ]);
    let scheduler = scheduler_with(repository.clone(), factory);

    let first = scheduler.poll_once().await.unwrap().expect("first job starts");
    // 第一个作业还在执行，第二个同网站作业不会被启动
    let second = scheduler.poll_once().await.unwrap();
    assert!(second.is_none());
    assert_eq!(repository.running.lock().clone(), vec![10]);
    // fetch_next_eligible 已把作业11弹出，放回去模拟下一轮重新选取
    repository.jobs.lock().push_back(make_job(11, "SHOP-A", "acme", false));

    first.await.unwrap();
    assert_eq!(repository.finished.lock().clone(), vec![10]);

    // 网站释放后作业11可以启动
    let second = scheduler.poll_once().await.unwrap().expect("second job starts");
    second.await.unwrap();
    assert_eq!(repository.running.lock().clone(), vec![10, 11]);
    assert_eq!(repository.finished.lock().clone(), vec![10, 11]);
}

#[tokio::test(start_paused = true)]
async fn test_drain_waits_for_running_jobs() {
    let repository = Arc::new(MockJobRepository::default());
    repository.jobs.lock().push_back(make_job(8, "SHOP-A", "WEB-A", false));
    repository
        .configs
        .lock()
        .insert("SHOP-A".to_string(), test_config("SHOP-A", url_mode()));
    let factory = MockFactory::with_pages(vec![vec![MockElement::listing(
        "A",
        "https://shop.example/p/a",
        "1,00",
    )]]);
    // 宽限时间要盖过翻页之间的随机延迟
    let mut settings = scheduler_settings();
    settings.shutdown_grace_ms = 30_000;
    let scheduler = CrawlScheduler::new(repository.clone(), Arc::new(factory), settings);

    let handle = scheduler.poll_once().await.unwrap().expect("job should start");
    scheduler.wait_for_drain().await;

    assert!(scheduler.running_websites().lock().is_empty());
    handle.await.unwrap();
    assert_eq!(repository.finished.lock().clone(), vec![8]);
}

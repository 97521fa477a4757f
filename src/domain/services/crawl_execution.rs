// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_config::CrawlConfig;
use crate::domain::models::item::Item;
use crate::domain::services::errors::CrawlError;
use crate::domain::services::item_extractor::extract_page;
use crate::domain::services::pagination::{Advance, Paginator};
use crate::engines::traits::{PageDriver, PageDriverFactory};
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 翻页之间的随机延迟下界（毫秒）
const MIN_PAGE_DELAY_MS: u64 = 3000;
/// 翻页之间的随机延迟上界（毫秒）
const MAX_PAGE_DELAY_MS: u64 = 6000;

/// 执行一次完整爬取
///
/// 打开页面会话、逐页提取直到结束条件，并在所有退出路径上
/// 释放页面会话。结束条件：达到页数上限、分页器返回结束、
/// 或当前页没有产生任何新条目。
///
/// # 参数
///
/// * `factory` - 页面驱动工厂
/// * `config` - 爬取配置
/// * `page_limit` - 本次运行允许的最大页数
///
/// # 返回值
///
/// * `Ok(Vec<Item>)` - 跨页去重后的全部条目（可能为空）
/// * `Err(CrawlError)` - 任一页提取失败或页面驱动错误
pub async fn run_crawl<F: PageDriverFactory>(
    factory: &F,
    config: &CrawlConfig,
    page_limit: u32,
) -> Result<Vec<Item>, CrawlError> {
    let driver = factory.open().await.map_err(CrawlError::on_page(1))?;

    let result = crawl_pages(&driver, config, page_limit).await;

    // 无论成败都释放页面会话
    if let Err(e) = driver.close().await {
        warn!(config_code = %config.code, "Failed to close page session: {}", e);
    }

    result
}

async fn crawl_pages<D: PageDriver>(
    driver: &D,
    config: &CrawlConfig,
    page_limit: u32,
) -> Result<Vec<Item>, CrawlError> {
    let paginator = Paginator::new(config);
    paginator.start(driver).await?;

    let mut all_items: Vec<Item> = Vec::new();
    let mut seen_links: HashSet<String> = HashSet::new();
    let mut current_page: u32 = 1;

    loop {
        let url = driver
            .current_url()
            .await
            .unwrap_or_else(|_| "<unknown>".to_string());

        let page_items = extract_page(driver, config, current_page).await?;
        let items_on_page = page_items.len();

        let new_items: Vec<Item> = page_items
            .into_iter()
            .filter(|item| seen_links.insert(item.link.clone()))
            .collect();

        // 整页都是已见过的条目说明站点在重复内容，正常结束
        if new_items.is_empty() {
            info!(
                config_code = %config.code,
                page = current_page,
                url = %url,
                "No new items on page, crawl complete"
            );
            break;
        }

        let added = new_items.len();
        all_items.extend(new_items);
        info!(
            config_code = %config.code,
            page = current_page,
            url = %url,
            new_items = added,
            total_items = all_items.len(),
            "Extracted items from page"
        );

        if current_page >= page_limit {
            info!(
                config_code = %config.code,
                page = current_page,
                "Page limit reached, crawl complete"
            );
            break;
        }
        current_page += 1;

        let delay = rand::rng().random_range(MIN_PAGE_DELAY_MS..=MAX_PAGE_DELAY_MS);
        debug!(
            config_code = %config.code,
            delay_ms = delay,
            "Sleeping before next page"
        );
        tokio::time::sleep(Duration::from_millis(delay)).await;

        match paginator.advance(driver, current_page, items_on_page).await? {
            Advance::Continue => {}
            Advance::End => break,
        }
    }

    Ok(all_items)
}

// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_config::{CrawlConfig, PaginationMode};
use crate::domain::services::errors::CrawlError;
use crate::engines::traits::{PageDriver, PageElement, PageError};
use std::time::Duration;
use tracing::debug;

/// 导航与点击翻页的统一超时
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// 无限滚动后等待页面高度增长的超时
pub const SCROLL_GROWTH_TIMEOUT: Duration = Duration::from_secs(8);
/// 翻页或滚动之后等待内容渲染的固定延迟
pub const RENDER_SETTLE_DELAY: Duration = Duration::from_secs(2);

const SCROLL_HEIGHT_EXPR: &str = "document.documentElement.scrollHeight";
const SCROLL_TO_BOTTOM_EXPR: &str = "window.scrollTo(0, document.documentElement.scrollHeight)";

/// 一次翻页尝试的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// 已到达下一页（或页面已增长），继续提取
    Continue,
    /// 没有更多页面，正常结束爬取
    End,
}

/// 分页驱动
///
/// 封装三种互斥的翻页策略。`start` 导航到起始URL，随后每轮提取
/// 之后调用一次 `advance`；返回 `Advance::End` 表示站点没有更多
/// 内容，属于正常结束而不是错误。
pub struct Paginator<'a> {
    config: &'a CrawlConfig,
}

impl<'a> Paginator<'a> {
    pub fn new(config: &'a CrawlConfig) -> Self {
        Self { config }
    }

    /// 导航到起始URL
    pub async fn start<D: PageDriver>(&self, driver: &D) -> Result<(), CrawlError> {
        driver
            .navigate(&self.config.start_url, NAVIGATION_TIMEOUT)
            .await
            .map_err(CrawlError::on_page(1))
    }

    /// 推进到下一页
    ///
    /// # 参数
    ///
    /// * `next_page` - 即将提取的页码（从2开始）
    /// * `items_on_page` - 上一轮提取时页面上的条目数，无限滚动
    ///   停滞时用它判断内容是否仍在增长
    pub async fn advance<D: PageDriver>(
        &self,
        driver: &D,
        next_page: u32,
        items_on_page: usize,
    ) -> Result<Advance, CrawlError> {
        match &self.config.pagination {
            PaginationMode::UrlParameter { parameter } => {
                let url = format!("{}{}{}", self.config.start_url, parameter, next_page);
                debug!(page = next_page, url = %url, "Navigating to next page via URL parameter");
                driver
                    .navigate(&url, NAVIGATION_TIMEOUT)
                    .await
                    .map_err(CrawlError::on_page(next_page))?;
                Ok(Advance::Continue)
            }
            PaginationMode::NextButton { selector } => {
                let Some(button) = driver
                    .query_one(selector)
                    .await
                    .map_err(CrawlError::on_page(next_page))?
                else {
                    debug!(page = next_page, "Next page button not found, ending crawl");
                    return Ok(Advance::End);
                };
                button.click().await.map_err(CrawlError::on_page(next_page))?;
                driver
                    .wait_for_navigation(NAVIGATION_TIMEOUT)
                    .await
                    .map_err(CrawlError::on_page(next_page))?;
                Ok(Advance::Continue)
            }
            PaginationMode::InfiniteScroll => {
                self.scroll_once(driver, next_page, items_on_page).await
            }
        }
    }

    /// 滚动到底部并等待页面高度增长
    ///
    /// 高度在超时内没有增长时退回条目计数判断：计数也没有增长
    /// 说明内容已经到底。
    async fn scroll_once<D: PageDriver>(
        &self,
        driver: &D,
        next_page: u32,
        items_on_page: usize,
    ) -> Result<Advance, CrawlError> {
        let previous_height = driver
            .evaluate_i64(SCROLL_HEIGHT_EXPR)
            .await
            .map_err(CrawlError::on_page(next_page))?;
        driver
            .execute(SCROLL_TO_BOTTOM_EXPR)
            .await
            .map_err(CrawlError::on_page(next_page))?;

        let growth = format!("{} > {}", SCROLL_HEIGHT_EXPR, previous_height);
        match driver.wait_for_condition(&growth, SCROLL_GROWTH_TIMEOUT).await {
            Ok(()) => {
                tokio::time::sleep(RENDER_SETTLE_DELAY).await;
                Ok(Advance::Continue)
            }
            Err(PageError::Timeout) => {
                let count_expr = format!(
                    "document.querySelectorAll({}).length",
                    serde_json::Value::String(self.config.all_items_selector.clone())
                );
                let count = driver
                    .evaluate_i64(&count_expr)
                    .await
                    .map_err(CrawlError::on_page(next_page))?;
                if count as usize <= items_on_page {
                    debug!(page = next_page, "Page height and item count stalled, ending crawl");
                    Ok(Advance::End)
                } else {
                    tokio::time::sleep(RENDER_SETTLE_DELAY).await;
                    Ok(Advance::Continue)
                }
            }
            Err(source) => Err(CrawlError::on_page(next_page)(source)),
        }
    }
}

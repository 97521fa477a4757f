// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_config::CrawlConfig;
use crate::domain::models::item::Item;
use crate::domain::services::errors::{CrawlError, ItemField};
use crate::domain::services::price_normalizer::normalize_price;
use crate::engines::traits::{PageDriver, PageElement};
use std::collections::HashSet;
use tracing::debug;

/// 条目提取服务
///
/// 从当前页面按配置的选择器提取商品条目。
///
/// # 参数
///
/// * `driver` - 页面驱动，页面已导航到目标目录页
/// * `config` - 爬取配置，提供条目与字段选择器
/// * `page` - 当前页码（从1开始，仅用于错误定位）
///
/// # 返回值
///
/// * `Ok(Vec<Item>)` - 按DOM顺序的条目，同页重复链接只保留第一条
/// * `Err(CrawlError)` - 第一页无条目、字段缺失或价格不可解析
pub async fn extract_page<D: PageDriver>(
    driver: &D,
    config: &CrawlConfig,
    page: u32,
) -> Result<Vec<Item>, CrawlError> {
    let elements = driver
        .query_all(&config.all_items_selector)
        .await
        .map_err(CrawlError::on_page(page))?;

    if page == 1 && elements.is_empty() {
        return Err(CrawlError::NoItemsOnFirstPage);
    }

    let mut items = Vec::with_capacity(elements.len());
    let mut seen_links: HashSet<String> = HashSet::new();

    // 条目编号从1开始，与错误消息中的定位一致
    for (index, element) in elements.iter().enumerate() {
        let item = index + 1;

        let title = element
            .text_of(&config.title_selector)
            .await
            .map_err(CrawlError::on_page(page))?
            .filter(|t| !t.is_empty())
            .ok_or(CrawlError::MissingField {
                field: ItemField::Title,
                item,
                page,
            })?;

        let link = element
            .link_of(&config.link_selector)
            .await
            .map_err(CrawlError::on_page(page))?
            .filter(|l| !l.is_empty())
            .ok_or(CrawlError::MissingField {
                field: ItemField::Link,
                item,
                page,
            })?;

        let price_text = element
            .text_of(&config.price_selector)
            .await
            .map_err(CrawlError::on_page(page))?
            .filter(|p| !p.is_empty())
            .ok_or(CrawlError::MissingField {
                field: ItemField::Price,
                item,
                page,
            })?;

        let price_value =
            normalize_price(&price_text).ok_or_else(|| CrawlError::UnparseablePrice {
                item,
                page,
                raw: price_text.clone(),
            })?;

        if !seen_links.insert(link.clone()) {
            debug!(page = page, link = %link, "Skipping duplicate item on page");
            continue;
        }

        items.push(Item::new(title, link, price_text, price_value));
    }

    Ok(items)
}

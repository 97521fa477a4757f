// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::PageError;
use std::fmt;
use thiserror::Error;

/// 爬取失败类型
///
/// 任何一个变体都会终止当前爬取并使作业进入 Failed 状态。
/// 选择器类错误（前三个变体）表示配方损坏，不做重试。
/// 错误消息会原样写入 job_error 表，保持可被运维检索的措辞。
#[derive(Error, Debug)]
pub enum CrawlError {
    /// 第一页上商品选择器没有匹配到任何元素
    #[error("All items selector has not found any items on 1st page")]
    NoItemsOnFirstPage,

    /// 条目缺失必填字段（标题/链接/价格）
    #[error("{field} not found for item: {item} on page {page}")]
    MissingField {
        field: ItemField,
        item: usize,
        page: u32,
    },

    /// 价格文本无法解析为非零数值
    #[error("Price not parsed for item: {item} on page {page}, price string: {raw}")]
    UnparseablePrice { item: usize, page: u32, raw: String },

    /// 页面驱动错误（导航超时、脚本求值失败、点击失败等）
    #[error("Page driver failed on page {page}: {source}")]
    Page {
        page: u32,
        #[source]
        source: PageError,
    },
}

impl CrawlError {
    /// 构造把 PageError 绑定到页码的映射闭包
    pub fn on_page(page: u32) -> impl FnOnce(PageError) -> CrawlError {
        move |source| CrawlError::Page { page, source }
    }
}

/// 条目必填字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Title,
    Link,
    Price,
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ItemField::Title => write!(f, "Title"),
            ItemField::Link => write!(f, "Link"),
            ItemField::Price => write!(f, "Price"),
        }
    }
}

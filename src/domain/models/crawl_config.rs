// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 爬取配置实体
///
/// 一个网站目录的不可变抓取配方：起始URL、四个提取选择器、
/// 分页模式和可选的页数上限。每个作业开始时从仓库加载一次，
/// 爬取过程中不会被修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// 配置编码（唯一标识）
    pub code: String,
    /// 起始URL，分页驱动总是先导航到这里
    pub start_url: String,
    /// 匹配页面上所有商品条目的选择器
    pub all_items_selector: String,
    /// 条目子树内的标题选择器
    pub title_selector: String,
    /// 条目子树内的链接选择器
    pub link_selector: String,
    /// 条目子树内的价格选择器
    pub price_selector: String,
    /// 分页模式，三选一
    pub pagination: PaginationMode,
    /// 页数上限，缺省时使用环境默认值
    pub max_pages: Option<u32>,
}

/// 分页模式枚举
///
/// 三种互斥的翻页策略，配置行必须且只能启用其中一种；
/// 仓库层在加载配置时校验并拒绝不合法的行。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaginationMode {
    /// URL参数翻页：导航到 start_url + parameter + 页码
    UrlParameter {
        /// 页码参数前缀，例如 "?page="
        parameter: String,
    },
    /// 下一页按钮：点击匹配选择器的元素并等待导航完成
    NextButton {
        /// 下一页按钮选择器
        selector: String,
    },
    /// 无限滚动：滚动到底部并等待页面高度增长
    InfiniteScroll,
}

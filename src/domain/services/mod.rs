// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含系统的核心业务逻辑服务，协调多个领域对象
/// 完成一次完整的目录爬取。
///
/// 包含的服务：
/// - 价格规范化（price_normalizer）：把原始价格文本解析为数值
/// - 条目提取（item_extractor）：从渲染后的页面提取商品条目
/// - 分页驱动（pagination）：按配置的策略在目录页之间推进
/// - 爬取执行（crawl_execution）：驱动分页与提取直到终止
pub mod crawl_execution;
pub mod errors;
pub mod item_extractor;
pub mod pagination;
pub mod price_normalizer;

// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 爬取作业（job）：一次针对某个网站目录的计划爬取
/// - 爬取配置（crawl_config）：网站目录的选择器与分页配方
/// - 商品条目（item）：从目录页面提取出的单条商品信息
///
/// 这些模型构成了系统的数据基础，定义了业务概念的
/// 结构和行为。
pub mod crawl_config;
pub mod item;
pub mod job;

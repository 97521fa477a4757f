// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 商品条目实体
///
/// 一条从目录页面提取出来的商品信息。由条目提取器创建，
/// 经持久化后即不再使用；`link` 是爬取内部的去重键。
/// 进入存储的条目保证标题、链接非空且价格解析成功非零。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// 商品标题
    pub title: String,
    /// 商品链接，去重指纹
    pub link: String,
    /// 原始价格文本（入库时截断到有界长度）
    pub price_text: String,
    /// 规范化后的数值价格
    pub price_value: f64,
    /// 旧价格（划线价），提取器当前不填充
    pub old_price: Option<f64>,
    /// 折扣，提取器当前不填充
    pub discount: Option<f64>,
}

impl Item {
    pub fn new(title: String, link: String, price_text: String, price_value: f64) -> Self {
        Self {
            title,
            link,
            price_text,
            price_value,
            old_price: None,
            discount: None,
        }
    }
}

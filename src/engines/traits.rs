// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 页面驱动错误类型
#[derive(Error, Debug)]
pub enum PageError {
    /// 导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 页面内脚本求值失败
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
    /// 元素交互失败
    #[error("Interaction failed: {0}")]
    Interaction(String),
    /// 等待条件超时
    #[error("Timed out waiting for page condition")]
    Timeout,
    /// 浏览器会话错误
    #[error("Browser error: {0}")]
    Browser(String),
}

/// 页面元素句柄特质
///
/// 对应页面上一个已匹配的 DOM 元素，子查询都限定在该元素的子树内。
#[async_trait]
pub trait PageElement: Send + Sync {
    /// 取子树内第一个匹配选择器的元素的文本（已去除首尾空白）
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(String))` - 元素存在且有文本
    /// * `Ok(None)` - 没有匹配的元素
    async fn text_of(&self, selector: &str) -> Result<Option<String>, PageError>;

    /// 取子树内第一个匹配选择器的元素的绝对链接地址
    async fn link_of(&self, selector: &str) -> Result<Option<String>, PageError>;

    /// 点击该元素
    async fn click(&self) -> Result<(), PageError>;
}

/// 页面驱动特质
///
/// 对无头浏览器能力的窄抽象：爬取核心只通过这些操作访问页面。
/// 所有导航和等待操作都带显式超时，单个卡住的页面不会无限阻塞爬取。
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: PageElement;

    /// 导航到指定URL并等待文档加载完成
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError>;

    /// 当前页面URL（仅用于日志）
    async fn current_url(&self) -> Result<String, PageError>;

    /// 按DOM顺序返回所有匹配选择器的元素句柄
    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, PageError>;

    /// 返回第一个匹配选择器的元素句柄，不存在时返回None
    async fn query_one(&self, selector: &str) -> Result<Option<Self::Element>, PageError>;

    /// 在页面内求值一个返回整数的表达式（高度、计数等读取）
    async fn evaluate_i64(&self, expression: &str) -> Result<i64, PageError>;

    /// 在页面内执行一个表达式，忽略返回值（滚动等）
    async fn execute(&self, expression: &str) -> Result<(), PageError>;

    /// 轮询等待表达式变为真值，超时返回 `PageError::Timeout`
    async fn wait_for_condition(
        &self,
        expression: &str,
        timeout: Duration,
    ) -> Result<(), PageError>;

    /// 等待点击触发的导航完成
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), PageError>;

    /// 释放页面会话
    ///
    /// 每次爬取必须在所有退出路径上恰好调用一次。
    async fn close(&self) -> Result<(), PageError>;
}

/// 页面驱动工厂特质
///
/// 每个作业开始时创建一个全新的页面会话。
#[async_trait]
pub trait PageDriverFactory: Send + Sync {
    type Driver: PageDriver;

    /// 打开一个新的页面会话
    async fn open(&self) -> Result<Self::Driver, PageError>;
}

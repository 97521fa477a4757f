// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 测试用页面驱动
//!
//! 按脚本回放页面快照的内存驱动：`query_all` 每次弹出一个页面快照，
//! 高度/计数/条件等读取同样从预置队列弹出，用于在不启动浏览器的
//! 情况下驱动提取、分页与调度测试。

use crate::domain::models::crawl_config::{CrawlConfig, PaginationMode};
use crate::engines::traits::{PageDriver, PageDriverFactory, PageElement, PageError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const ALL_ITEMS_SEL: &str = ".product";
pub const TITLE_SEL: &str = ".title";
pub const LINK_SEL: &str = ".link";
pub const PRICE_SEL: &str = ".price";
pub const NEXT_BUTTON_SEL: &str = ".next";

#[derive(Default)]
pub struct MockState {
    pub pages: Mutex<VecDeque<Vec<MockElement>>>,
    pub navigations: Mutex<Vec<String>>,
    pub buttons: Mutex<VecDeque<bool>>,
    /// 每次 `query_all` 弹出一项，true 表示会话层失败
    pub query_failures: Mutex<VecDeque<bool>>,
    pub heights: Mutex<VecDeque<i64>>,
    pub counts: Mutex<VecDeque<i64>>,
    pub conditions: Mutex<VecDeque<bool>>,
    pub executed: Mutex<Vec<String>>,
    pub clicks: AtomicUsize,
    pub closed: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockDriver {
    pub state: Arc<MockState>,
}

impl MockDriver {
    pub fn with_pages(pages: Vec<Vec<MockElement>>) -> Self {
        let driver = MockDriver::default();
        *driver.state.pages.lock() = pages.into();
        driver
    }
}

#[derive(Clone, Default)]
pub struct MockElement {
    texts: HashMap<String, String>,
    links: HashMap<String, String>,
    clicks: Option<Arc<MockState>>,
}

impl MockElement {
    /// 一条完整的商品条目
    pub fn listing(title: &str, link: &str, price: &str) -> Self {
        let mut element = MockElement::default();
        element.texts.insert(TITLE_SEL.to_string(), title.to_string());
        element.texts.insert(PRICE_SEL.to_string(), price.to_string());
        element.links.insert(LINK_SEL.to_string(), link.to_string());
        element
    }

    /// 移除一个字段，模拟选择器失配
    pub fn without(mut self, selector: &str) -> Self {
        self.texts.remove(selector);
        self.links.remove(selector);
        self
    }
}

#[async_trait]
impl PageElement for MockElement {
    async fn text_of(&self, selector: &str) -> Result<Option<String>, PageError> {
        Ok(self.texts.get(selector).cloned())
    }

    async fn link_of(&self, selector: &str) -> Result<Option<String>, PageError> {
        Ok(self.links.get(selector).cloned())
    }

    async fn click(&self) -> Result<(), PageError> {
        if let Some(state) = &self.clicks {
            state.clicks.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    type Element = MockElement;

    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), PageError> {
        self.state.navigations.lock().push(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self
            .state
            .navigations
            .lock()
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn query_all(&self, _selector: &str) -> Result<Vec<Self::Element>, PageError> {
        if self.state.query_failures.lock().pop_front().unwrap_or(false) {
            return Err(PageError::Browser("browser session lost".to_string()));
        }
        Ok(self.state.pages.lock().pop_front().unwrap_or_default())
    }

    async fn query_one(&self, _selector: &str) -> Result<Option<Self::Element>, PageError> {
        let present = self.state.buttons.lock().pop_front().unwrap_or(false);
        Ok(present.then(|| MockElement {
            clicks: Some(self.state.clone()),
            ..MockElement::default()
        }))
    }

    async fn evaluate_i64(&self, expression: &str) -> Result<i64, PageError> {
        if expression.contains("querySelectorAll") {
            Ok(self.state.counts.lock().pop_front().unwrap_or(0))
        } else {
            Ok(self.state.heights.lock().pop_front().unwrap_or(0))
        }
    }

    async fn execute(&self, expression: &str) -> Result<(), PageError> {
        self.state.executed.lock().push(expression.to_string());
        Ok(())
    }

    async fn wait_for_condition(
        &self,
        _expression: &str,
        _timeout: Duration,
    ) -> Result<(), PageError> {
        match self.state.conditions.lock().pop_front().unwrap_or(true) {
            true => Ok(()),
            false => Err(PageError::Timeout),
        }
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<(), PageError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), PageError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 测试用驱动工厂，`open` 返回共享同一状态的驱动副本
#[derive(Clone, Default)]
pub struct MockFactory {
    pub driver: MockDriver,
}

impl MockFactory {
    pub fn with_pages(pages: Vec<Vec<MockElement>>) -> Self {
        Self {
            driver: MockDriver::with_pages(pages),
        }
    }
}

#[async_trait]
impl PageDriverFactory for MockFactory {
    type Driver = MockDriver;

    async fn open(&self) -> Result<Self::Driver, PageError> {
        Ok(self.driver.clone())
    }
}

/// 使用标准测试选择器构造配置
pub fn test_config(code: &str, pagination: PaginationMode) -> CrawlConfig {
    CrawlConfig {
        code: code.to_string(),
        start_url: "https://shop.example/catalog".to_string(),
        all_items_selector: ALL_ITEMS_SEL.to_string(),
        title_selector: TITLE_SEL.to_string(),
        link_selector: LINK_SEL.to_string(),
        price_selector: PRICE_SEL.to_string(),
        pagination,
        max_pages: None,
    }
}

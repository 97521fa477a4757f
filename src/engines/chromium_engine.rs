// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{PageDriver, PageDriverFactory, PageElement, PageError};
use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// 条件轮询间隔
const CONDITION_POLL_INTERVAL: Duration = Duration::from_millis(250);

// Global browser instance to avoid re-launching Chrome on every job.
// Pages are created per crawl; the browser lives until process exit.
static BROWSER_INSTANCE: OnceCell<Browser> = OnceCell::const_new();

// Asynchronously gets or initializes the shared browser instance.
// This function ensures that the browser is launched only once.
pub async fn get_browser() -> Result<&'static Browser, PageError> {
    BROWSER_INSTANCE
        .get_or_try_init(|| async {
            let remote_debugging_url = std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL").ok();

            let (browser, mut handler) = if let Some(ref url) = remote_debugging_url {
                tracing::info!("Connecting to remote Chrome instance at: {}", url);
                Browser::connect(url).await.map_err(|e| {
                    PageError::Browser(format!("Failed to connect to remote Chrome: {}", e))
                })?
            } else {
                let builder = BrowserConfig::builder()
                    .no_sandbox()
                    .request_timeout(Duration::from_secs(30))
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage");

                Browser::launch(builder.build().map_err(PageError::Browser)?)
                    .await
                    .map_err(|e| PageError::Browser(e.to_string()))?
            };

            // Spawn a handler to process browser events
            tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            Ok(browser)
        })
        .await
}

/// Chromium页面驱动
///
/// 基于chromiumoxide实现的页面驱动，一个实例对应一个浏览器页面会话。
pub struct ChromiumPageDriver {
    page: Page,
}

/// Chromium页面驱动工厂
///
/// 在共享浏览器实例上为每次爬取打开一个新页面。
pub struct ChromiumPageFactory;

#[async_trait]
impl PageDriverFactory for ChromiumPageFactory {
    type Driver = ChromiumPageDriver;

    async fn open(&self) -> Result<Self::Driver, PageError> {
        let browser = get_browser().await?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| PageError::Browser(e.to_string()))?;
        Ok(ChromiumPageDriver { page })
    }
}

#[async_trait]
impl PageDriver for ChromiumPageDriver {
    type Element = ChromiumElement;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError> {
        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .map_err(|_| PageError::Timeout)?
            .map_err(|e| PageError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, PageError> {
        // 零匹配不是错误；传输/会话错误必须向上传播，
        // 否则断开的浏览器会被当成"页面为空"处理
        let elements = match self.page.find_elements(selector).await {
            Ok(elements) => elements,
            Err(CdpError::NotFound) => Vec::new(),
            Err(e) => return Err(PageError::Browser(e.to_string())),
        };
        Ok(elements
            .into_iter()
            .map(|element| ChromiumElement {
                element,
                page: self.page.clone(),
            })
            .collect())
    }

    async fn query_one(&self, selector: &str) -> Result<Option<Self::Element>, PageError> {
        // chromiumoxide reports "not found" as an error; only that
        // variant maps to None
        match self.page.find_element(selector).await {
            Ok(element) => Ok(Some(ChromiumElement {
                element,
                page: self.page.clone(),
            })),
            Err(CdpError::NotFound) => Ok(None),
            Err(e) => Err(PageError::Browser(e.to_string())),
        }
    }

    async fn evaluate_i64(&self, expression: &str) -> Result<i64, PageError> {
        self.page
            .evaluate(expression)
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))?
            .into_value::<i64>()
            .map_err(|e| PageError::Evaluation(e.to_string()))
    }

    async fn execute(&self, expression: &str) -> Result<(), PageError> {
        self.page
            .evaluate(expression)
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_condition(
        &self,
        expression: &str,
        timeout: Duration,
    ) -> Result<(), PageError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let truthy = self
                .page
                .evaluate(expression)
                .await
                .map_err(|e| PageError::Evaluation(e.to_string()))?
                .into_value::<bool>()
                .unwrap_or(false);
            if truthy {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PageError::Timeout);
            }
            tokio::time::sleep(CONDITION_POLL_INTERVAL).await;
        }
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), PageError> {
        tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| PageError::Timeout)?
            .map_err(|e| PageError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), PageError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| PageError::Browser(e.to_string()))
    }
}

/// Chromium元素句柄
pub struct ChromiumElement {
    element: chromiumoxide::Element,
    page: Page,
}

#[async_trait]
impl PageElement for ChromiumElement {
    async fn text_of(&self, selector: &str) -> Result<Option<String>, PageError> {
        let child = match self.element.find_element(selector).await {
            Ok(child) => child,
            Err(CdpError::NotFound) => return Ok(None),
            Err(e) => return Err(PageError::Browser(e.to_string())),
        };
        let text = child
            .inner_text()
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))?;
        Ok(text.map(|t| t.trim().to_string()))
    }

    async fn link_of(&self, selector: &str) -> Result<Option<String>, PageError> {
        let child = match self.element.find_element(selector).await {
            Ok(child) => child,
            Err(CdpError::NotFound) => return Ok(None),
            Err(e) => return Err(PageError::Browser(e.to_string())),
        };
        let Some(href) = child
            .attribute("href")
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))?
        else {
            return Ok(None);
        };

        // Resolve relative hrefs against the current document, like the
        // DOM `href` property would.
        if let Ok(absolute) = Url::parse(&href) {
            return Ok(Some(absolute.to_string()));
        }
        let base = self
            .page
            .url()
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))?;
        match base.and_then(|b| Url::parse(&b).ok()) {
            Some(base) => Ok(base.join(&href).ok().map(|u| u.to_string())),
            None => Ok(Some(href)),
        }
    }

    async fn click(&self) -> Result<(), PageError> {
        self.element
            .click()
            .await
            .map_err(|e| PageError::Interaction(e.to_string()))?;
        Ok(())
    }
}

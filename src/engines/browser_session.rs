// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::engines::traits::{ExtractionError, PortalSession, SessionFactory};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// 基于 Chromium 的会话工厂
///
/// 浏览器进程只启动一次并在运行之间复用；每个会话使用独立的浏览上下文
/// （相当于无痕窗口），cookie 与存储互不共享，关闭会话时销毁上下文。
pub struct BrowserSessionFactory {
    settings: BrowserSettings,
    browser: OnceCell<Arc<Browser>>,
}

impl BrowserSessionFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            browser: OnceCell::new(),
        }
    }

    // Launches (or connects to) Chrome on first use only.
    async fn browser(&self) -> Result<Arc<Browser>, ExtractionError> {
        self.browser
            .get_or_try_init(|| async {
                let (browser, mut handler) = if let Some(url) = &self.settings.remote_debugging_url
                {
                    info!("Connecting to remote Chrome instance at: {}", url);
                    Browser::connect(url).await.map_err(|e| {
                        ExtractionError::Infrastructure(format!(
                            "Failed to connect to remote Chrome: {}",
                            e
                        ))
                    })?
                } else {
                    let mut builder = BrowserConfig::builder()
                        .no_sandbox()
                        .request_timeout(Duration::from_secs(
                            self.settings.request_timeout_seconds.max(1),
                        ))
                        .arg("--disable-gpu")
                        .arg("--disable-dev-shm-usage");
                    if !self.settings.headless {
                        builder = builder.with_head();
                    }
                    if let Some(path) = &self.settings.executable {
                        builder = builder.chrome_executable(path);
                    }
                    let config = builder
                        .build()
                        .map_err(ExtractionError::Infrastructure)?;

                    info!("Launching local Chrome instance");
                    Browser::launch(config).await.map_err(|e| {
                        ExtractionError::Infrastructure(format!("Failed to launch Chrome: {}", e))
                    })?
                };

                // Spawn a handler to process browser events
                tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if event.is_err() {
                            break;
                        }
                    }
                });

                Ok(Arc::new(browser))
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl SessionFactory for BrowserSessionFactory {
    async fn open(&self) -> Result<Box<dyn PortalSession>, ExtractionError> {
        let browser = self.browser().await?;

        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| {
                ExtractionError::Infrastructure(format!("Failed to create browser context: {}", e))
            })?
            .result
            .browser_context_id;

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(ExtractionError::Infrastructure)?;

        match browser.new_page(params).await {
            Ok(page) => {
                debug!("Opened browser context {:?}", context_id);
                Ok(Box::new(BrowserSession {
                    browser,
                    page: Some(page),
                    context_id: Some(context_id),
                }))
            }
            Err(e) => {
                dispose_context(&browser, context_id).await;
                Err(ExtractionError::Infrastructure(format!(
                    "Failed to open page: {}",
                    e
                )))
            }
        }
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

async fn dispose_context(browser: &Browser, context_id: BrowserContextId) {
    if let Err(e) = browser
        .execute(DisposeBrowserContextParams::new(context_id))
        .await
    {
        warn!("Failed to dispose browser context: {}", e);
    }
}

/// 单个浏览上下文中的页面
struct BrowserSession {
    browser: Arc<Browser>,
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
}

impl BrowserSession {
    fn page(&self) -> Result<&Page, ExtractionError> {
        self.page
            .as_ref()
            .ok_or_else(|| ExtractionError::Infrastructure("session already closed".to_string()))
    }
}

#[async_trait]
impl PortalSession for BrowserSession {
    async fn goto(&mut self, url: &str) -> Result<(), ExtractionError> {
        self.page()?.goto(url).await.map_err(|e| {
            ExtractionError::Infrastructure(format!("Navigation to {} failed: {}", url, e))
        })?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), ExtractionError> {
        let element = self.page()?.find_element(selector).await.map_err(|e| {
            ExtractionError::Extraction(format!("Input '{}' not found: {}", selector, e))
        })?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(|e| ExtractionError::Extraction(format!("Input clear failed: {}", e)))?;
        element
            .click()
            .await
            .map_err(|e| ExtractionError::Extraction(format!("Input focus failed: {}", e)))?
            .type_str(value)
            .await
            .map_err(|e| ExtractionError::Extraction(format!("Input failed: {}", e)))?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), ExtractionError> {
        let page = self.page()?;
        page.find_element(selector)
            .await
            .map_err(|e| {
                ExtractionError::Extraction(format!("Click target '{}' not found: {}", selector, e))
            })?
            .click()
            .await
            .map_err(|e| ExtractionError::Extraction(format!("Click failed: {}", e)))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ExtractionError::Infrastructure(format!("Navigation failed: {}", e)))?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, ExtractionError> {
        self.page()?
            .content()
            .await
            .map_err(|e| ExtractionError::Infrastructure(e.to_string()))
    }

    async fn current_url(&mut self) -> Result<String, ExtractionError> {
        self.page()?
            .url()
            .await
            .map_err(|e| ExtractionError::Infrastructure(e.to_string()))?
            .ok_or_else(|| ExtractionError::Infrastructure("page has no url".to_string()))
    }

    async fn close(&mut self) -> Result<(), ExtractionError> {
        let page_result = match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| ExtractionError::Infrastructure(format!("Failed to close page: {}", e))),
            None => Ok(()),
        };
        // 即使页面关闭失败也要销毁上下文
        if let Some(context_id) = self.context_id.take() {
            dispose_context(&self.browser, context_id).await;
        }
        page_result
    }
}

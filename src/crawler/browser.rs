//! Headless Chromium engine
//!
//! One browser session per crawl, launched on the first fetch. Each page gets
//! its own tab which is closed once the rendered DOM has been read. A tab left
//! open by a fetch that was dropped mid-load is closed by the next fetch or by
//! `close()`.

use crate::config::UserAgentConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::url::{SafetyValidator, Verdict};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Browser-backed page engine
pub struct BrowserFetcher {
    user_agent: String,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    validator: Option<SafetyValidator>,
    open_tab: Option<Page>,
}

impl BrowserFetcher {
    pub fn new(config: &UserAgentConfig) -> Self {
        Self {
            user_agent: config.header_value(),
            browser: None,
            handler: None,
            validator: None,
            open_tab: None,
        }
    }

    /// Validates the URL each page finally landed on
    ///
    /// The browser follows redirects itself, so a hop to an unsafe target is
    /// caught after the load and the page is discarded.
    pub fn with_validator(mut self, validator: SafetyValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    async fn release_tab(&mut self) {
        if let Some(page) = self.open_tab.take() {
            if let Err(e) = page.close().await {
                debug!(error = %e, "Failed to close tab");
            }
        }
    }

    async fn ensure_browser(&mut self) -> Result<&Browser, FetchError> {
        if self.browser.is_none() {
            info!("Launching headless browser");

            let config = BrowserConfig::builder()
                .arg(format!("--user-agent={}", self.user_agent))
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--no-sandbox")
                .build()
                .map_err(FetchError::DriverUnavailable)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| FetchError::DriverUnavailable(e.to_string()))?;

            self.handler = Some(tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            }));
            self.browser = Some(browser);
        }

        self.browser
            .as_ref()
            .ok_or_else(|| FetchError::DriverUnavailable("browser not running".to_string()))
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&mut self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.release_tab().await;

        let page = self
            .ensure_browser()
            .await?
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::DriverUnavailable(e.to_string()))?;
        self.open_tab = Some(page.clone());

        let loaded = async {
            page.goto(url.as_str()).await?;
            let final_url = page.url().await?;
            let html = page.content().await?;
            Ok::<_, chromiumoxide::error::CdpError>((final_url, html))
        }
        .await;

        self.release_tab().await;

        let (final_url, html) = loaded.map_err(|e| FetchError::Navigation(e.to_string()))?;
        let final_url = final_url
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        if final_url != *url {
            if let Some(validator) = &self.validator {
                if let Verdict::Rejected(reason) = validator.validate(&final_url).await {
                    return Err(FetchError::Navigation(format!(
                        "landed on unsafe target {}: {}",
                        final_url, reason
                    )));
                }
            }
        }

        Ok(FetchedPage { final_url, html })
    }

    async fn close(&mut self) {
        self.release_tab().await;
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Failed to close browser cleanly");
            }
            let _ = browser.wait().await;
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

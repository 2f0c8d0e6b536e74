//! chromiumoxide によるページ描画
//!
//! クッキーは起動直後にブラウザ全体へ一度だけ注入し、ページごとに新しいタブで遷移する。

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::{ScraperConfig, SessionCookie};
use crate::error::ScraperError;
use crate::traits::{NodeQuery, PageRenderer};

/// 要素出現のポーリング間隔（ミリ秒）
const ELEMENT_POLL_INTERVAL_MS: u64 = 300;

pub struct ChromiumRenderer {
    cookies: Vec<SessionCookie>,
    headless: bool,
    timeout: Duration,
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
    user_data_dir: Option<PathBuf>,
}

impl ChromiumRenderer {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            cookies: config.cookies.clone(),
            headless: config.headless,
            timeout: config.timeout,
            browser: None,
            handler_task: None,
            user_data_dir: None,
        }
    }

    /// ブラウザを起動
    pub async fn initialize(&mut self) -> Result<(), ScraperError> {
        info!("Initializing browser...");

        // ユニークなユーザーデータディレクトリを生成
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("lantouzi-{}", unique_id));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .window_size(1280, 800);

        if let Ok(chrome_path) =
            std::env::var("CHROME_PATH").or_else(|_| std::env::var("CHROMIUM_PATH"))
        {
            builder = builder.chrome_executable(chrome_path);
        }

        if !self.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .no_sandbox()
            .request_timeout(self.timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .build()
            .map_err(ScraperError::BrowserInit)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ハンドラータスクを起動
        self.handler_task = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        }));

        self.browser = Some(browser);
        self.user_data_dir = Some(user_data_dir);

        // クッキーはドメイン指定なのでページURLに依存せず設定できる
        if !self.cookies.is_empty() {
            let params = self.cookie_params()?;
            self.browser()?
                .set_cookies(params)
                .await
                .map_err(|e| ScraperError::BrowserInit(format!("クッキー設定エラー: {}", e)))?;
            info!("Injected {} cookies", self.cookies.len());
        }

        info!("Browser initialized successfully");
        Ok(())
    }

    /// ブラウザを閉じる
    pub async fn close(&mut self) -> Result<(), ScraperError> {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                debug!("Failed to close browser: {}", e);
            }
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        if let Some(dir) = self.user_data_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                debug!("Failed to remove user data dir {:?}: {}", dir, e);
            }
        }
        info!("Browser closed");
        Ok(())
    }

    fn browser(&self) -> Result<&Browser, ScraperError> {
        self.browser
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("ブラウザが初期化されていません".into()))
    }

    fn cookie_params(&self) -> Result<Vec<CookieParam>, ScraperError> {
        self.cookies
            .iter()
            .map(|cookie| {
                let mut builder = CookieParam::builder()
                    .name(&cookie.name)
                    .value(&cookie.value)
                    .domain(&cookie.domain)
                    .path(&cookie.path);
                if let Some(expires) = cookie.expires {
                    builder = builder.expires(TimeSinceEpoch::new(expires.timestamp() as f64));
                }
                builder.build().map_err(|e| {
                    ScraperError::BrowserInit(format!("クッキー設定エラー {}: {}", cookie.name, e))
                })
            })
            .collect()
    }

    /// 新しいタブで `url` を開く
    async fn open(&self, url: &str) -> Result<Page, ScraperError> {
        let page = self
            .browser()?
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        debug!("Navigating to {}", url);
        page.goto(url)
            .await
            .map_err(|e| ScraperError::Navigation(format!("{}: {}", url, e)))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ScraperError::Navigation(format!("{}: {}", url, e)))?;

        Ok(page)
    }

    /// 要素が現れるまで待つ
    async fn wait_for_element(&self, page: &Page, selector: &str) -> Result<Element, ScraperError> {
        let start = Instant::now();

        loop {
            match page.find_element(selector).await {
                Ok(element) => {
                    debug!("Found {} after {:?}", selector, start.elapsed());
                    return Ok(element);
                }
                Err(e) if start.elapsed() >= self.timeout => {
                    return Err(ScraperError::Timeout(format!(
                        "{:?}以内に要素が現れませんでした {}: {}",
                        self.timeout, selector, e
                    )));
                }
                Err(_) => sleep(Duration::from_millis(ELEMENT_POLL_INTERVAL_MS)).await,
            }
        }
    }

    async fn read_inner_html(&self, page: &Page, query: NodeQuery) -> Result<String, ScraperError> {
        if let Some(wait_for) = query.wait_for {
            self.wait_for_element(page, wait_for).await?;
        }

        let element = self.wait_for_element(page, query.selector).await?;
        let html = element
            .inner_html()
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", query.selector, e)))?;

        Ok(html.unwrap_or_default())
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn inner_html(&self, url: &str, query: NodeQuery) -> Result<String, ScraperError> {
        let page = self.open(url).await?;
        let result = self.read_inner_html(&page, query).await;

        // ページを閉じる
        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }

        result
    }

    async fn screenshot(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        let page = self.open(url).await?;
        let result = page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| ScraperError::Screenshot(format!("{}: {}", url, e)));

        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }

        result
    }
}

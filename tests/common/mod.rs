#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lantouzi_export::{NodeQuery, PageRenderer, Pacing, ScraperConfig, ScraperError, SessionCookie};

/// URLごとに用意したHTMLを返すレンダラ
#[derive(Default)]
pub struct ScriptedRenderer {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<(String, NodeQuery)>>,
    screenshots: Mutex<Vec<String>>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<(String, NodeQuery)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn screenshot_urls(&self) -> Vec<String> {
        self.screenshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn inner_html(&self, url: &str, query: NodeQuery) -> Result<String, ScraperError> {
        self.requests.lock().unwrap().push((url.to_string(), query));
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ScraperError::Navigation(format!("unexpected url: {}", url)))
    }

    async fn screenshot(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        self.screenshots.lock().unwrap().push(url.to_string());
        Ok(format!("PNG {}", url).into_bytes())
    }
}

pub fn session_cookie() -> SessionCookie {
    SessionCookie {
        name: "ltz_session".into(),
        value: "abc123".into(),
        domain: ".lantouzi.com".into(),
        path: "/".into(),
        expires: Some(Utc::now() + Duration::seconds(3600)),
    }
}

pub fn test_config(output: &std::path::Path) -> ScraperConfig {
    ScraperConfig::new(vec![session_cookie()])
        .with_output_dir(output)
        .with_pacing(Pacing::none())
}

/// `<td>` を `n` 個並べたテーブル
pub fn table_with_cells(n: usize) -> String {
    let cells: String = (0..n)
        .map(|i| format!("<td class=\"c\"><span>v{}</span></td>", i))
        .collect();
    format!("<tbody><tr>{}</tr></tbody>", cells)
}

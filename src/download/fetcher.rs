//! 契約書ファイルのHTTPダウンロード

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, COOKIE};
use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;

/// ダウンロードのタイムアウト（秒）
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

fn filename_pattern() -> &'static Regex {
    static FILENAME: OnceLock<Regex> = OnceLock::new();
    FILENAME.get_or_init(|| Regex::new(r#"filename="([^"]+)""#).expect("filename regex is valid"))
}

/// `Content-Disposition` からファイル名を取り出す
pub fn disposition_filename(header: &str) -> Option<String> {
    let caps = filename_pattern().captures(header)?;
    let name = caps.get(1)?.as_str().trim();

    // ディレクトリ成分は捨てる
    let name = Path::new(name).file_name()?.to_string_lossy().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Saved(PathBuf),
    /// 本文が空だったので保存しなかった
    Skipped,
}

pub struct AgreementFetcher {
    client: reqwest::Client,
    cookie_header: Option<String>,
}

impl AgreementFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            cookie_header: config.cookie_header(),
        })
    }

    /// `url` を取得して `<dir>/<index>_<ファイル名>` に保存する
    pub async fn fetch(&self, url: &str, dir: &Path, index: usize) -> Result<FetchOutcome, ScraperError> {
        let mut request = self.client.get(url);
        if let Some(cookie) = &self.cookie_header {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;

        if response.content_length() == Some(0) {
            warn!("Empty file, ignoring: {:?} -> {}", dir, url);
            return Ok(FetchOutcome::Skipped);
        }

        let file = response
            .headers()
            .get(CONTENT_DISPOSITION)
            // ファイル名は生のUTF-8で送られてくる
            .and_then(|v| disposition_filename(&String::from_utf8_lossy(v.as_bytes())))
            .ok_or_else(|| {
                ScraperError::Download(format!("ファイル名が取得できません {:?} -> {}", dir, url))
            })?;

        let path = dir.join(format!("{}_{}", index, file));
        let body = response.bytes().await?;
        std::fs::write(&path, &body).map_err(|e| {
            ScraperError::Download(format!("ファイル保存エラー {:?}: {}", path, e))
        })?;

        info!("Downloaded {:?} ({} bytes)", path, body.len());
        Ok(FetchOutcome::Saved(path))
    }
}

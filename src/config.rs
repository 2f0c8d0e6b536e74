//! 設定ファイル（YAML）の読み込みと実行時設定
//!
//! `config.yaml` の `Cookies` / `Targets` を読み込み、クッキーの有効期限を
//! 読み込み時点で確定させた [`ScraperConfig`] を組み立てる。

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ScraperError;

pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
pub const DEFAULT_OUTPUT_DIR: &str = "./lantouzi";

/// 設定ファイル上のクッキー
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CookieEntry {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// 有効期間（秒）
    #[serde(default, rename = "ValidTime", alias = "ExpireWithIn")]
    pub valid_time: Option<i64>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl CookieEntry {
    /// `now` を起点に有効期限を確定させる
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<SessionCookie, ScraperError> {
        let expires = match self.valid_time {
            Some(secs) => Some(
                TimeDelta::try_seconds(secs)
                    .and_then(|d| now.checked_add_signed(d))
                    .ok_or_else(|| {
                        ScraperError::Config(format!(
                            "クッキー {} の有効期間が範囲外です: {}",
                            self.name, secs
                        ))
                    })?,
            ),
            None => None,
        };

        Ok(SessionCookie {
            name: self.name.clone(),
            value: self.value.clone(),
            domain: self.domain.clone(),
            path: self.path.clone(),
            expires,
        })
    }
}

/// 読み込み済みのセッションクッキー（実行中は不変）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
}

/// `Cookie` リクエストヘッダ用の値を組み立てる
pub fn cookie_header(cookies: &[SessionCookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }

    Some(
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// 設定ファイル上のエクスポート対象
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub screen: bool,
    #[serde(default)]
    pub parse: bool,
    #[serde(default)]
    pub column: u32,
}

/// 取引履歴テーブルの列構成
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableShape {
    /// 交易金额 / 说明 / 交易时间
    ThreeColumn,
    /// 交易金额 / 说明 / 账户余额 / 交易时间
    FourColumn,
}

impl TableShape {
    pub fn columns(self) -> usize {
        match self {
            Self::ThreeColumn => 3,
            Self::FourColumn => 4,
        }
    }

    pub fn header(self) -> &'static [&'static str] {
        match self {
            Self::ThreeColumn => &["交易金额", "说明", "交易时间"],
            Self::FourColumn => &["交易金额", "说明", "账户余额", "交易时间"],
        }
    }
}

impl TryFrom<u32> for TableShape {
    type Error = ScraperError;

    fn try_from(column: u32) -> Result<Self, Self::Error> {
        match column {
            3 => Ok(Self::ThreeColumn),
            4 => Ok(Self::FourColumn),
            other => Err(ScraperError::Config(format!(
                "列数は3または4である必要があります: {}",
                other
            ))),
        }
    }
}

/// 検証済みのエクスポート対象
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// ページ番号を付け足すURL（`...?` または `...&` で終わる）
    pub url: String,
    /// 出力ディレクトリ名（`<output>/<name>/`）
    pub name: String,
    pub screen: bool,
    pub parse: bool,
    pub shape: TableShape,
}

impl Target {
    pub fn new(url: impl Into<String>, name: impl Into<String>, shape: TableShape) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            screen: false,
            parse: true,
            shape,
        }
    }

    pub fn with_screen(mut self, screen: bool) -> Self {
        self.screen = screen;
        self
    }

    pub fn with_parse(mut self, parse: bool) -> Self {
        self.parse = parse;
        self
    }

    /// `page` ページ目のURL
    pub fn page_url(&self, page: u32, size: u32) -> String {
        format!("{}page={}&size={}", self.url, page, size)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

impl TargetEntry {
    /// 不正な対象は警告を出して `None` を返す
    pub fn validate(&self) -> Option<Target> {
        if self.url.is_empty() || self.name.is_empty() {
            warn!("Invalid target (empty url or name), ignoring: {:?}", self);
            return None;
        }

        let shape = match TableShape::try_from(self.column) {
            Ok(shape) => shape,
            Err(e) => {
                warn!("Invalid target {}, ignoring: {}", self.name, e);
                return None;
            }
        };

        Some(Target {
            url: self.url.clone(),
            name: self.name.clone(),
            screen: self.screen,
            parse: self.parse,
            shape,
        })
    }
}

/// `config.yaml` の内容
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigFile {
    #[serde(default)]
    pub cookies: Vec<CookieEntry>,
    #[serde(default)]
    pub targets: Vec<TargetEntry>,
    /// 出力ルート（デフォルト: `./lantouzi`）
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub headless: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScraperError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("設定ファイルを読み込めません {:?}: {}", path, e))
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ScraperError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// リクエスト間の固定待機時間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// エクスポートのページ間
    pub page_delay: Duration,
    /// 契約書ダウンロード間
    pub download_delay: Duration,
    /// エクスポート対象間
    pub target_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_millis(500),
            download_delay: Duration::from_secs(1),
            target_delay: Duration::from_secs(1),
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            page_delay: Duration::ZERO,
            download_delay: Duration::ZERO,
            target_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub cookies: Vec<SessionCookie>,
    pub targets: Vec<Target>,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub timeout: Duration,
    pub pacing: Pacing,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            cookies: Vec::new(),
            targets: Vec::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            headless: true,
            timeout: Duration::from_secs(60),
            pacing: Pacing::default(),
        }
    }
}

impl ScraperConfig {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self {
            cookies,
            ..Default::default()
        }
    }

    /// 設定ファイルから組み立てる。クッキーの有効期限は `now` 基準で確定する
    pub fn from_file(file: ConfigFile, now: DateTime<Utc>) -> Result<Self, ScraperError> {
        if file.cookies.is_empty() {
            return Err(ScraperError::Config("クッキーが設定されていません".into()));
        }

        let cookies = file
            .cookies
            .iter()
            .map(|c| c.resolve(now))
            .collect::<Result<Vec<_>, _>>()?;
        let targets: Vec<Target> = file.targets.iter().filter_map(TargetEntry::validate).collect();
        info!(
            "Loaded config: {} cookies, {}/{} valid targets",
            file.cookies.len(),
            targets.len(),
            file.targets.len()
        );

        let mut config = Self::new(cookies).with_targets(targets);
        if let Some(output) = file.output {
            config = config.with_output_dir(output);
        }
        if let Some(headless) = file.headless {
            config = config.with_headless(headless);
        }
        Ok(config)
    }

    /// ファイルパスから読み込む
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScraperError> {
        Self::from_file(ConfigFile::load(path)?, Utc::now())
    }

    pub fn with_targets(mut self, targets: Vec<Target>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn require_cookies(&self) -> Result<(), ScraperError> {
        if self.cookies.is_empty() {
            return Err(ScraperError::Config("クッキーが設定されていません".into()));
        }
        Ok(())
    }

    pub fn require_targets(&self) -> Result<(), ScraperError> {
        if self.targets.is_empty() {
            return Err(ScraperError::Config("エクスポート対象が設定されていません".into()));
        }
        Ok(())
    }

    /// エクスポートでは全クッキーに有効期間が必要
    pub fn require_cookie_expiry(&self) -> Result<(), ScraperError> {
        match self.cookies.iter().find(|c| c.expires.is_none()) {
            Some(cookie) => Err(ScraperError::Config(format!(
                "クッキーの有効期間 (ValidTime) が未設定です: {}",
                cookie.name
            ))),
            None => Ok(()),
        }
    }

    pub fn cookie_header(&self) -> Option<String> {
        cookie_header(&self.cookies)
    }
}

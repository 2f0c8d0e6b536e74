use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("スクリーンショットエラー: {0}")]
    Screenshot(String),

    #[error("HTML抽出エラー: {0}")]
    Extraction(String),

    #[error("ダウンロードエラー: {0}")]
    Download(String),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("設定ファイル解析エラー: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV書き込みエラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),
}

impl ScraperError {
    /// 設定ミスに起因するエラーか（作業開始前に中断すべきもの）
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Yaml(_))
    }
}

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::extract::TransactionRecord;

/// 描画対象ノードの指定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeQuery {
    /// innerHTMLを取り出すノードのCSSセレクタ
    pub selector: &'static str,
    /// 取り出す前に出現を待つノード（指定なしなら `selector` 自身）
    pub wait_for: Option<&'static str>,
}

impl NodeQuery {
    pub const fn new(selector: &'static str) -> Self {
        Self {
            selector,
            wait_for: None,
        }
    }

    pub const fn waiting_for(self, wait_for: &'static str) -> Self {
        Self {
            selector: self.selector,
            wait_for: Some(wait_for),
        }
    }
}

/// クッキー付きでページを描画する
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// `url` を開き、`query` のノードのinnerHTMLを返す
    async fn inner_html(&self, url: &str, query: NodeQuery) -> Result<String, ScraperError>;

    /// `url` を開き、ページ全体のPNGスクリーンショットを返す
    async fn screenshot(&self, url: &str) -> Result<Vec<u8>, ScraperError>;
}

/// テーブルHTMLから固定幅レコードを取り出す
pub trait RecordExtractor: Send + Sync {
    /// 1レコードあたりの列数
    fn columns(&self) -> usize;

    fn extract(&self, html: &str) -> Result<Vec<TransactionRecord>, ScraperError>;
}

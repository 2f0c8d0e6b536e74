//! 契約書ダウンロード
//!
//! 注文一覧 → 注文詳細 → 書類ごとのHTTPダウンロード の2段クロール

mod crawler;
mod fetcher;

pub use crawler::{
    DownloadReport, Downloader, ServiceAgreements, AGREEMENT_DIR, ORDER_DETAIL, ORDER_LIST,
    ORDER_LIST_URL,
};
pub use fetcher::{disposition_filename, AgreementFetcher, FetchOutcome};

//! 懒投资 (lantouzi.com) アカウントのスクレイパーライブラリ
//!
//! - 取引履歴テーブルをページ送りで取得し、CSV・スクリーンショットに保存
//! - 智选服务の注文ごとに契約書をダウンロード
//!
//! # 使用例
//!
//! ```rust,ignore
//! use lantouzi_export::{Job, ScraperConfig, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::load("./config.yaml").unwrap();
//!     let mut service = ScraperService::new(config);
//!
//!     let report = service.call(Job::Export).await.unwrap();
//!     println!("{:?}", report);
//! }
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod extract;
pub mod renderer;
pub mod service;
pub mod store;
pub mod traits;

// 主要な型をリエクスポート
pub use config::{Pacing, ScraperConfig, SessionCookie, TableShape, Target};
pub use download::{DownloadReport, Downloader};
pub use error::ScraperError;
pub use export::{ExportReport, Exporter};
pub use extract::{AgreementItem, ServiceEntry, TransactionRecord};
pub use renderer::ChromiumRenderer;
pub use service::{Job, JobReport, ScraperService};
pub use traits::{NodeQuery, PageRenderer, RecordExtractor};

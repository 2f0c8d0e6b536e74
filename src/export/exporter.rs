//! 取引履歴エクスポート
//!
//! 1ページ目から順に描画→抽出を繰り返し、レコードが0件になったページで止める。
//! サイト側に最終ページの目印は無いので、描画の一時的な失敗で空のテーブルが
//! 返ってきた場合も最終ページとして扱われる。

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{ScraperConfig, Target};
use crate::error::ScraperError;
use crate::extract::{TdTableExtractor, TransactionRecord};
use crate::store;
use crate::traits::{NodeQuery, PageRenderer, RecordExtractor};

/// 1ページあたりの件数
pub const PAGE_SIZE: u32 = 10;

/// 取引履歴テーブル
pub const RECORD_TABLE: NodeQuery = NodeQuery::new(
    "body > div.g-uc-page.clearfix > div.g-uc-main > div > div.bd > div:nth-child(2) > table",
);

/// エクスポート結果
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub target: String,
    /// レコードを含んでいたページ数
    pub pages: u32,
    pub records: usize,
    pub csv_path: Option<PathBuf>,
    pub screenshots: Vec<PathBuf>,
}

/// 1つのエクスポート対象を処理する
pub struct Exporter<'r, R: PageRenderer + ?Sized> {
    renderer: &'r R,
    target: Target,
    output_dir: PathBuf,
    page_delay: Duration,
    extractor: Box<dyn RecordExtractor>,
    records: Vec<TransactionRecord>,
}

impl<'r, R: PageRenderer + ?Sized> Exporter<'r, R> {
    pub fn new(renderer: &'r R, config: &ScraperConfig, target: Target) -> Self {
        let extractor = Box::new(TdTableExtractor::new(target.shape));
        Self {
            renderer,
            output_dir: store::target_dir(&config.output_dir, &target.name),
            page_delay: config.pacing.page_delay,
            target,
            extractor,
            records: Vec::new(),
        }
    }

    /// 抽出方法を差し替える
    pub fn with_extractor(mut self, extractor: Box<dyn RecordExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// これまでに集めたレコード（ヘッダを除く）
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub async fn run(&mut self) -> Result<ExportReport, ScraperError> {
        info!("Exporting {}", self.target);
        self.records.clear();

        let mut report = ExportReport {
            target: self.target.name.clone(),
            ..Default::default()
        };
        let mut page = 1;

        loop {
            let url = self.target.page_url(page, PAGE_SIZE);
            info!("Rendering {}", url);

            let html = self.renderer.inner_html(&url, RECORD_TABLE).await?;
            let records = self.extractor.extract(&html)?;

            if records.is_empty() {
                info!("No records on page {}, reached the last page", page);
                break;
            }

            info!("Got {} records on page {}", records.len(), page);
            self.records.extend(records);
            report.pages += 1;

            if self.target.screen {
                let png = self.renderer.screenshot(&url).await?;
                report
                    .screenshots
                    .push(store::write_screenshot(&self.output_dir, page, &png)?);
            }

            sleep(self.page_delay).await;
            page += 1;
        }

        report.records = self.records.len();

        if self.target.parse {
            let path = store::write_csv(&self.output_dir, self.target.shape.header(), &self.records)?;
            report.csv_path = Some(path);
        }

        info!(
            "Export of {} done: {} pages, {} records",
            self.target.name, report.pages, report.records
        );
        Ok(report)
    }
}

/// 設定された全対象を順にエクスポートする
pub async fn export_targets<R: PageRenderer + ?Sized>(
    renderer: &R,
    config: &ScraperConfig,
) -> Result<Vec<ExportReport>, ScraperError> {
    config.require_cookies()?;
    config.require_cookie_expiry()?;
    config.require_targets()?;

    let mut reports = Vec::with_capacity(config.targets.len());
    for target in &config.targets {
        let mut exporter = Exporter::new(renderer, config, target.clone());
        reports.push(exporter.run().await?);

        sleep(config.pacing.target_delay).await;
    }

    if reports.iter().all(|r| r.records == 0) {
        warn!("No records were exported for any target");
    }
    Ok(reports)
}

//! 智选服务の契約書クロール
//!
//! 注文一覧をページ送りで全件集め、各注文の詳細ページから書類区分ごとの
//! ダウンロードURLを取り出してから、区分ごとのディレクトリに保存する。

use std::path::PathBuf;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::extract::{
    parse_service_detail, parse_service_list, AgreementItem, ServiceDetail, ServiceEntry,
    DEAD_LINK_SUFFIX,
};
use crate::store::path_segment;
use crate::traits::{NodeQuery, PageRenderer};

use super::fetcher::{AgreementFetcher, FetchOutcome};

/// 完了済み注文の一覧（`page=<n>` を付け足す）
pub const ORDER_LIST_URL: &str = "https://lantouzi.com/user/smartbid/order/datalist?status=3&";

pub const ORDER_LIST: NodeQuery =
    NodeQuery::new("body > div.g-uc-page.clearfix > div.g-uc-main > div");

pub const ORDER_DETAIL: NodeQuery =
    NodeQuery::new("body > div.g-uc-page.clearfix.no-side > div > div.uc-order-detail")
        .waiting_for("#buy_prj_relation_list > tr:nth-child(1)");

/// 契約書の保存先 `<output>/合同/`
pub const AGREEMENT_DIR: &str = "合同";

/// 1注文分の書類
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAgreements {
    /// ディレクトリ名（失効リンクは `[死链]` 付き）
    pub name: String,
    pub items: AgreementItem,
    pub dead: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub services: usize,
    pub dead_services: usize,
    pub saved: Vec<PathBuf>,
    pub skipped: usize,
}

pub struct Downloader<'r, R: PageRenderer + ?Sized> {
    renderer: &'r R,
    fetcher: AgreementFetcher,
    root: PathBuf,
    config: ScraperConfig,
}

impl<'r, R: PageRenderer + ?Sized> Downloader<'r, R> {
    pub fn new(renderer: &'r R, config: &ScraperConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            renderer,
            fetcher: AgreementFetcher::new(config)?,
            root: config.output_dir.join(AGREEMENT_DIR),
            config: config.clone(),
        })
    }

    /// 一覧→詳細→ダウンロードを一括実行
    pub async fn run(&self) -> Result<DownloadReport, ScraperError> {
        self.config.require_cookies()?;

        let entries = self.collect_services().await?;

        let mut services = Vec::with_capacity(entries.len());
        for entry in &entries {
            services.push(self.inspect_service(entry).await?);
        }

        self.store(&services).await
    }

    /// 注文一覧を `li` が無くなるまでページ送りして集める
    pub async fn collect_services(&self) -> Result<Vec<ServiceEntry>, ScraperError> {
        let mut services: Vec<ServiceEntry> = Vec::new();
        let mut page = 1;

        loop {
            let url = format!("{}page={}", ORDER_LIST_URL, page);
            info!("Rendering service list {}", url);

            let html = self.renderer.inner_html(&url, ORDER_LIST).await?;
            let listed = parse_service_list(&html)?;

            if listed.list_items == 0 {
                break;
            }

            for entry in listed.services {
                // 同名の注文は後から見つかったURLで上書き
                match services.iter_mut().find(|s| s.name == entry.name) {
                    Some(existing) => existing.detail_url = entry.detail_url,
                    None => services.push(entry),
                }
            }
            page += 1;
        }

        info!("Found {} services", services.len());
        Ok(services)
    }

    /// 詳細ページから書類区分ごとのURLを取り出す
    pub async fn inspect_service(&self, entry: &ServiceEntry) -> Result<ServiceAgreements, ScraperError> {
        info!("Inspecting {} {}", entry.name, entry.detail_url);

        let html = self.renderer.inner_html(&entry.detail_url, ORDER_DETAIL).await?;
        let detail = parse_service_detail(&html).map_err(|e| {
            ScraperError::Extraction(format!("{} ({}): {}", entry.name, entry.detail_url, e))
        })?;

        Ok(match detail {
            ServiceDetail::Dead => {
                warn!("May be an invalid service: {} {}", entry.name, entry.detail_url);
                ServiceAgreements {
                    name: format!("{}{}", entry.name, DEAD_LINK_SUFFIX),
                    items: AgreementItem::new(),
                    dead: true,
                }
            }
            ServiceDetail::Live(items) => ServiceAgreements {
                name: entry.name.clone(),
                items,
                dead: false,
            },
        })
    }

    /// `<合同>/<注文>/<区分>/<連番>_<ファイル名>` に保存する
    pub async fn store(&self, services: &[ServiceAgreements]) -> Result<DownloadReport, ScraperError> {
        let mut report = DownloadReport {
            services: services.len(),
            dead_services: services.iter().filter(|s| s.dead).count(),
            ..Default::default()
        };

        for service in services {
            let service_dir = self.root.join(path_segment(&service.name));
            std::fs::create_dir_all(&service_dir)?;

            for (category, urls) in service.items.iter() {
                let dir = service_dir.join(path_segment(category));
                std::fs::create_dir_all(&dir)?;
                info!("Created {:?}", dir);

                // 連番は空ファイルで飛ばした分も消費する
                for (i, url) in urls.iter().enumerate() {
                    match self.fetcher.fetch(url, &dir, i + 1).await? {
                        FetchOutcome::Saved(path) => report.saved.push(path),
                        FetchOutcome::Skipped => report.skipped += 1,
                    }
                    sleep(self.config.pacing.download_delay).await;
                }
            }
        }

        info!(
            "Download done: {} services ({} dead), {} files saved, {} skipped",
            report.services,
            report.dead_services,
            report.saved.len(),
            report.skipped
        );
        Ok(report)
    }
}

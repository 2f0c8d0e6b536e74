use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::config::ScraperConfig;
use crate::download::{DownloadReport, Downloader};
use crate::error::ScraperError;
use crate::export::{export_targets, ExportReport};
use crate::renderer::ChromiumRenderer;
use crate::traits::PageRenderer;

/// 実行するジョブ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// 設定された全対象の取引履歴をエクスポート
    Export,
    /// 全注文の契約書をダウンロード
    Download,
}

/// ジョブの実行結果
#[derive(Debug)]
pub enum JobReport {
    Export(Vec<ExportReport>),
    Download(DownloadReport),
}

/// ブラウザを起動する前に設定を確認する
pub fn preflight(config: &ScraperConfig, job: Job) -> Result<(), ScraperError> {
    config.require_cookies()?;
    if job == Job::Export {
        config.require_cookie_expiry()?;
        config.require_targets()?;
    }
    Ok(())
}

/// 描画済みのレンダラでジョブを実行する
pub async fn run_job<R: PageRenderer + ?Sized>(
    renderer: &R,
    config: &ScraperConfig,
    job: Job,
) -> Result<JobReport, ScraperError> {
    match job {
        Job::Export => Ok(JobReport::Export(export_targets(renderer, config).await?)),
        Job::Download => {
            let downloader = Downloader::new(renderer, config)?;
            Ok(JobReport::Download(downloader.run().await?))
        }
    }
}

/// tower::Serviceを実装したスクレイパーサービス
#[derive(Debug, Clone)]
pub struct ScraperService {
    config: ScraperConfig,
}

impl ScraperService {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }
}

impl Service<Job> for ScraperService {
    type Response = JobReport;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, job: Job) -> Self::Future {
        info!("Job received: {:?}", job);
        let config = self.config.clone();

        Box::pin(async move {
            preflight(&config, job)?;

            let mut renderer = ChromiumRenderer::new(&config);
            if let Err(e) = renderer.initialize().await {
                renderer.close().await?;
                return Err(e);
            }

            let result = run_job(&renderer, &config, job).await;

            // 失敗時もブラウザは閉じる
            renderer.close().await?;

            let report = result?;
            info!("Job finished: {:?}", job);
            Ok(report)
        })
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tower::Service;
use tracing::{error, info};

use lantouzi_export::config::DEFAULT_CONFIG_PATH;
use lantouzi_export::{Job, JobReport, ScraperConfig, ScraperService};

#[derive(Parser, Debug)]
#[command(name = "ltz", version, about = "lantouzi.com export tools")]
struct Cli {
    /// 設定ファイル
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Export lantouzi.com account's records
    Export,
    /// Download lantouzi.com account's agreements
    Download,
}

impl From<Command> for Job {
    fn from(command: Command) -> Self {
        match command {
            Command::Export => Job::Export,
            Command::Download => Job::Download,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match ScraperConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Load config {:?} failed: {}", cli.config, e);
            return ExitCode::FAILURE;
        }
    };

    let mut service = ScraperService::new(config);
    match service.call(cli.command.into()).await {
        Ok(JobReport::Export(reports)) => {
            for report in reports {
                info!(
                    "{}: {} records, csv={:?}, screenshots={}",
                    report.target,
                    report.records,
                    report.csv_path,
                    report.screenshots.len()
                );
            }
            ExitCode::SUCCESS
        }
        Ok(JobReport::Download(report)) => {
            info!(
                "{} services, {} files saved, {} skipped",
                report.services,
                report.saved.len(),
                report.skipped
            );
            ExitCode::SUCCESS
        }
        Err(e) if e.is_config() => {
            error!("Invalid config: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:?} run failed: {}", cli.command, e);
            ExitCode::FAILURE
        }
    }
}

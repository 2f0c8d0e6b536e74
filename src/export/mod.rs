//! 取引履歴のエクスポート（CSV・スクリーンショット）

mod exporter;

pub use exporter::{export_targets, ExportReport, Exporter, PAGE_SIZE, RECORD_TABLE};

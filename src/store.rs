//! エクスポート結果の書き出し（CSV・ページごとのスクリーンショット）

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ScraperError;
use crate::extract::TransactionRecord;

/// Excelで文字化けしないよう先頭に付けるBOM
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const RECORD_FILE_NAME: &str = "record.csv";

/// 対象ごとの出力ディレクトリ `<root>/<name>/`
pub fn target_dir(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

/// ページ上の文字列を1階層分のディレクトリ名にする
///
/// 区切り文字は `_` に置き換え、`.` や `..` だけの名前は使わない。
pub fn path_segment(name: &str) -> String {
    let segment: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();

    match segment.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => segment,
    }
}

/// BOM・ヘッダ・全レコードをCSVに書き出す
pub fn write_csv(
    dir: &Path,
    header: &[&str],
    records: &[TransactionRecord],
) -> Result<PathBuf, ScraperError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(RECORD_FILE_NAME);

    let mut file = File::create(&path)?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(header)?;
    for record in records {
        writer.write_record(record.fields())?;
    }
    writer.flush()?;

    info!("Wrote {} records to {:?}", records.len(), path);
    Ok(path)
}

/// `page-<n>.png` を書き出す
pub fn write_screenshot(dir: &Path, page: u32, png: &[u8]) -> Result<PathBuf, ScraperError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("page-{}.png", page));
    fs::write(&path, png)?;

    info!("Stored screenshot {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> TransactionRecord {
        TransactionRecord::new(fields.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_write_csv_with_bom() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = target_dir(tmp.path(), "账户/资金记录");
        let records = vec![record(&["+1.00", "利息, 到账", "2018-01-01"])];

        let path = write_csv(&dir, &["交易金额", "说明", "交易时间"], &records).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["交易金额,说明,交易时间", "+1.00,\"利息, 到账\",2018-01-01"]
        );
        assert_eq!(path, tmp.path().join("账户/资金记录/record.csv"));
    }

    #[test]
    fn test_write_csv_truncates_previous_file() {
        let tmp = tempfile::tempdir().unwrap();
        let long: Vec<_> = (0..10).map(|i| record(&[&i.to_string()])).collect();
        write_csv(tmp.path(), &["a"], &long).unwrap();
        let path = write_csv(tmp.path(), &["a"], &[]).unwrap();

        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines, vec!["a"]);
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("智选服务6月期D10482"), "智选服务6月期D10482");
        assert_eq!(path_segment("../../etc"), ".._.._etc");
        assert_eq!(path_segment("借款/协议\\附件"), "借款_协议_附件");
        assert_eq!(path_segment(".."), "_");
        assert_eq!(path_segment("  "), "_");
        assert_eq!(Path::new(&path_segment("../x")).components().count(), 1);
    }

    #[test]
    fn test_write_screenshot() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_screenshot(tmp.path(), 3, b"\x89PNG").unwrap();
        assert_eq!(path.file_name().unwrap(), "page-3.png");
        assert_eq!(fs::read(path).unwrap(), b"\x89PNG");
    }
}

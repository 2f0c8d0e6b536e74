//! 取引履歴テーブルの抽出（正規表現ベース）
//!
//! `<td ...>内容</td>` を非貪欲マッチで順に拾い、入れ子のタグを除去したうえで
//! 列数ごとに1レコードへまとめる。列数で割り切れない末尾のセルは捨てる。

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::config::TableShape;
use crate::error::ScraperError;
use crate::traits::RecordExtractor;

fn td_pattern() -> &'static Regex {
    static TD: OnceLock<Regex> = OnceLock::new();
    TD.get_or_init(|| {
        Regex::new(r"(?s)<td[^>]*>\s*(.*?)\s*</td[^>]*>").expect("td regex is valid")
    })
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"))
}

/// 取引履歴の1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord(Vec<String>);

impl TransactionRecord {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_fields(self) -> Vec<String> {
        self.0
    }
}

/// タグを除去して前後の空白を落とす
pub fn strip_tags(raw: &str) -> String {
    tag_pattern().replace_all(raw, "").trim().to_string()
}

/// テーブルHTMLのセル値を出現順に返す
pub fn table_cells(html: &str) -> impl Iterator<Item = String> + '_ {
    td_pattern()
        .captures_iter(html)
        .map(|caps| strip_tags(caps.get(1).map_or("", |m| m.as_str())))
}

/// セル列を固定幅レコードにまとめるイテレータ
pub struct Records<I> {
    cells: I,
    width: usize,
    dropped: usize,
}

impl<I: Iterator<Item = String>> Records<I> {
    pub fn new(cells: I, width: usize) -> Self {
        Self {
            cells,
            width,
            dropped: 0,
        }
    }

    /// 末尾で捨てたセル数（走査し終えた後に有効）
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<I: Iterator<Item = String>> Iterator for Records<I> {
    type Item = TransactionRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.width == 0 {
            return None;
        }

        let fields: Vec<String> = self.cells.by_ref().take(self.width).collect();
        if fields.len() < self.width {
            self.dropped = fields.len();
            return None;
        }
        Some(TransactionRecord(fields))
    }
}

/// `<td>` セルを列数ごとにまとめる抽出器
#[derive(Debug, Clone, Copy)]
pub struct TdTableExtractor {
    shape: TableShape,
}

impl TdTableExtractor {
    pub fn new(shape: TableShape) -> Self {
        Self { shape }
    }
}

impl RecordExtractor for TdTableExtractor {
    fn columns(&self) -> usize {
        self.shape.columns()
    }

    fn extract(&self, html: &str) -> Result<Vec<TransactionRecord>, ScraperError> {
        let mut records = Records::new(table_cells(html), self.columns());
        let out: Vec<TransactionRecord> = records.by_ref().collect();

        // TODO: 実サイトの表構造を確認したうえで、端数セルをエラー扱いにするか決める
        if records.dropped() > 0 {
            debug!(
                "Dropped {} trailing cells that do not fill a {}-column record",
                records.dropped(),
                self.columns()
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<tbody>
  <tr>
    <td class="amount">+100.00</td>
    <td><a href="/user/smartbid/order/detail?id=1">智选服务加入</a></td>
    <td>1,100.00</td>
    <td>2018-09-01 10:00</td>
  </tr>
  <tr>
    <td class="amount">-50.00</td>
    <td>
      提现
    </td>
    <td>1,050.00</td>
    <td>2018-09-02 11:30</td>
  </tr>
</tbody>
"#;

    fn cells(n: usize) -> String {
        (0..n).map(|i| format!("<td>c{}</td>", i)).collect()
    }

    #[test]
    fn test_extract_four_column_rows() {
        let records = TdTableExtractor::new(TableShape::FourColumn)
            .extract(PAGE)
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].fields(),
            ["+100.00", "智选服务加入", "1,100.00", "2018-09-01 10:00"]
        );
        assert_eq!(records[1].fields()[1], "提现");
    }

    #[test]
    fn test_nested_tags_are_stripped() {
        let html = r#"<td> <a href="/x"><span>借款</span>协议</a> </td>"#;
        let cells: Vec<String> = table_cells(html).collect();
        assert_eq!(cells, vec!["借款协议".to_string()]);
        assert_eq!(strip_tags(&cells[0]), cells[0]);
    }

    #[test]
    fn test_record_count_is_floor_of_cells_over_width() {
        for shape in [TableShape::ThreeColumn, TableShape::FourColumn] {
            let extractor = TdTableExtractor::new(shape);
            for m in 0..=13 {
                let records = extractor.extract(&cells(m)).unwrap();
                assert_eq!(records.len(), m / shape.columns(), "m={} c={}", m, shape.columns());
                assert!(records.iter().all(|r| r.len() == shape.columns()));
            }
        }
    }

    #[test]
    fn test_trailing_partial_record_is_dropped() {
        let html = cells(7);
        let mut records = Records::new(table_cells(&html), 3);
        let collected: Vec<_> = records.by_ref().collect();

        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1].fields(), ["c3", "c4", "c5"]);
        assert_eq!(records.dropped(), 1);
    }

    #[test]
    fn test_empty_table_yields_no_records() {
        let records = TdTableExtractor::new(TableShape::ThreeColumn)
            .extract("<table><tbody></tbody></table>")
            .unwrap();
        assert!(records.is_empty());
    }
}

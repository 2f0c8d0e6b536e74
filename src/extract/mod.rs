//! HTML抽出
//!
//! - `table`: 取引履歴テーブル（正規表現でセルを拾う）
//! - `order`: 智选服务の注文一覧・詳細（CSSセレクタ）

mod order;
mod table;

pub use order::{
    absolutize, parse_service_detail, parse_service_list, AgreementItem, ServiceDetail,
    ServiceEntry, ServiceListPage, DEAD_LINK_SUFFIX, DEAD_SERVICE_TITLE, SERVICE_AGREEMENT,
    SITE_ORIGIN,
};
pub use table::{strip_tags, table_cells, Records, TdTableExtractor, TransactionRecord};

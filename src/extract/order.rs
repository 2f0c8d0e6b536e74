//! 智选服务の注文一覧・詳細ページの抽出（セレクタベース）

use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;

pub const SITE_ORIGIN: &str = "https://lantouzi.com";

/// 失効した注文の詳細ページに出る汎用タイトル
pub const DEAD_SERVICE_TITLE: &str = "智选服务";
pub const DEAD_LINK_SUFFIX: &str = "[死链]";
pub const SERVICE_AGREEMENT: &str = "服务协议";

fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css)
        .map_err(|e| ScraperError::Extraction(format!("セレクタ解析エラー {}: {:?}", css, e)))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// 相対パスをサイトの絶対URLにする
pub fn absolutize(href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}{}", SITE_ORIGIN, href)
    }
}

/// 注文一覧の1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub name: String,
    pub detail_url: String,
}

/// 注文一覧1ページ分
#[derive(Debug, Clone, Default)]
pub struct ServiceListPage {
    /// ページ内の `li` の数（0なら最終ページの先）
    pub list_items: usize,
    pub services: Vec<ServiceEntry>,
}

/// 注文一覧のHTMLから名前と詳細URLを取り出す
pub fn parse_service_list(html: &str) -> Result<ServiceListPage, ScraperError> {
    let document = Html::parse_document(html);
    let li_sel = selector("li")?;
    let name_sel = selector(r#"div[class="name"]:first-child"#)?;
    let link_sel = selector(r#"a[class~="actionBtn"]"#)?;

    let mut page = ServiceListPage::default();
    for li in document.select(&li_sel) {
        page.list_items += 1;

        let name = li.select(&name_sel).last().map(text_of).unwrap_or_default();
        let url = li
            .select(&link_sel)
            .filter_map(|a| a.value().attr("href"))
            .last()
            .map(|href| href.trim().to_string())
            .unwrap_or_default();

        if name.is_empty() || url.is_empty() {
            continue;
        }

        page.services.push(ServiceEntry {
            name,
            detail_url: absolutize(&url),
        });
    }

    Ok(page)
}

/// 書類区分 → ダウンロードURL の順序付きマップ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgreementItem {
    entries: Vec<(String, Vec<String>)>,
}

impl AgreementItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// 区分を空にして開始する。既存の区分は位置を保ったまま空に戻す
    pub fn start_category(&mut self, name: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some((_, urls)) => urls.clear(),
            None => self.entries.push((name.to_string(), Vec::new())),
        }
    }

    /// 既存の区分にURLを追加する。区分が無ければ何もしない
    pub fn push_url(&mut self, name: &str, url: String) -> bool {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some((_, urls)) => {
                urls.push(url);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, urls)| urls.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, urls)| (k.as_str(), urls.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn url_count(&self) -> usize {
        self.entries.iter().map(|(_, urls)| urls.len()).sum()
    }
}

/// 詳細ページの解析結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceDetail {
    /// 汎用タイトルしか出ない失効リンク
    Dead,
    Live(AgreementItem),
}

/// 注文詳細のHTMLから書類区分ごとのダウンロードURLを取り出す
pub fn parse_service_detail(html: &str) -> Result<ServiceDetail, ScraperError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector(r#"a[class="a-title"]"#)?)
        .last()
        .map(text_of)
        .unwrap_or_default();

    if title.is_empty() {
        return Err(ScraperError::Extraction("タイトルが取得できません".into()));
    }
    if title == DEAD_SERVICE_TITLE {
        return Ok(ServiceDetail::Dead);
    }

    let mut item = AgreementItem::new();

    for link in document.select(&selector(r#"div[class="clearfix"] a"#)?) {
        if text_of(link) != SERVICE_AGREEMENT {
            continue;
        }
        if let Some(href) = link.value().attr("href") {
            item.start_category(SERVICE_AGREEMENT);
            item.push_url(SERVICE_AGREEMENT, absolutize(href));
        }
    }

    let row_sel = selector("#buy_prj_relation_list > tr")?;
    let td_sel = selector("td")?;
    let doc_link_sel = selector(r#"div[class="details-panel"] td a"#)?;

    for row in document.select(&row_sel) {
        // 2列目が書類区分名
        let name = row.select(&td_sel).nth(1).map(text_of).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        item.start_category(&name);

        for link in row.select(&doc_link_sel) {
            if let Some(href) = link.value().attr("href") {
                item.push_url(&name, absolutize(href));
            }
        }
    }

    Ok(ServiceDetail::Live(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_PAGE: &str = r#"
<div>
  <ul>
    <li>
      <div class="name">智选服务6月期D10482</div>
      <div class="info">12,000.00</div>
      <a class="btn actionBtn" href="/user/smartbid/order/detail?id=ltz5baf814f22b75181&smb_type=1">详情</a>
    </li>
    <li>
      <div class="name">智选服务12月期D20001</div>
      <a class="actionBtn" href="https://lantouzi.com/user/smartbid/order/detail?id=ltz2">详情</a>
    </li>
    <li>
      <div class="name">   </div>
      <a class="actionBtn" href="/user/smartbid/order/detail?id=ltz3">详情</a>
    </li>
  </ul>
</div>
"#;

    const DETAIL_PAGE: &str = r#"
<div class="uc-order-detail">
  <div class="hd"><a class="a-title" href="/smartbid">智选服务6月期D10482</a></div>
  <div class="clearfix">
    <a href="/user/smartbid/agreement?id=1">服务协议</a>
    <a href="/help">帮助</a>
  </div>
  <table>
    <tbody id="buy_prj_relation_list">
      <tr>
        <td>1</td>
        <td> 借款协议 </td>
        <td>
          <div class="details-panel">
            <table><tr>
              <td><a href="/user/contract/download?id=11">下载</a></td>
              <td><a href="/user/contract/download?id=12">下载</a></td>
            </tr></table>
          </div>
        </td>
      </tr>
      <tr>
        <td>2</td>
        <td>债权转让协议</td>
        <td><div class="details-panel"><table><tr><td><a href="/user/contract/download?id=21">下载</a></td></tr></table></div></td>
      </tr>
      <tr>
        <td>3</td>
        <td></td>
        <td><div class="details-panel"><table><tr><td><a href="/user/contract/download?id=31">下载</a></td></tr></table></div></td>
      </tr>
    </tbody>
  </table>
</div>
"#;

    #[test]
    fn test_parse_service_list() {
        let page = parse_service_list(LIST_PAGE).unwrap();

        assert_eq!(page.list_items, 3);
        assert_eq!(page.services.len(), 2);
        assert_eq!(page.services[0].name, "智选服务6月期D10482");
        assert_eq!(
            page.services[0].detail_url,
            "https://lantouzi.com/user/smartbid/order/detail?id=ltz5baf814f22b75181&smb_type=1"
        );
        assert_eq!(
            page.services[1].detail_url,
            "https://lantouzi.com/user/smartbid/order/detail?id=ltz2"
        );
    }

    #[test]
    fn test_empty_list_page() {
        let page = parse_service_list("<div><p>暂无数据</p></div>").unwrap();
        assert_eq!(page.list_items, 0);
        assert!(page.services.is_empty());
    }

    #[test]
    fn test_parse_service_detail() {
        let item = match parse_service_detail(DETAIL_PAGE).unwrap() {
            ServiceDetail::Live(item) => item,
            ServiceDetail::Dead => panic!("expected live service"),
        };

        let keys: Vec<&str> = item.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![SERVICE_AGREEMENT, "借款协议", "债权转让协议"]);
        assert_eq!(
            item.get(SERVICE_AGREEMENT).unwrap(),
            ["https://lantouzi.com/user/smartbid/agreement?id=1"]
        );
        assert_eq!(
            item.get("借款协议").unwrap(),
            [
                "https://lantouzi.com/user/contract/download?id=11",
                "https://lantouzi.com/user/contract/download?id=12"
            ]
        );
        assert_eq!(item.url_count(), 4);
    }

    #[test]
    fn test_dead_service_title() {
        let html = r#"<div><a class="a-title">智选服务</a><table><tbody id="buy_prj_relation_list"><tr><td>1</td><td>借款协议</td></tr></tbody></table></div>"#;
        assert_eq!(parse_service_detail(html).unwrap(), ServiceDetail::Dead);
    }

    #[test]
    fn test_missing_title_is_error() {
        let err = parse_service_detail("<div><p>loading</p></div>").unwrap_err();
        assert!(matches!(err, ScraperError::Extraction(_)));
    }

    #[test]
    fn test_live_service_without_documents() {
        let html = r#"<div><a class="a-title">智选服务6月期D1</a></div>"#;
        assert_eq!(
            parse_service_detail(html).unwrap(),
            ServiceDetail::Live(AgreementItem::new())
        );
    }

    #[test]
    fn test_repeated_category_resets_urls_in_place() {
        let mut item = AgreementItem::new();
        item.start_category("a");
        item.push_url("a", "u1".into());
        item.start_category("b");
        item.start_category("a");
        item.push_url("a", "u2".into());

        let keys: Vec<&str> = item.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(item.get("a").unwrap(), ["u2"]);
        assert!(!item.push_url("missing", "u3".into()));
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(absolutize("/a?b=1"), "https://lantouzi.com/a?b=1");
        assert_eq!(absolutize(" https://x.test/a "), "https://x.test/a");
    }
}

//! Candidate sources - tabs, bookmarks and history / 候选来源
//!
//! The browser is reached through [`BrowserProvider`]; this module turns its
//! raw records into displayable options. Entries without a parseable URL
//! never leave this module.

use async_trait::async_trait;
use anyhow::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::SourceConfig;
use crate::models::{PageOption, SwitchOption, TabOption};
use crate::search::tokenize;

const UNTITLED: &str = "Untitled";

/// URL prefixes of browser-internal pages / 浏览器内部页面前缀
const SYSTEM_PROTOCOLS: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "edge://",
    "brave://",
    "about:",
    "chrome-search://",
    "chrome-untrusted://",
    "browser://",
    "moz-extension://",
    "firefox:",
];

/// Tab as reported by the browser / 浏览器标签页
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserTab {
    pub id: Option<i64>,
    pub index: usize,
    pub title: Option<String>,
    pub url: Option<String>,
    pub fav_icon_url: Option<String>,
    pub active: bool,
    /// Milliseconds since epoch / 最后访问时间（毫秒）
    pub last_accessed: i64,
}

/// Bookmark node; folders have no URL / 书签节点
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkNode {
    pub title: Option<String>,
    pub url: Option<String>,
}

/// History entry / 历史记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryItem {
    pub title: Option<String>,
    pub url: Option<String>,
    /// Milliseconds since epoch / 最后访问时间（毫秒）
    pub last_visit_time: i64,
    pub visit_count: u32,
}

/// History lookup parameters / 历史记录查询参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub text: String,
    pub max_results: usize,
    /// Milliseconds since epoch / 起始时间（毫秒）
    pub start_time: i64,
}

/// Browser collaborator / 浏览器接口
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    /// Tabs of the current window / 当前窗口的标签页
    async fn current_window_tabs(&self) -> Result<Vec<BrowserTab>>;

    async fn bookmarks(&self) -> Result<Vec<BookmarkNode>>;

    async fn search_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryItem>>;
}

/// Check whether a URL belongs to a browser-internal page / 是否为系统页面
pub fn is_system_page(url: &str) -> bool {
    let lower = url.to_lowercase();
    SYSTEM_PROTOCOLS.iter().any(|p| lower.starts_with(p))
}

fn valid_url(url: Option<&str>) -> Option<String> {
    let url = url?;
    match Url::parse(url) {
        Ok(_) => Some(url.to_string()),
        Err(e) => {
            tracing::debug!("Dropping candidate with invalid URL {:?}: {}", url, e);
            None
        }
    }
}

fn title_or_default(title: Option<&str>) -> String {
    match title {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => UNTITLED.to_string(),
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Inactive, non-system tabs, most recently used first / 标签页选项
pub fn tab_options(mut tabs: Vec<BrowserTab>) -> Vec<SwitchOption> {
    tabs.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));

    tabs.into_iter()
        .filter(|tab| !tab.active)
        .filter_map(|tab| {
            let tab_id = tab.id?;
            let url = valid_url(tab.url.as_deref())?;
            if is_system_page(&url) {
                return None;
            }
            Some(SwitchOption::Tab(TabOption {
                id: new_id(),
                tab_id,
                title: title_or_default(tab.title.as_deref()),
                url,
                fav_icon_url: tab.fav_icon_url,
                favicon_data: String::new(),
                action_text: "Switch to Tab".to_string(),
            }))
        })
        .collect()
}

/// Bookmarks that carry a URL / 书签选项
pub fn bookmark_options(bookmarks: Vec<BookmarkNode>) -> Vec<SwitchOption> {
    bookmarks
        .into_iter()
        .filter_map(|bookmark| {
            let url = valid_url(bookmark.url.as_deref())?;
            Some(SwitchOption::Bookmark(PageOption {
                id: new_id(),
                title: title_or_default(bookmark.title.as_deref()),
                url,
                favicon_data: String::new(),
                action_text: "Open Bookmark".to_string(),
            }))
        })
        .collect()
}

/// History entries, latest visit first / 历史记录选项
pub fn history_options(mut history: Vec<HistoryItem>) -> Vec<SwitchOption> {
    history.sort_by(|a, b| {
        b.last_visit_time
            .cmp(&a.last_visit_time)
            .then_with(|| b.visit_count.cmp(&a.visit_count))
    });

    history
        .into_iter()
        .filter_map(|item| {
            let url = valid_url(item.url.as_deref())?;
            Some(SwitchOption::History(PageOption {
                id: new_id(),
                title: title_or_default(item.title.as_deref()),
                url,
                favicon_data: String::new(),
                action_text: "Open Page".to_string(),
            }))
        })
        .collect()
}

/// Look up history once per query token / 按查询词检索历史记录
///
/// Numeric tokens are kept here, unlike title indexing. A failed lookup
/// only loses the hits of its own token.
pub async fn fetch_history<P: BrowserProvider + ?Sized>(
    provider: &P,
    term: &str,
    config: &SourceConfig,
) -> Vec<HistoryItem> {
    let tokens = tokenize(term);
    if tokens.is_empty() {
        return Vec::new();
    }

    let start_time =
        (chrono::Utc::now() - chrono::Duration::days(config.history_days)).timestamp_millis();
    let queries: Vec<HistoryQuery> = tokens
        .into_iter()
        .map(|text| HistoryQuery {
            text,
            max_results: config.history_max_results,
            start_time,
        })
        .collect();

    let results = join_all(queries.iter().map(|q| provider.search_history(q))).await;

    let mut items = Vec::new();
    for (query, result) in queries.iter().zip(results) {
        match result {
            Ok(hits) => items.extend(hits),
            Err(e) => tracing::warn!("Failed to search history for '{}': {}", query.text, e),
        }
    }
    items
}

/// Fetch all candidates concurrently / 并发获取所有候选
///
/// A failing source contributes nothing.
pub async fn fetch_candidates<P: BrowserProvider + ?Sized>(
    provider: &P,
    term: &str,
    config: &SourceConfig,
) -> Vec<SwitchOption> {
    let (tabs, bookmarks, history) = tokio::join!(
        provider.current_window_tabs(),
        provider.bookmarks(),
        fetch_history(provider, term, config),
    );

    let mut options = Vec::new();
    match tabs {
        Ok(tabs) => options.extend(tab_options(tabs)),
        Err(e) => tracing::warn!("Failed to load tabs: {}", e),
    }
    match bookmarks {
        Ok(bookmarks) => options.extend(bookmark_options(bookmarks)),
        Err(e) => tracing::warn!("Failed to load bookmarks: {}", e),
    }
    options.extend(history_options(history));

    tracing::debug!("Fetched {} candidates for '{}'", options.len(), term);
    options
}

/// In-memory browser state, used by the CLI and tests / 内存中的浏览器快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSnapshot {
    pub tabs: Vec<BrowserTab>,
    pub bookmarks: Vec<BookmarkNode>,
    pub history: Vec<HistoryItem>,
}

#[async_trait]
impl BrowserProvider for BrowserSnapshot {
    async fn current_window_tabs(&self) -> Result<Vec<BrowserTab>> {
        Ok(self.tabs.clone())
    }

    async fn bookmarks(&self) -> Result<Vec<BookmarkNode>> {
        Ok(self.bookmarks.clone())
    }

    /// Case-insensitive substring match on title or URL / 标题或地址包含查询词
    async fn search_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryItem>> {
        let needle = query.text.to_lowercase();
        Ok(self
            .history
            .iter()
            .filter(|item| item.last_visit_time >= query.start_time)
            .filter(|item| {
                let title = item.title.as_deref().unwrap_or_default().to_lowercase();
                let url = item.url.as_deref().unwrap_or_default().to_lowercase();
                title.contains(&needle) || url.contains(&needle)
            })
            .take(query.max_results)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn history_item(title: &str, url: &str, last_visit_time: i64, visit_count: u32) -> HistoryItem {
        HistoryItem {
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            last_visit_time,
            visit_count,
        }
    }

    fn bookmark(title: &str, url: Option<&str>) -> BookmarkNode {
        BookmarkNode {
            title: Some(title.to_string()),
            url: url.map(str::to_string),
        }
    }

    fn tab(id: i64, title: &str, url: &str, last_accessed: i64) -> BrowserTab {
        BrowserTab {
            id: Some(id),
            index: id as usize,
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            last_accessed,
            ..BrowserTab::default()
        }
    }

    #[test]
    fn test_system_pages() {
        assert!(is_system_page("chrome://settings"));
        assert!(is_system_page("CHROME-EXTENSION://abc/popup.html"));
        assert!(is_system_page("about:blank"));
        assert!(is_system_page("moz-extension://x"));
        assert!(!is_system_page("https://example.com/about:"));
    }

    #[test]
    fn test_tab_options_filter_and_order() {
        let mut active = tab(4, "Active", "https://active.example.com/", 999);
        active.active = true;
        let tabs = vec![
            tab(1, "Old", "https://old.example.com/", 10),
            tab(2, "Settings", "chrome://settings", 50),
            tab(3, "", "https://new.example.com/", 30),
            active,
            BrowserTab {
                id: None,
                url: Some("https://noid.example.com/".into()),
                ..BrowserTab::default()
            },
            tab(5, "Broken", "not a url", 40),
        ];

        let options = tab_options(tabs);
        let titles: Vec<String> = options
            .iter()
            .map(|o| match o {
                SwitchOption::Tab(t) => t.title.clone(),
                _ => panic!("expected tab"),
            })
            .collect();
        assert_eq!(titles, vec!["Untitled", "Old"]);
    }

    #[test]
    fn test_candidate_ids_are_unique() {
        let bookmarks = vec![
            bookmark("A", Some("https://a.example.com/")),
            bookmark("Folder", None),
            bookmark("A", Some("https://a.example.com/")),
        ];
        let options = bookmark_options(bookmarks);
        assert_eq!(options.len(), 2);
        assert_ne!(options[0].id(), options[1].id());
    }

    #[test]
    fn test_history_order() {
        let history = vec![
            history_item("a", "https://a.com/", 10, 1),
            history_item("b", "https://b.com/", 20, 1),
            history_item("c", "https://c.com/", 20, 5),
        ];
        let options = history_options(history);
        let urls: Vec<&str> = options.iter().filter_map(|o| o.url()).collect();
        assert_eq!(urls, vec!["https://c.com/", "https://b.com/", "https://a.com/"]);
    }

    #[tokio::test]
    async fn test_fetch_history_per_token() {
        let snapshot = BrowserSnapshot {
            history: vec![
                history_item("Rust 2024 edition", "https://blog.rust-lang.org/", now_ms(), 3),
                history_item("Ancient", "https://rust.example.com/", 0, 9),
            ],
            ..BrowserSnapshot::default()
        };
        let config = SourceConfig::default();

        assert!(fetch_history(&snapshot, "  ", &config).await.is_empty());
        // 数字词也会参与历史检索
        let items = fetch_history(&snapshot, "2024", &config).await;
        assert_eq!(items.len(), 1);
        let items = fetch_history(&snapshot, "rust", &config).await;
        assert_eq!(items.len(), 1, "entries older than the window are ignored");
    }

    struct FailingTabs(BrowserSnapshot);

    #[async_trait]
    impl BrowserProvider for FailingTabs {
        async fn current_window_tabs(&self) -> Result<Vec<BrowserTab>> {
            Err(anyhow::anyhow!("tabs permission denied"))
        }

        async fn bookmarks(&self) -> Result<Vec<BookmarkNode>> {
            self.0.bookmarks().await
        }

        async fn search_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryItem>> {
            self.0.search_history(query).await
        }
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let provider = FailingTabs(BrowserSnapshot {
            bookmarks: vec![bookmark("Docs", Some("https://docs.rs/"))],
            ..BrowserSnapshot::default()
        });
        let options = fetch_candidates(&provider, "docs", &SourceConfig::default()).await;
        assert_eq!(options.len(), 1);
        assert!(matches!(options[0], SwitchOption::Bookmark(_)));
    }

    /// History lookups for one word always fail / 指定词的历史检索失败
    struct FailingWord {
        snapshot: BrowserSnapshot,
        word: &'static str,
    }

    #[async_trait]
    impl BrowserProvider for FailingWord {
        async fn current_window_tabs(&self) -> Result<Vec<BrowserTab>> {
            self.snapshot.current_window_tabs().await
        }

        async fn bookmarks(&self) -> Result<Vec<BookmarkNode>> {
            self.snapshot.bookmarks().await
        }

        async fn search_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryItem>> {
            if query.text == self.word {
                return Err(anyhow::anyhow!("history backend unavailable"));
            }
            self.snapshot.search_history(query).await
        }
    }

    #[tokio::test]
    async fn test_failing_history_word_keeps_other_words() {
        let provider = FailingWord {
            snapshot: BrowserSnapshot {
                history: vec![
                    history_item("Tokio tutorial", "https://tokio.rs/tokio/tutorial", now_ms(), 2),
                    history_item("Serde guide", "https://serde.rs/", now_ms(), 1),
                ],
                ..BrowserSnapshot::default()
            },
            word: "serde",
        };

        let items = fetch_history(&provider, "tokio serde", &SourceConfig::default()).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url.as_deref(), Some("https://tokio.rs/tokio/tutorial"));

        let options = fetch_candidates(&provider, "tokio serde", &SourceConfig::default()).await;
        assert_eq!(options.len(), 1);
        assert!(matches!(options[0], SwitchOption::History(_)));
    }
}

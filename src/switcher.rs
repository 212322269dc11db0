//! Switch pipeline - candidates → ranking → display list / 切换流程
//!
//! One call per keystroke: fetch the three sources, rank them, cap the list
//! (or append a web search command when it is short) and resolve favicons.
//! Favicons are resolved after ranking so that slow icon lookups never
//! delay the ordering.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::config::AppConfig;
use crate::favicon::{FaviconResolver, DEFAULT_FAVICON};
use crate::models::{CandidateRecord, SelectionAction, SessionContext, SwitchOption};
use crate::search::search_with;
use crate::sources::{fetch_candidates, BrowserProvider};

/// Command palette backend / 命令面板后端
pub struct Switcher {
    provider: Arc<dyn BrowserProvider>,
    favicons: Arc<dyn FaviconResolver>,
    config: AppConfig,
}

impl Switcher {
    pub fn new(
        provider: Arc<dyn BrowserProvider>,
        favicons: Arc<dyn FaviconResolver>,
        config: AppConfig,
    ) -> Self {
        Self {
            provider,
            favicons,
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Options to display for the current input / 获取当前输入的候选项
    pub async fn get_switch_options(&self, term: &str) -> Vec<SwitchOption> {
        let options = fetch_candidates(self.provider.as_ref(), term, &self.config.sources).await;
        let mut results = rank_options(options, term, &self.config);
        self.populate_favicons(&mut results).await;

        tracing::debug!("'{}' -> {} options", term, results.len());
        results
    }

    /// Fill every option's favicon concurrently / 并发填充图标
    pub async fn populate_favicons(&self, options: &mut [SwitchOption]) {
        let resolved = join_all(options.iter().map(|option| self.favicon_for(option))).await;
        for (option, data) in options.iter_mut().zip(resolved) {
            if let Some(data) = data {
                option.set_favicon(data);
            }
        }
    }

    async fn favicon_for(&self, option: &SwitchOption) -> Option<String> {
        let url = option.url()?;
        if let Some(data) = self.favicons.resolve(url).await {
            return Some(data);
        }

        // 标签页可退回到浏览器提供的图标
        if let SwitchOption::Tab(tab) = option {
            if let Some(icon) = tab.fav_icon_url.as_deref().filter(|u| !u.is_empty()) {
                if let Some(data) = self.favicons.fetch_image(icon).await {
                    return Some(data);
                }
            }
        }

        Some(DEFAULT_FAVICON.to_string())
    }
}

/// Rank options and shape the display list / 排序并截断展示列表
///
/// Short result lists for a non-blank term get a trailing search command;
/// otherwise the list is cut to `display_results`.
pub fn rank_options(
    options: Vec<SwitchOption>,
    term: &str,
    config: &AppConfig,
) -> Vec<SwitchOption> {
    let records: Vec<CandidateRecord> =
        options.iter().filter_map(SwitchOption::candidate).collect();
    let ranked = search_with(
        term,
        &records,
        config.search.intermediate_results,
        &config.search,
    );

    let mut by_id: HashMap<String, SwitchOption> = options
        .into_iter()
        .filter_map(|option| {
            let id = option.id()?.to_string();
            Some((id, option))
        })
        .collect();

    let mut results: Vec<SwitchOption> =
        ranked.iter().filter_map(|r| by_id.remove(&r.id)).collect();

    let display = config.search.display_results;
    if results.len() < display && !term.trim().is_empty() {
        results.push(SwitchOption::search_command(term));
    } else {
        results.truncate(display);
    }
    results
}

/// Map a chosen option to the effect the host performs / 选中项对应的动作
///
/// Pages open next to the current tab; `None` when a page is chosen while
/// no tab is known to be active.
pub fn resolve_selection(
    option: &SwitchOption,
    session: &SessionContext,
) -> Option<SelectionAction> {
    match option {
        SwitchOption::Tab(tab) => Some(SelectionAction::ActivateTab { tab_id: tab.tab_id }),
        SwitchOption::History(page) | SwitchOption::Bookmark(page) => {
            let index = session.current_tab_index? + 1;
            Some(SelectionAction::OpenUrl {
                url: page.url.clone(),
                index,
            })
        }
        SwitchOption::Command(command) => command
            .search_term
            .as_ref()
            .map(|text| SelectionAction::WebSearch { text: text.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommandAction, PageOption, TabOption};
    use crate::sources::{BookmarkNode, BrowserSnapshot, BrowserTab};
    use async_trait::async_trait;

    /// Resolver that knows a fixed set of hosts / 固定结果的图标解析
    struct FakeFavicons {
        known: HashMap<String, String>,
    }

    #[async_trait]
    impl FaviconResolver for FakeFavicons {
        async fn resolve(&self, page_url: &str) -> Option<String> {
            let host = url::Url::parse(page_url).ok()?.host_str()?.to_string();
            self.known.get(&host).cloned()
        }

        async fn fetch_image(&self, image_url: &str) -> Option<String> {
            self.known.get(image_url).cloned()
        }
    }

    fn favicons(entries: &[(&str, &str)]) -> Arc<dyn FaviconResolver> {
        Arc::new(FakeFavicons {
            known: entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        })
    }

    fn bookmark(title: &str, url: &str) -> BookmarkNode {
        BookmarkNode {
            title: Some(title.to_string()),
            url: Some(url.to_string()),
        }
    }

    fn switcher(snapshot: BrowserSnapshot, icons: Arc<dyn FaviconResolver>) -> Switcher {
        Switcher::new(Arc::new(snapshot), icons, AppConfig::default())
    }

    #[tokio::test]
    async fn test_no_candidates_yields_search_command() {
        let switcher = switcher(BrowserSnapshot::default(), favicons(&[]));
        let options = switcher.get_switch_options("rust").await;
        assert_eq!(options.len(), 1);
        match &options[0] {
            SwitchOption::Command(command) => {
                assert_eq!(command.action, CommandAction::Search);
                assert_eq!(command.search_term.as_deref(), Some("rust"));
            }
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_term_lists_candidates_without_command() {
        let snapshot = BrowserSnapshot {
            bookmarks: vec![
                bookmark("Docs", "https://docs.rs/"),
                bookmark("Crates", "https://crates.io/"),
            ],
            ..BrowserSnapshot::default()
        };
        let options = switcher(snapshot, favicons(&[])).get_switch_options("  ").await;
        assert_eq!(options.len(), 2);
        assert!(options.iter().all(|o| !matches!(o, SwitchOption::Command(_))));
    }

    #[tokio::test]
    async fn test_display_cap_is_respected() {
        let snapshot = BrowserSnapshot {
            bookmarks: (0..8)
                .map(|i| {
                    bookmark(
                        &format!("Rust page {}", i),
                        &format!("https://site{}.example.com/rust", i),
                    )
                })
                .collect(),
            ..BrowserSnapshot::default()
        };
        let options = switcher(snapshot, favicons(&[])).get_switch_options("rust").await;
        assert_eq!(options.len(), 5);
        assert!(options.iter().all(|o| matches!(o, SwitchOption::Bookmark(_))));
    }

    #[tokio::test]
    async fn test_short_list_appends_command() {
        let snapshot = BrowserSnapshot {
            bookmarks: vec![bookmark("Tokio", "https://tokio.rs/")],
            ..BrowserSnapshot::default()
        };
        let options = switcher(snapshot, favicons(&[])).get_switch_options("tokio").await;
        assert_eq!(options.len(), 2);
        assert!(matches!(options[0], SwitchOption::Bookmark(_)));
        assert!(matches!(options[1], SwitchOption::Command(_)));
    }

    #[tokio::test]
    async fn test_favicon_failures_are_isolated() {
        let snapshot = BrowserSnapshot {
            tabs: vec![BrowserTab {
                id: Some(3),
                title: Some("Rust forum".into()),
                url: Some("https://users.rust-lang.org/".into()),
                fav_icon_url: Some("https://users.rust-lang.org/icon.png".into()),
                ..BrowserTab::default()
            }],
            bookmarks: vec![
                bookmark("Rust blog", "https://blog.rust-lang.org/"),
                bookmark("Rust book", "https://book.example.com/"),
            ],
            ..BrowserSnapshot::default()
        };
        let icons = favicons(&[
            ("blog.rust-lang.org", "data:blog"),
            ("https://users.rust-lang.org/icon.png", "data:tab"),
        ]);
        let options = switcher(snapshot, icons).get_switch_options("rust").await;

        let icon_of = |url: &str| {
            options
                .iter()
                .find(|o| o.url() == Some(url))
                .and_then(|o| o.favicon())
                .map(str::to_string)
        };
        assert_eq!(icon_of("https://blog.rust-lang.org/").as_deref(), Some("data:blog"));
        assert_eq!(icon_of("https://users.rust-lang.org/").as_deref(), Some("data:tab"));
        assert_eq!(icon_of("https://book.example.com/").as_deref(), Some(DEFAULT_FAVICON));
        // 命令项不参与图标解析
        assert!(options.iter().filter_map(|o| o.favicon()).all(|f| !f.is_empty()));
    }

    #[test]
    fn test_selection_actions() {
        let mut session = SessionContext::new();
        let tab = SwitchOption::Tab(TabOption {
            id: "t".into(),
            tab_id: 42,
            title: "Docs".into(),
            url: "https://docs.rs/".into(),
            fav_icon_url: None,
            favicon_data: String::new(),
            action_text: "Switch to Tab".into(),
        });
        let page = SwitchOption::History(PageOption {
            id: "h".into(),
            title: "Crates".into(),
            url: "https://crates.io/".into(),
            favicon_data: String::new(),
            action_text: "Open Page".into(),
        });
        let command = SwitchOption::search_command("serde json");

        assert_eq!(
            resolve_selection(&tab, &session),
            Some(SelectionAction::ActivateTab { tab_id: 42 })
        );
        assert_eq!(resolve_selection(&page, &session), None);

        session.tab_activated(7, 2);
        assert_eq!(
            resolve_selection(&page, &session),
            Some(SelectionAction::OpenUrl {
                url: "https://crates.io/".into(),
                index: 3
            })
        );
        assert_eq!(
            resolve_selection(&command, &session),
            Some(SelectionAction::WebSearch { text: "serde json".into() })
        );
    }
}

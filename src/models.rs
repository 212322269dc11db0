use serde::{Deserialize, Serialize};

/// Where a candidate came from. Lower precedence value wins ties / 来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Tab,
    History,
    Bookmark,
}

impl SourceType {
    pub fn precedence(self) -> u8 {
        match self {
            SourceType::Tab => 0,
            SourceType::History => 1,
            SourceType::Bookmark => 2,
        }
    }
}

/// Uniform record handed to the search core / 搜索候选记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
}

impl CandidateRecord {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        source_type: SourceType,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            source_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabOption {
    pub id: String,
    pub tab_id: i64,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub favicon_data: String,
    pub action_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOption {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub favicon_data: String,
    pub action_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Search,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOption {
    pub name: String,
    pub icon: String,
    pub action: CommandAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    pub action_text: String,
}

/// A displayable result. The `type` tag drives every dispatch / 展示选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SwitchOption {
    Tab(TabOption),
    History(PageOption),
    Bookmark(PageOption),
    Command(CommandOption),
}

impl SwitchOption {
    /// Search command for a term / 网页搜索命令
    pub fn search_command(term: &str) -> Self {
        SwitchOption::Command(CommandOption {
            name: format!("Search for \"{}\"", term),
            icon: "🔍".to_string(),
            action: CommandAction::Search,
            search_term: Some(term.to_string()),
            action_text: "Search".to_string(),
        })
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            SwitchOption::Tab(tab) => Some(&tab.id),
            SwitchOption::History(page) | SwitchOption::Bookmark(page) => Some(&page.id),
            SwitchOption::Command(_) => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            SwitchOption::Tab(tab) => Some(&tab.url),
            SwitchOption::History(page) | SwitchOption::Bookmark(page) => Some(&page.url),
            SwitchOption::Command(_) => None,
        }
    }

    pub fn source_type(&self) -> Option<SourceType> {
        match self {
            SwitchOption::Tab(_) => Some(SourceType::Tab),
            SwitchOption::History(_) => Some(SourceType::History),
            SwitchOption::Bookmark(_) => Some(SourceType::Bookmark),
            SwitchOption::Command(_) => None,
        }
    }

    /// Searchable view of the option; commands are never indexed / 转为候选记录
    pub fn candidate(&self) -> Option<CandidateRecord> {
        match self {
            SwitchOption::Tab(tab) => Some(CandidateRecord::new(
                &tab.id,
                &tab.title,
                &tab.url,
                SourceType::Tab,
            )),
            SwitchOption::History(page) | SwitchOption::Bookmark(page) => {
                let source_type = self.source_type()?;
                Some(CandidateRecord::new(&page.id, &page.title, &page.url, source_type))
            }
            SwitchOption::Command(_) => None,
        }
    }

    pub fn set_favicon(&mut self, data: String) {
        match self {
            SwitchOption::Tab(tab) => tab.favicon_data = data,
            SwitchOption::History(page) | SwitchOption::Bookmark(page) => page.favicon_data = data,
            SwitchOption::Command(_) => {}
        }
    }

    pub fn favicon(&self) -> Option<&str> {
        match self {
            SwitchOption::Tab(tab) => Some(&tab.favicon_data),
            SwitchOption::History(page) | SwitchOption::Bookmark(page) => Some(&page.favicon_data),
            SwitchOption::Command(_) => None,
        }
    }
}

/// Popup and tab focus state owned by the host glue / 会话上下文
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub popup_open: bool,
    pub previous_tab_id: Option<i64>,
    pub current_tab_id: Option<i64>,
    /// Position of the active tab in its window / 当前标签页位置
    pub current_tab_index: Option<usize>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab_activated(&mut self, tab_id: i64, index: usize) {
        if self.current_tab_id != Some(tab_id) {
            self.previous_tab_id = self.current_tab_id;
        }
        self.current_tab_id = Some(tab_id);
        self.current_tab_index = Some(index);
    }

    pub fn tab_removed(&mut self, tab_id: i64) {
        if self.previous_tab_id == Some(tab_id) {
            self.previous_tab_id = None;
        }
        if self.current_tab_id == Some(tab_id) {
            self.current_tab_id = None;
            self.current_tab_index = None;
        }
    }

    pub fn open_popup(&mut self) {
        self.popup_open = true;
    }

    pub fn close_popup(&mut self) {
        self.popup_open = false;
    }

    pub fn toggle_popup(&mut self) -> bool {
        self.popup_open = !self.popup_open;
        self.popup_open
    }
}

/// Effect the host performs for a chosen option / 选中后的动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionAction {
    ActivateTab { tab_id: i64 },
    OpenUrl { url: String, index: usize },
    WebSearch { text: String },
}

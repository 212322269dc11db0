//! Application configuration module / 应用配置模块
//!
//! Manages configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Search configuration / 搜索配置
    pub search: SearchConfig,
    /// Candidate source configuration / 候选来源配置
    pub sources: SourceConfig,
    /// Favicon configuration / 图标配置
    pub favicon: FaviconConfig,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Intermediate cap handed to the ranked search / 中间结果上限
    pub intermediate_results: usize,
    /// Final number of options shown / 最终展示数量
    pub display_results: usize,
    /// Shortest n-gram produced by term expansion / 最短 n-gram
    pub ngram_min: usize,
    /// Longest n-gram produced by term expansion / 最长 n-gram
    pub ngram_max: usize,
    /// Allowed edit distance as a fraction of the term length / 模糊匹配比例
    pub fuzzy_ratio: f32,
    /// Score multiplier for fuzzy (non-exact) hits / 模糊命中权重
    pub fuzzy_weight: f32,
    /// Per-field boosts / 字段权重
    pub boosts: FieldBoosts,
}

/// Field boosts / 字段权重
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldBoosts {
    pub id: f32,
    pub title: f32,
    pub url: f32,
    pub query: f32,
    pub hash: f32,
}

/// Candidate source configuration / 候选来源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// How far back history lookups reach (days) / 历史记录回溯天数
    pub history_days: i64,
    /// Max history hits per query token / 每个词的历史记录上限
    pub history_max_results: usize,
}

/// Favicon configuration / 图标配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaviconConfig {
    /// Favicon service URL, `{host}` is replaced by the page host / 图标服务地址
    pub service_url: String,
    /// Cache TTL in seconds / 缓存有效期（秒）
    pub cache_ttl_secs: i64,
    /// Request timeout in seconds / 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            intermediate_results: 100,
            display_results: 5,
            ngram_min: 3,
            ngram_max: 10,
            fuzzy_ratio: 0.1,
            fuzzy_weight: 0.45,
            boosts: FieldBoosts::default(),
        }
    }
}

impl Default for FieldBoosts {
    fn default() -> Self {
        Self {
            // id 为随机 uuid，只建索引不计分
            id: 0.0,
            title: 4.0,
            url: 3.0,
            query: 2.0,
            hash: 1.0,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            history_days: 28,
            history_max_results: 100,
        }
    }
}

impl Default for FaviconConfig {
    fn default() -> Self {
        Self {
            service_url: "https://www.google.com/s2/favicons?domain={host}&sz=32".to_string(),
            cache_ttl_secs: 365 * 24 * 60 * 60,
            timeout_secs: 5,
        }
    }
}

impl SearchConfig {
    /// Reject settings the engine cannot work with / 校验搜索配置
    pub fn validate(&self) -> Result<()> {
        if self.ngram_min == 0 || self.ngram_min > self.ngram_max {
            return Err(Error::Config(format!(
                "invalid n-gram range {}..={}",
                self.ngram_min, self.ngram_max
            )));
        }
        if !(0.0..1.0).contains(&self.fuzzy_ratio) {
            return Err(Error::Config(format!(
                "fuzzy_ratio must be in [0, 1), got {}",
                self.fuzzy_ratio
            )));
        }
        Ok(())
    }
}

impl FaviconConfig {
    /// Build the service URL for a host / 生成图标服务地址
    pub fn service_url_for(&self, host: &str) -> String {
        self.service_url.replace("{host}", host)
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from a specific file / 从指定文件加载配置
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.search.validate()?;
    tracing::info!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Load configuration from file, or create default if not exists
/// 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig> {
    let config_path = get_config_path();

    if config_path.exists() {
        load_config_from(&config_path)
    } else {
        let config = AppConfig::default();
        save_config(&config, &config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Initialize global configuration / 初始化全局配置
pub fn init_config() -> Result<Arc<RwLock<AppConfig>>> {
    let config = load_config()?;

    let config_arc = Arc::new(RwLock::new(config));

    CONFIG
        .set(config_arc.clone())
        .map_err(|_| Error::Config("Config already initialized".to_string()))?;

    Ok(config_arc)
}

/// Get global configuration instance / 获取全局配置实例
pub fn get_config() -> Arc<RwLock<AppConfig>> {
    CONFIG
        .get_or_init(|| {
            let config = load_config().unwrap_or_else(|e| {
                tracing::warn!("Failed to load configuration, using defaults: {}", e);
                AppConfig::default()
            });
            Arc::new(RwLock::new(config))
        })
        .clone()
}

/// Get a read-only snapshot of current config / 获取当前配置的只读快照
pub fn config() -> AppConfig {
    get_config().read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_ranking_policy() {
        let config = AppConfig::default();
        assert_eq!(config.search.intermediate_results, 100);
        assert_eq!(config.search.display_results, 5);
        assert_eq!(config.search.boosts.title, 4.0);
        assert_eq!(config.search.boosts.url, 3.0);
        assert_eq!(config.search.boosts.query, 2.0);
        assert_eq!(config.search.boosts.hash, 1.0);
        assert_eq!(config.search.boosts.id, 0.0);
        assert!(config.search.validate().is_ok());
    }

    fn write_temp_config(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("switchbar-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_config_reports_invalid_values() {
        let path = write_temp_config(
            r#"{"search": {"ngram_min": 9, "ngram_max": 2, "display_results": 8}}"#,
        );
        let result = load_config_from(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_config_reports_malformed_json() {
        let path = write_temp_config(r#"{"search": {"display_results": "#);
        let result = load_config_from(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let path = write_temp_config(r#"{"search": {"display_results": 8}}"#);
        let config = load_config_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.search.display_results, 8);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"search": {"display_results": 8}}"#).unwrap();
        assert_eq!(config.search.display_results, 8);
        assert_eq!(config.search.ngram_max, 10);
        assert_eq!(config.sources.history_days, 28);
    }

    #[test]
    fn test_rejects_inverted_ngram_range() {
        let search = SearchConfig {
            ngram_min: 5,
            ngram_max: 3,
            ..SearchConfig::default()
        };
        assert!(search.validate().is_err());
    }

    #[test]
    fn test_service_url_substitutes_host() {
        let favicon = FaviconConfig::default();
        assert_eq!(
            favicon.service_url_for("github.com"),
            "https://www.google.com/s2/favicons?domain=github.com&sz=32"
        );
    }
}

//! Favicon resolver / 网站图标
//!
//! Favicons are fetched from a favicon service per host, encoded as
//! `data:` URLs and cached in memory with a TTL. Expired entries are
//! evicted when read.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::config::FaviconConfig;
use crate::error::{Error, Result};
use crate::search::schema::url_host;

/// Icon used when nothing could be resolved / 默认图标
pub const DEFAULT_FAVICON: &str = concat!(
    "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAABAAAAAQCAYAAAAf8/9hAAAACXBIWX",
    "MAAAsTAAALEwEAmpwYAAAA4UlEQVR4nM3TMUoDQRTG8d8KNmIRLLMpBARvYCOWqQSvYG1pY2FjLb",
    "Y2WlkoWNh4Ai0UC0GwEIuAwTStJpvAuMzKbuEaycIW/uHBvO/7z5vHkEZmVDxCE9c4wQIm+fiCIb",
    "YxiyaeNSTwiiVs4EM1pjHAfc7YwRD3GPXSsIV0O8EdTrGSOW5wkc+9cMRLnLplSJfwi+Kf4Vt7t8",
    "hyevnSawZjviQ40HeZnVzOJpYzJ9lvBk6zwivquMJZ5lTwkDmPmZeKb6XUcZk7vFXf+4hzbBcLi7",
    "ReJibYzxzYw3vV/ATnWMdvc56UFw7pPIoAAAAASUVORK5CYII=",
);

/// Favicon collaborator / 图标解析接口
#[async_trait]
pub trait FaviconResolver: Send + Sync {
    /// Favicon for the host of a page URL / 页面所在站点的图标
    async fn resolve(&self, page_url: &str) -> Option<String>;

    /// Fetch an icon from its own URL / 直接获取图标地址
    async fn fetch_image(&self, image_url: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
struct CachedFavicon {
    data: String,
    fetched_at: DateTime<Utc>,
}

/// In-memory favicon cache / 图标缓存
pub struct FaviconCache {
    entries: RwLock<HashMap<String, CachedFavicon>>,
    ttl: Duration,
}

impl FaviconCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached entry if still fresh; stale entries are removed / 读取缓存
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if now - entry.fetched_at < self.ttl => return Some(entry.data.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // 已过期，删除
        self.entries.write().remove(key);
        None
    }

    pub fn insert(&self, key: &str, data: String, now: DateTime<Utc>) {
        self.entries.write().insert(key.to_string(), CachedFavicon { data, fetched_at: now });
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encode image bytes as a data URL / 编码为 data URL
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Favicon resolver backed by an HTTP favicon service / 基于 HTTP 的图标解析
pub struct HttpFaviconResolver {
    client: reqwest::Client,
    config: FaviconConfig,
    cache: FaviconCache,
}

impl HttpFaviconResolver {
    pub fn new(config: FaviconConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: FaviconConfig) -> Self {
        let cache = FaviconCache::new(Duration::seconds(config.cache_ttl_secs));
        Self { client, config, cache }
    }

    pub fn cache(&self) -> &FaviconCache {
        &self.cache
    }

    async fn fetch_data_url(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::FaviconStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "image/png".to_string());
        let bytes = response.bytes().await?;
        Ok(encode_data_url(&mime, &bytes))
    }

    async fn cached_fetch(&self, key: &str, url: &str) -> Option<String> {
        if let Some(data) = self.cache.get(key, Utc::now()) {
            return Some(data);
        }

        match self.fetch_data_url(url).await {
            Ok(data) => {
                self.cache.insert(key, data.clone(), Utc::now());
                Some(data)
            }
            Err(e) => {
                tracing::warn!("Failed to load favicon {}: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl FaviconResolver for HttpFaviconResolver {
    async fn resolve(&self, page_url: &str) -> Option<String> {
        let host = match url_host(page_url) {
            Ok(host) if !host.is_empty() => host,
            Ok(_) => return None,
            Err(e) => {
                tracing::debug!("No favicon for {}: {}", page_url, e);
                return None;
            }
        };
        let service_url = self.config.service_url_for(&host);
        self.cached_fetch(&host, &service_url).await
    }

    async fn fetch_image(&self, image_url: &str) -> Option<String> {
        if image_url.starts_with("data:") {
            return Some(image_url.to_string());
        }
        self.cached_fetch(image_url, image_url).await
    }
}

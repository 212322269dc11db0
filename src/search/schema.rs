//! Search index schema definition / 搜索索引的 Schema 定义

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::FieldBoosts;
use crate::error::{Error, Result};
use crate::models::{CandidateRecord, SourceType};

/// Indexed fields / 索引字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexField {
    Id,
    Title,
    /// Scheme + host + path / 不含查询串和锚点的地址
    Url,
    /// Query string / 查询串
    Query,
    /// Fragment / 锚点
    Hash,
}

impl IndexField {
    pub const ALL: [IndexField; 5] = [
        IndexField::Id,
        IndexField::Title,
        IndexField::Url,
        IndexField::Query,
        IndexField::Hash,
    ];

    pub fn boost(self, boosts: &FieldBoosts) -> f32 {
        match self {
            IndexField::Id => boosts.id,
            IndexField::Title => boosts.title,
            IndexField::Url => boosts.url,
            IndexField::Query => boosts.query,
            IndexField::Hash => boosts.hash,
        }
    }
}

/// Indexable view of a candidate / 可索引文档
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub id: String,
    pub title: String,
    pub url_base: String,
    pub url_query: String,
    pub url_hash: String,
    pub source_type: SourceType,
}

impl IndexedDocument {
    pub fn field(&self, field: IndexField) -> &str {
        match field {
            IndexField::Id => &self.id,
            IndexField::Title => &self.title,
            IndexField::Url => &self.url_base,
            IndexField::Query => &self.url_query,
            IndexField::Hash => &self.url_hash,
        }
    }
}

/// A scored hit from the index / 评分结果
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub id: String,
    pub score: f32,
    pub source_type: SourceType,
    pub url: String,
    pub title: String,
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|source| Error::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

fn base_of(parsed: &Url) -> String {
    let mut base = parsed.clone();
    base.set_query(None);
    base.set_fragment(None);
    base.to_string()
}

/// URL without query string and fragment / 规范化地址
pub fn canonical_url(url: &str) -> Result<String> {
    parse_url(url).map(|parsed| base_of(&parsed))
}

/// Lowercased host of a URL, empty when the URL has none / 主机名
pub fn url_host(url: &str) -> Result<String> {
    let parsed = parse_url(url)?;
    Ok(parsed.host_str().unwrap_or_default().to_lowercase())
}

/// Build the indexable document of a candidate / 构建索引文档
pub fn to_document(record: &CandidateRecord) -> Result<IndexedDocument> {
    let parsed = parse_url(&record.url)?;

    Ok(IndexedDocument {
        id: record.id.clone(),
        title: record.title.clone(),
        url_base: base_of(&parsed),
        url_query: parsed.query().unwrap_or_default().to_string(),
        url_hash: parsed.fragment().unwrap_or_default().to_string(),
        source_type: record.source_type,
    })
}

//! Search module - ranked multi-source text search / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - The index is rebuilt from a fresh candidate snapshot on every query
//! - Search only ranks; fetching candidates and favicons happens in the caller
//! - Call direction: switcher → search (unidirectional) / 调用方向
//!
//! Index features / 索引特性：
//! - Field boosts: title > url > query string > fragment
//! - N-gram expansion for substring matches, edit distance for typos
//! - Chinese titles are also indexed as pinyin / 中文标题同时以拼音索引

pub mod engine;
pub mod pinyin;
pub mod ranking;
pub mod schema;
pub mod tokenizer;

pub use engine::InvertedIndex;
pub use ranking::{dedup_by_canonical_url, dedup_by_host_title, search, search_with};
pub use schema::{to_document, IndexField, IndexedDocument, ScoredMatch};
pub use tokenizer::{expand_term, tokenize, tokenize_field};

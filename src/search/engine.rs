//! Search engine - transient in-memory inverted index / 搜索引擎
//!
//! The index is a value built from one candidate snapshot and never mutated
//! afterwards. Every query token must be matched (AND), each token matches a
//! document when any of its expansions (the token itself or one of its
//! n-grams) hits an indexed term exactly, or when the token itself is within
//! the fuzzy edit distance of an indexed token.

use std::collections::{HashMap, HashSet};

use crate::config::SearchConfig;
use crate::models::CandidateRecord;

use super::schema::{to_document, IndexField, IndexedDocument, ScoredMatch};
use super::tokenizer::{expand_term_with, tokenize, tokenize_field};

/// BM25 parameters / BM25 参数
const K1: f32 = 1.2;
const B: f32 = 0.7;
const DELTA: f32 = 0.5;

/// Inverted index entry / 倒排索引条目
#[derive(Debug, Clone)]
struct PostingEntry {
    doc: usize,
    field: IndexField,
    term_freq: u32,
}

fn slot(field: IndexField) -> usize {
    match field {
        IndexField::Id => 0,
        IndexField::Title => 1,
        IndexField::Url => 2,
        IndexField::Query => 3,
        IndexField::Hash => 4,
    }
}

/// Inverted index over one candidate snapshot / 倒排索引
pub struct InvertedIndex {
    documents: Vec<IndexedDocument>,
    /// Full URL per document / 文档原始地址
    urls: Vec<String>,
    /// term -> [PostingEntry]
    postings: HashMap<String, Vec<PostingEntry>>,
    /// term -> number of documents containing it / 文档频率
    doc_freq: HashMap<String, usize>,
    /// Unexpanded tokens, the candidates for fuzzy matching / 原始词表
    vocabulary: HashSet<String>,
    field_lengths: Vec<[u32; 5]>,
    avg_field_lengths: [f32; 5],
    config: SearchConfig,
}

impl InvertedIndex {
    /// Build the index; candidates with unparsable URLs are skipped / 构建索引
    pub fn build(records: &[CandidateRecord], config: &SearchConfig) -> Self {
        let mut documents = Vec::with_capacity(records.len());
        let mut urls = Vec::with_capacity(records.len());
        let mut postings: HashMap<String, Vec<PostingEntry>> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut vocabulary: HashSet<String> = HashSet::new();
        let mut field_lengths = Vec::with_capacity(records.len());
        let mut totals = [0u64; 5];

        for record in records {
            let document = match to_document(record) {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!("Skipping candidate {}: {}", record.id, e);
                    continue;
                }
            };

            let doc = documents.len();
            let mut lengths = [0u32; 5];
            let mut doc_terms: HashSet<String> = HashSet::new();

            for field in IndexField::ALL {
                let tokens = tokenize_field(document.field(field), field);
                lengths[slot(field)] = tokens.len() as u32;
                totals[slot(field)] += tokens.len() as u64;

                let mut counts: HashMap<String, u32> = HashMap::new();
                for token in &tokens {
                    vocabulary.insert(token.clone());
                    for term in expand_term_with(token, config.ngram_min, config.ngram_max) {
                        *counts.entry(term).or_default() += 1;
                    }
                }

                for (term, term_freq) in counts {
                    if doc_terms.insert(term.clone()) {
                        *doc_freq.entry(term.clone()).or_default() += 1;
                    }
                    postings.entry(term).or_default().push(PostingEntry { doc, field, term_freq });
                }
            }

            field_lengths.push(lengths);
            urls.push(record.url.clone());
            documents.push(document);
        }

        let count = documents.len().max(1) as f32;
        let mut avg_field_lengths = [1.0f32; 5];
        for (avg, total) in avg_field_lengths.iter_mut().zip(totals) {
            *avg = (total as f32 / count).max(1.0);
        }

        tracing::debug!(
            "Built index: {} documents, {} terms",
            documents.len(),
            postings.len()
        );

        Self {
            documents,
            urls,
            postings,
            doc_freq,
            vocabulary,
            field_lengths,
            avg_field_lengths,
            config: config.clone(),
        }
    }

    /// 获取文档数量
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// 获取词项数量
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Run a conjunctive, boosted, fuzzy query / 执行查询
    pub fn search(&self, query: &str) -> Vec<ScoredMatch> {
        let mut seen = HashSet::new();
        let tokens: Vec<String> = tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        if tokens.is_empty() || self.documents.is_empty() {
            return Vec::new();
        }

        let mut totals: HashMap<usize, f32> = HashMap::new();
        let mut matched: HashMap<usize, usize> = HashMap::new();

        for token in &tokens {
            let token_scores = self.score_token(token);
            for (doc, score) in token_scores {
                *totals.entry(doc).or_default() += score;
                *matched.entry(doc).or_default() += 1;
            }
        }

        let mut results: Vec<ScoredMatch> = totals
            .into_iter()
            .filter(|(doc, _)| matched.get(doc) == Some(&tokens.len()))
            .map(|(doc, score)| {
                let document = &self.documents[doc];
                ScoredMatch {
                    id: document.id.clone(),
                    score,
                    source_type: document.source_type,
                    url: self.urls[doc].clone(),
                    title: document.title.clone(),
                }
            })
            .collect();

        // 按分数排序
        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

        tracing::debug!("Query '{}' matched {} documents", query, results.len());
        results
    }

    /// Score of every document matching one query token / 单个词的文档得分
    fn score_token(&self, token: &str) -> HashMap<usize, f32> {
        let mut scores: HashMap<usize, f32> = HashMap::new();
        let token_len = token.chars().count().max(1) as f32;

        // 精确匹配 + N-gram 匹配
        for expansion in expand_term_with(token, self.config.ngram_min, self.config.ngram_max) {
            let weight = expansion.chars().count() as f32 / token_len;
            self.accumulate(&expansion, weight, &mut scores);
        }

        // 模糊匹配（编辑距离）
        let max_distance = (token_len * self.config.fuzzy_ratio).round() as usize;
        if max_distance > 0 {
            let mut near: Vec<(&str, usize)> = self
                .vocabulary
                .iter()
                .filter(|term| term.as_str() != token)
                .filter_map(|term| {
                    fuzzy_distance(token, term, max_distance).map(|d| (term.as_str(), d))
                })
                .collect();
            // 固定累加顺序，保证得分可复现
            near.sort_unstable();

            for (term, distance) in near {
                let weight = self.config.fuzzy_weight * token_len / (token_len + distance as f32);
                self.accumulate(term, weight, &mut scores);
            }
        }

        scores
    }

    fn accumulate(&self, term: &str, weight: f32, scores: &mut HashMap<usize, f32>) {
        let Some(postings) = self.postings.get(term) else {
            return;
        };
        let idf = self.idf(term);

        for posting in postings {
            let boost = posting.field.boost(&self.config.boosts);
            if boost <= 0.0 {
                continue;
            }
            let s = slot(posting.field);
            let length = self.field_lengths[posting.doc][s] as f32;
            let avg = self.avg_field_lengths[s];
            let tf = posting.term_freq as f32;
            let tf_part = tf * (K1 + 1.0) / (tf + K1 * (1.0 - B + B * length / avg)) + DELTA;

            *scores.entry(posting.doc).or_default() += boost * weight * idf * tf_part;
        }
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.documents.len() as f32;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }
}

/// Merge two result sets keeping the higher score per id / 按 id 合并，保留高分
pub fn merge_max_score(primary: Vec<ScoredMatch>, secondary: Vec<ScoredMatch>) -> Vec<ScoredMatch> {
    let mut order: Vec<String> = Vec::with_capacity(primary.len() + secondary.len());
    let mut by_id: HashMap<String, ScoredMatch> = HashMap::new();

    for hit in primary.into_iter().chain(secondary) {
        match by_id.get_mut(&hit.id) {
            Some(existing) => {
                if hit.score > existing.score {
                    *existing = hit;
                }
            }
            None => {
                order.push(hit.id.clone());
                by_id.insert(hit.id.clone(), hit);
            }
        }
    }

    order.into_iter().filter_map(|id| by_id.remove(&id)).collect()
}

/// Edit distance when within `max_distance` / 编辑距离在阈值内时返回距离
fn fuzzy_distance(s1: &str, s2: &str, max_distance: usize) -> Option<usize> {
    let len1 = s1.chars().count();
    let len2 = s2.chars().count();

    // 长度差太大直接返回
    if len1.abs_diff(len2) > max_distance {
        return None;
    }

    let distance = levenshtein_distance(s1, s2);
    (distance <= max_distance).then_some(distance)
}

/// 计算 Levenshtein 编辑距离
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    if s1_chars.is_empty() {
        return s2_chars.len();
    }
    if s2_chars.is_empty() {
        return s1_chars.len();
    }

    let mut prev: Vec<usize> = (0..=s2_chars.len()).collect();
    let mut curr = vec![0usize; s2_chars.len() + 1];

    for (i, c1) in s1_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, c2) in s2_chars.iter().enumerate() {
            let cost = if c1 == c2 { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[s2_chars.len()]
}

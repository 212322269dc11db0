//! Result post-processing and the ranked search entry point / 结果后处理
//!
//! Two dedup keys are in play:
//! - source merge: canonical URL (no query string, no fragment), keeping the
//!   candidate with the best source type;
//! - display: (host, title), applied to scored matches.

use std::collections::{HashMap, HashSet};

use crate::config::SearchConfig;
use crate::models::CandidateRecord;

use super::engine::{merge_max_score, InvertedIndex};
use super::pinyin::{contains_cjk, to_pinyin};
use super::schema::{canonical_url, url_host, ScoredMatch};

/// Collapse candidates sharing a canonical URL / 按规范化地址去重
///
/// Per group the candidate with the lowest source precedence wins (first
/// one on ties) and takes the position of the group's first member.
pub fn dedup_by_canonical_url(candidates: &[CandidateRecord]) -> Vec<CandidateRecord> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut deduped: Vec<CandidateRecord> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = canonical_url(&candidate.url).unwrap_or_else(|_| candidate.url.clone());
        match slots.get(&key) {
            Some(&slot) => {
                if candidate.source_type.precedence() < deduped[slot].source_type.precedence() {
                    deduped[slot] = candidate.clone();
                }
            }
            None => {
                slots.insert(key, deduped.len());
                deduped.push(candidate.clone());
            }
        }
    }

    deduped
}

/// Display identity of a match / 展示去重键
pub fn dedup_key(hit: &ScoredMatch) -> (String, String) {
    let host = url_host(&hit.url).unwrap_or_else(|_| hit.url.to_lowercase());
    (host, hit.title.trim().to_lowercase())
}

/// Keep the first match per (host, title) / 按主机和标题去重
///
/// Input is expected to be ranked already.
pub fn dedup_by_host_title(matches: Vec<ScoredMatch>) -> Vec<ScoredMatch> {
    let mut seen = HashSet::new();
    matches.into_iter().filter(|hit| seen.insert(dedup_key(hit))).collect()
}

/// Order by source precedence, then score, then input position / 排序
pub fn rank_matches(matches: &mut [ScoredMatch], positions: &HashMap<&str, usize>) {
    matches.sort_by(|a, b| {
        a.source_type
            .precedence()
            .cmp(&b.source_type.precedence())
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| {
                let pa = positions.get(a.id.as_str()).copied().unwrap_or(usize::MAX);
                let pb = positions.get(b.id.as_str()).copied().unwrap_or(usize::MAX);
                pa.cmp(&pb)
            })
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Ranked search with default settings / 使用默认配置搜索
pub fn search(
    term: &str,
    candidates: &[CandidateRecord],
    max_results: usize,
) -> Vec<CandidateRecord> {
    search_with(term, candidates, max_results, &SearchConfig::default())
}

/// Ranked search over a candidate snapshot / 搜索
///
/// A blank term returns the candidates unchanged, capped at `max_results`.
pub fn search_with(
    term: &str,
    candidates: &[CandidateRecord],
    max_results: usize,
    config: &SearchConfig,
) -> Vec<CandidateRecord> {
    if term.trim().is_empty() {
        return candidates.iter().take(max_results).cloned().collect();
    }
    if max_results == 0 {
        return Vec::new();
    }

    let deduped = dedup_by_canonical_url(candidates);
    let index = InvertedIndex::build(&deduped, config);

    let mut matches = index.search(term);
    if contains_cjk(term) {
        let transliterated = to_pinyin(term);
        tracing::debug!("Dual-script query '{}' -> '{}'", term, transliterated);
        matches = merge_max_score(matches, index.search(&transliterated));
    }

    let positions: HashMap<&str, usize> = deduped
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    rank_matches(&mut matches, &positions);
    let mut matches = dedup_by_host_title(matches);
    matches.truncate(max_results);

    let by_id: HashMap<&str, &CandidateRecord> =
        deduped.iter().map(|c| (c.id.as_str(), c)).collect();
    matches
        .iter()
        .filter_map(|hit| by_id.get(hit.id.as_str()).map(|c| (*c).clone()))
        .collect()
}

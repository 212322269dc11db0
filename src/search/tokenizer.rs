//! Tokenizer and term expander / 分词器与词项扩展
//!
//! Supports / 支持：
//! - Splitting on whitespace and URL punctuation / 按空白和标点切分
//! - Splitting at Latin/CJK boundaries ("日本2024" -> "日本", "2024") / 中英文边界切分
//! - Pinyin expansion for titles / 标题拼音扩展
//! - N-gram expansion shared by index and query / 索引和查询共用的 N-gram 扩展

use std::collections::HashSet;

use super::pinyin::{contains_cjk, to_pinyin};
use super::schema::IndexField;

/// Default n-gram range / 默认 N-gram 长度范围
pub const NGRAM_MIN: usize = 3;
pub const NGRAM_MAX: usize = 10;

const SEPARATORS: &[char] = &[
    '-', '_', '.', ',', '!', '?', ';', ':', '\'', '"', '(', ')', '[', ']', '{', '}', '/', '\\',
];

fn is_separator(c: char) -> bool {
    c.is_whitespace() || SEPARATORS.contains(&c)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Script {
    Ascii,
    Other,
}

/// Split a token where an ASCII alphanumeric run meets a non-ASCII run / 按文字边界切分
fn split_script_boundaries(token: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut last: Option<Script> = None;

    for (i, c) in token.char_indices() {
        let script = if c.is_ascii_alphanumeric() {
            Some(Script::Ascii)
        } else if !c.is_ascii() {
            Some(Script::Other)
        } else {
            None
        };

        if let Some(script) = script {
            if matches!(last, Some(prev) if prev != script) {
                parts.push(&token[start..i]);
                start = i;
            }
            last = Some(script);
        }
    }
    parts.push(&token[start..]);
    parts
}

/// Tokenize text / 对文本进行分词
///
/// Lowercases, splits on separators and script boundaries, drops empty tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    lower
        .split(is_separator)
        .flat_map(split_script_boundaries)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_numeric(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_digit())
}

/// Field-aware tokenization used at index time / 按字段分词
///
/// Titles drop purely numeric tokens and, when they contain CJK text, are
/// extended with the tokens of their pinyin transliteration.
pub fn tokenize_field(text: &str, field: IndexField) -> Vec<String> {
    if field != IndexField::Title {
        return tokenize(text);
    }

    let mut seen = HashSet::new();
    let mut tokens: Vec<String> = tokenize(text)
        .into_iter()
        .filter(|t| !is_numeric(t))
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if contains_cjk(text) {
        let transliterated = to_pinyin(text);
        for token in tokenize(&transliterated) {
            if !is_numeric(&token) && seen.insert(token.clone()) {
                tokens.push(token);
            }
        }

        // 整词拼音（"nihaoshijie"），便于连续拼音输入
        let original: Vec<String> = tokenize(text);
        for token in original.iter().filter(|t| contains_cjk(t)) {
            let compact: String = to_pinyin(token).split_whitespace().collect();
            if !compact.is_empty() && !is_numeric(&compact) && seen.insert(compact.clone()) {
                tokens.push(compact);
            }
        }
    }

    tokens
}

/// Expand a term into itself plus its n-grams / 生成词项及其 N-gram
///
/// Example: "goog" -> ["goog", "goo", "oog"] / 例如
pub fn expand_term(term: &str) -> Vec<String> {
    expand_term_with(term, NGRAM_MIN, NGRAM_MAX)
}

/// Same as [`expand_term`] with an explicit n-gram range / 指定长度范围
pub fn expand_term_with(term: &str, min_n: usize, max_n: usize) -> Vec<String> {
    if term.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = term.chars().collect();
    let mut seen = HashSet::new();
    let mut expansions = vec![term.to_string()];
    seen.insert(term.to_string());

    for n in min_n.max(1)..=max_n {
        if n > chars.len() {
            break;
        }
        for window in chars.windows(n) {
            let ngram: String = window.iter().collect();
            if seen.insert(ngram.clone()) {
                expansions.push(ngram);
            }
        }
    }

    expansions
}

//! CJK detection and pinyin transliteration / 中日文检测与拼音转换
//!
//! Words are segmented with jieba first so that the transliteration keeps
//! word boundaries ("你好世界" -> "nihao shijie").

use jieba_rs::Jieba;
use once_cell::sync::Lazy;
use pinyin::ToPinyin;

/// Global jieba tokenizer instance / 全局 jieba 分词器实例
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Whether a character falls in the CJK / Kana ranges / 是否为中日文字符
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30ff}' |  // Hiragana + Katakana
        '\u{3400}'..='\u{4dbf}' |  // CJK Extension A
        '\u{4e00}'..='\u{9fff}' |  // CJK Unified Ideographs
        '\u{f900}'..='\u{faff}' |  // CJK Compatibility Ideographs
        '\u{ff66}'..='\u{ff9f}'    // Halfwidth Katakana
    )
}

/// Check if text contains CJK characters / 检测文本是否包含中日文字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// Transliterate text to tone-free pinyin / 转换为无声调拼音
///
/// One space-separated group per segmented word.
///
/// Characters without a pinyin reading (Latin, kana, punctuation) are kept as-is.
pub fn to_pinyin(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut words = Vec::new();
    for word in JIEBA.cut(text, true) {
        let word = word.trim();
        if word.is_empty() {
            continue;
        }

        let mut out = String::with_capacity(word.len() * 2);
        for c in word.chars() {
            match c.to_pinyin() {
                Some(p) => out.push_str(p.plain()),
                None => out.push(c),
            }
        }
        words.push(out);
    }

    words.join(" ")
}

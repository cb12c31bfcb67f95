// src/workbench/text.rs
// Code-point-aware keyword/tag sanitization and topic normalization (§4.8.1
// step 6, §4.8.7 step 2, §9 CJK/Latin spacing decision recorded in
// DESIGN.md).

use crate::domain::{KeywordItem, KeywordSource, Polarity};

/// Truncates `s` to at most `max_len` Unicode code points (not bytes).
pub fn truncate_code_points(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

pub fn code_point_len(s: &str) -> usize {
    s.chars().count()
}

/// Trims, deduplicates case-insensitively (first occurrence wins), truncates
/// each tag to `max_len` code points, and caps the set at `limit` tags.
pub fn sanitize_tags(tags: &[String], limit: usize, max_len: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        let truncated = truncate_code_points(trimmed, max_len);
        let key = truncated.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.insert(key);
        out.push(truncated);
        if out.len() >= limit {
            break;
        }
    }
    out
}

/// A code point counts as CJK if it falls in the Han, Hiragana, Katakana, or
/// Hangul Unicode blocks (DESIGN.md open-question decision #2).
fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0x20000..=0x2A6DF // Han
        | 0x3040..=0x309F // Hiragana
        | 0x30A0..=0x30FF // Katakana
        | 0xAC00..=0xD7A3 // Hangul syllables
        | 0x1100..=0x11FF // Hangul Jamo
    )
}

/// Inserts a space at every boundary between a CJK code point and an ASCII
/// alphanumeric code point, in either direction, without duplicating
/// whitespace that is already present.
pub fn normalize_topic(topic: &str) -> String {
    let chars: Vec<char> = topic.chars().collect();
    let mut out = String::with_capacity(topic.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 {
            let prev = chars[i - 1];
            let boundary = (is_cjk(prev) && c.is_ascii_alphanumeric())
                || (prev.is_ascii_alphanumeric() && is_cjk(c));
            if boundary && prev != ' ' && c != ' ' {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out
}

/// Deduplicates keywords per polarity by lowercase(word) (last write wins so
/// a later, more-specific item can refine an earlier one's weight/source),
/// caps each polarity at `limit`, and truncates each word to `max_len` code
/// points. Weight is clamped to 0..=5 by the caller before this runs.
pub fn dedup_keywords(items: Vec<KeywordItem>, limit: usize, max_len: usize) -> Vec<KeywordItem> {
    let mut seen = std::collections::HashMap::new();
    let mut order = Vec::new();
    for mut item in items {
        item.word = truncate_code_points(item.word.trim(), max_len);
        if item.word.is_empty() {
            continue;
        }
        let key = item.word.to_lowercase();
        if !seen.contains_key(&key) {
            order.push(key.clone());
        }
        seen.insert(key, item);
    }
    order
        .into_iter()
        .filter_map(|k| seen.remove(&k))
        .take(limit)
        .collect()
}

pub fn clamp_weight(weight: Option<i64>) -> i64 {
    weight.unwrap_or(5).clamp(0, 5)
}

pub fn keyword_item(
    word: impl Into<String>,
    polarity: Polarity,
    weight: Option<i64>,
    source: KeywordSource,
) -> KeywordItem {
    KeywordItem {
        word: word.into(),
        polarity,
        weight: clamp_weight(weight),
        source,
        keyword_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_by_code_points_not_bytes() {
        let s = "日本語タグ"; // 5 code points, more bytes
        assert_eq!(code_point_len(&truncate_code_points(s, 3)), 3);
    }

    #[test]
    fn sanitize_tags_dedupes_case_insensitively_keeping_first() {
        let tags = vec!["React".to_string(), "react".to_string(), "Vue".to_string()];
        let out = sanitize_tags(&tags, 3, 10);
        assert_eq!(out, vec!["React", "Vue"]);
    }

    #[test]
    fn sanitize_tags_truncates_to_max_length_code_points() {
        let tags = vec!["Interview".to_string()];
        let out = sanitize_tags(&tags, 3, 5);
        assert_eq!(out, vec!["Inter"]);
    }

    #[test]
    fn normalize_topic_inserts_space_at_cjk_latin_boundary() {
        assert_eq!(normalize_topic("React前端面试"), "React 前端面试");
        assert_eq!(normalize_topic("前端React面试"), "前端 React 面试");
    }

    #[test]
    fn normalize_topic_does_not_duplicate_existing_space() {
        assert_eq!(normalize_topic("React 前端"), "React 前端");
    }

    #[test]
    fn dedup_keywords_keeps_last_write_caps_and_truncates() {
        let items = vec![
            keyword_item("React", Polarity::Positive, Some(3), KeywordSource::Model),
            keyword_item("react", Polarity::Positive, Some(5), KeywordSource::Manual),
            keyword_item("Hooks", Polarity::Positive, None, KeywordSource::Model),
        ];
        let out = dedup_keywords(items, 10, 32);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].word, "react");
        assert_eq!(out[0].weight, 5);
        assert_eq!(out[1].word, "Hooks");
        assert_eq!(out[1].weight, 5);
    }
}

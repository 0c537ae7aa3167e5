use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z0-9_-]+)").expect("tag pattern"));
static PRIORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!p(\d+)").expect("priority pattern"));
static DUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@due\((\d{4}-\d{2}-\d{2})\)").expect("due pattern"));

/// Inline markers found in a task's text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    pub tags: Vec<String>,
    pub priority: u32,
    pub due: Option<NaiveDate>,
}

/// Extract tags, priority and due date from task text.
///
/// Tags are lowercased and deduplicated in first-seen order. When several
/// priorities appear the lowest non-zero number wins; when several due dates
/// appear the earliest valid one wins.
pub fn extract_markers(text: &str) -> Markers {
    Markers {
        tags: extract_tags(text),
        priority: extract_priority(text),
        due: extract_due(text),
    }
}

pub fn extract_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for cap in TAG_RE.captures_iter(text) {
        let whole = cap.get(0).map(|m| m.start()).unwrap_or(0);
        // `a#b` is not a tag; the hash must start a word
        if whole > 0
            && text[..whole]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_whitespace() && c != '(' && c != '[')
        {
            continue;
        }
        let tag = cap[1].to_lowercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

pub fn extract_priority(text: &str) -> u32 {
    PRIORITY_RE
        .captures_iter(text)
        .filter_map(|cap| cap[1].parse::<u32>().ok())
        .filter(|p| *p > 0)
        .min()
        .unwrap_or(0)
}

pub fn extract_due(text: &str) -> Option<NaiveDate> {
    DUE_RE
        .captures_iter(text)
        .filter_map(|cap| NaiveDate::parse_from_str(&cap[1], "%Y-%m-%d").ok())
        .min()
}

use crate::model::document::Document;
use crate::model::task::TaskId;

/// Fuzzy-match `query` as a subsequence of `target`, case-insensitively.
///
/// Returns the score and the matched char indices, or `None` when some query
/// char has no match. Scoring: +10 per match at a word start, +5 per match
/// directly after the previous one, +3 per match in the first half of the
/// target, minus the gap length between consecutive matches.
pub fn fuzzy_score(query: &str, target: &str) -> Option<(i32, Vec<usize>)> {
    if query.is_empty() {
        return Some((0, vec![]));
    }

    let query_lower: Vec<char> = query.chars().flat_map(|c| c.to_lowercase()).collect();
    let target_chars: Vec<char> = target.chars().collect();
    let target_lower: Vec<char> = target_chars
        .iter()
        .map(|c| c.to_lowercase().next().unwrap_or(*c))
        .collect();

    let mut matched = Vec::with_capacity(query_lower.len());
    let mut from = 0;
    for &qc in &query_lower {
        let pos = target_lower.get(from..)?.iter().position(|&tc| tc == qc)?;
        matched.push(from + pos);
        from += pos + 1;
    }

    let half = target_chars.len() / 2;
    let mut score: i32 = 0;
    for (mi, &idx) in matched.iter().enumerate() {
        let word_start = idx == 0
            || matches!(
                target_chars.get(idx - 1),
                Some(' ' | '-' | '(' | ':' | '#' | '@')
            );
        if word_start {
            score += 10;
        }
        if mi > 0 && idx == matched[mi - 1] + 1 {
            score += 5;
        }
        if idx < half {
            score += 3;
        }
        if mi > 0 {
            score -= idx.saturating_sub(matched[mi - 1] + 1) as i32;
        }
    }

    Some((score, matched))
}

/// A task matching a search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMatch {
    pub id: TaskId,
    pub index: usize,
    pub score: i32,
    /// Matched char indices into the task text
    pub positions: Vec<usize>,
}

/// Rank all tasks against `query`, best first; ties keep document order.
/// An empty query yields no matches.
pub fn search_tasks(doc: &Document, query: &str) -> Vec<TaskMatch> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<TaskMatch> = doc
        .tasks()
        .enumerate()
        .filter_map(|(index, task)| {
            let (score, positions) = fuzzy_score(query, &task.text)?;
            Some(TaskMatch {
                id: task.id,
                index,
                score,
                positions,
            })
        })
        .collect();
    hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.index.cmp(&b.index)));
    hits
}

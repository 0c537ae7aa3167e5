use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Terminal cells taken by `s`; a tab counts as 4
pub fn display_width(s: &str) -> usize {
    s.graphemes(true).map(grapheme_width).sum()
}

fn grapheme_width(g: &str) -> usize {
    if g == "\t" { 4 } else { UnicodeWidthStr::width(g) }
}

/// Cut `s` to at most `max` cells, ending in `…` when shortened
pub fn truncate_to_width(s: &str, max: usize) -> String {
    if display_width(s) <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for g in s.graphemes(true) {
        let w = grapheme_width(g);
        if used + w > max - 1 {
            break;
        }
        used += w;
        out.push_str(g);
    }
    out.push('\u{2026}');
    out
}

/// Greedy word wrap into rows of at most `width` cells. Words wider than a
/// row are split at grapheme boundaries. Always yields at least one row.
pub fn wrap_to_width(s: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows: Vec<String> = Vec::new();
    let mut row = String::new();
    let mut used = 0;

    for word in s.split_word_bounds() {
        let w = display_width(word);
        if used + w <= width {
            row.push_str(word);
            used += w;
            continue;
        }
        if word.trim().is_empty() {
            // Break at the space instead of carrying it to the next row
            rows.push(finish(&mut row));
            used = 0;
            continue;
        }
        if used > 0 && w <= width {
            rows.push(finish(&mut row));
            row.push_str(word);
            used = w;
            continue;
        }
        for g in word.graphemes(true) {
            let gw = grapheme_width(g);
            if used + gw > width && used > 0 {
                rows.push(finish(&mut row));
                used = 0;
            }
            row.push_str(g);
            used += gw;
        }
    }
    if !row.is_empty() || rows.is_empty() {
        rows.push(finish(&mut row));
    }
    rows
}

fn finish(row: &mut String) -> String {
    let mut done = std::mem::take(row);
    done.truncate(done.trim_end().len());
    done
}

/// Single-line text input with a grapheme-aware cursor (byte offset)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    text: String,
    cursor: usize,
}

impl EditBuffer {
    pub fn new(text: &str) -> Self {
        EditBuffer {
            text: text.to_string(),
            cursor: text.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cursor position in display cells
    pub fn cursor_col(&self) -> usize {
        display_width(&self.text[..self.cursor])
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn insert_str(&mut self, s: &str) {
        self.text.insert_str(self.cursor, s);
        self.cursor += s.len();
    }

    /// Delete the grapheme before the cursor
    pub fn backspace(&mut self) -> bool {
        let Some(start) = self.prev_boundary() else {
            return false;
        };
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
        true
    }

    /// Delete the grapheme under the cursor
    pub fn delete(&mut self) -> bool {
        let Some(end) = self.next_boundary() else {
            return false;
        };
        self.text.replace_range(self.cursor..end, "");
        true
    }

    pub fn left(&mut self) {
        if let Some(p) = self.prev_boundary() {
            self.cursor = p;
        }
    }

    pub fn right(&mut self) {
        if let Some(p) = self.next_boundary() {
            self.cursor = p;
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Delete back to the start of the previous word
    pub fn delete_word(&mut self) {
        let prefix = &self.text[..self.cursor];
        let trimmed = prefix.trim_end();
        let start = trimmed
            .rfind(char::is_whitespace)
            .map(|i| i + trimmed[i..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(0);
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor].grapheme_indices(true).next_back().map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.text[self.cursor..]
            .graphemes(true)
            .next()
            .map(|g| self.cursor + g.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn width_counts_wide_chars_and_tabs() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("日本"), 4);
        assert_eq!(display_width("a\tb"), 6);
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("hello world", 6), "hello\u{2026}");
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("日本語", 4), "日\u{2026}");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn wrap_breaks_at_spaces() {
        assert_eq!(wrap_to_width("buy milk and eggs", 9), vec!["buy milk", "and eggs"]);
        assert_eq!(wrap_to_width("", 5), vec![""]);
    }

    #[test]
    fn wrap_splits_long_words() {
        assert_eq!(wrap_to_width("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn edit_buffer_moves_by_grapheme() {
        let mut b = EditBuffer::new("ae\u{301}x");
        b.left();
        b.left();
        assert_eq!(b.cursor(), 1);
        b.delete();
        assert_eq!(b.as_str(), "ax");
        b.insert('é');
        assert_eq!(b.as_str(), "aéx");
        assert!(b.backspace());
        assert_eq!(b.as_str(), "ax");
        b.home();
        assert!(!b.backspace());
    }

    #[test]
    fn delete_word_removes_previous_word() {
        let mut b = EditBuffer::new("call the bank  ");
        b.delete_word();
        assert_eq!(b.as_str(), "call the ");
        b.delete_word();
        assert_eq!(b.as_str(), "call ");
        b.delete_word();
        assert_eq!(b.as_str(), "");
    }
}

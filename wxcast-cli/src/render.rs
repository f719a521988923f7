//! Terminal rendering of records and styled strings.

use crossterm::style::{Color, Stylize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use wxcast_core::{Field, Record};

/// Total width a rendered record line is wrapped to.
pub const LINE_WIDTH: usize = 82;

/// Separator between key and value: `key:  value`.
const SEPARATOR: &str = ":  ";

/// Narrowest value column when very long keys eat the line.
const MIN_VALUE_WIDTH: usize = 10;

pub mod colors {
    use super::Color;

    pub const KEY: Color = Color::Green;
    pub const VALUE: Color = Color::Blue;
    pub const MESSAGE: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordStyle {
    pub key_color: Color,
    pub value_color: Color,
    /// Alignment width. `None` (or 0) means the longest key of the record.
    pub spaces: Option<usize>,
}

impl Default for RecordStyle {
    fn default() -> Self {
        Self {
            key_color: colors::KEY,
            value_color: colors::VALUE,
            spaces: None,
        }
    }
}

impl RecordStyle {
    pub fn with_spaces(spaces: usize) -> Self {
        Self {
            spaces: Some(spaces),
            ..Self::default()
        }
    }
}

/// Display width of the widest direct key; 0 for an empty record.
pub fn longest_key_length(record: &Record) -> usize {
    record.keys().map(UnicodeWidthStr::width).max().unwrap_or(0)
}

/// `text` wrapped in `fg`, or unchanged when color is off.
pub fn render_styled(text: &str, color: bool, fg: Color) -> String {
    if !color {
        return text.to_string();
    }
    format!("{}", text.with(fg))
}

/// Render `record` as right-aligned `key:  value` lines.
///
/// Values wrap at [`LINE_WIDTH`] minus the alignment width, continuation
/// lines start under the value column. Nested records are rendered in place
/// (their own key is not printed) using the width computed for the
/// outermost record.
pub fn render_record(record: &Record, color: bool, style: &RecordStyle) -> String {
    let spaces = match style.spaces {
        Some(n) if n > 0 => n,
        _ => longest_key_length(record),
    };

    let mut out = String::new();
    render_into(&mut out, record, color, style, spaces);
    out
}

fn render_into(out: &mut String, record: &Record, color: bool, style: &RecordStyle, spaces: usize) {
    let indent = spaces + SEPARATOR.len();
    let first_width = LINE_WIDTH.saturating_sub(spaces).max(MIN_VALUE_WIDTH);
    let rest_width = first_width.saturating_sub(indent).max(MIN_VALUE_WIDTH);

    for (key, field) in record.iter() {
        let value = match field {
            Field::Record(nested) => {
                render_into(out, nested, color, style, spaces);
                continue;
            }
            Field::Text(value) => value,
        };

        let padding = " ".repeat(spaces.saturating_sub(key.width()));
        let title = format!("{padding}{key}{SEPARATOR}");
        out.push_str(&render_styled(&title, color, style.key_color));

        for (n, line) in wrap(value, first_width, rest_width).iter().enumerate() {
            if n > 0 {
                out.push('\n');
                out.push_str(&" ".repeat(indent));
            }
            out.push_str(&render_styled(line, color, style.value_color));
        }
        out.push('\n');
    }
}

/// Greedy word wrap. Whitespace runs collapse to one space; words wider than
/// a line are split. Always returns at least one (possibly empty) line.
pub fn wrap(text: &str, first_width: usize, rest_width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let mut word = word;

        while !word.is_empty() {
            let limit = if lines.is_empty() { first_width } else { rest_width };
            let word_width = word.width();
            let needed = if current.is_empty() {
                word_width
            } else {
                current_width + 1 + word_width
            };

            if needed <= limit {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_width = needed;
                break;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
                continue;
            }

            let (head, tail) = split_at_width(word, limit);
            lines.push(head.to_string());
            word = tail;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split so the head fits in `limit` columns, keeping at least one char.
fn split_at_width(word: &str, limit: usize) -> (&str, &str) {
    let mut width = 0;
    for (idx, ch) in word.char_indices() {
        width += ch.width().unwrap_or(0);
        if width > limit && idx > 0 {
            return word.split_at(idx);
        }
    }
    (word, "")
}

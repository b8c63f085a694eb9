//! Terminal rendering: tables, timestamps and small text helpers.

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use serde_json::Value;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Columns never shrink below this many cells when fitting the terminal.
const MIN_COLUMN_WIDTH: usize = 8;
const COLUMN_GAP: &str = "  ";

/// A plain-text table sized to the terminal.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    /// Add a row; missing cells render empty, extra cells are dropped.
    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Render to a string no wider than `max_width` (best effort).
    pub fn render(&self, max_width: usize, color: bool) -> String {
        let widths = self.column_widths(max_width);
        let mut out = String::new();

        let header = Self::format_row(self.headers.iter().copied(), &widths);
        if color {
            out.push_str(&dim(&header));
        } else {
            out.push_str(&header);
        }
        out.push('\n');

        for row in &self.rows {
            let cells = (0..widths.len()).map(|i| row.get(i).map_or("", String::as_str));
            out.push_str(&Self::format_row(cells, &widths));
            out.push('\n');
        }
        out
    }

    pub fn print(&self, color: bool) {
        print!("{}", self.render(term_width(), color));
    }

    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.width());
            }
        }

        let gaps = COLUMN_GAP.len() * widths.len().saturating_sub(1);
        loop {
            let total: usize = widths.iter().sum::<usize>() + gaps;
            if total <= max_width {
                break;
            }
            let widest = widths
                .iter_mut()
                .filter(|w| **w > MIN_COLUMN_WIDTH)
                .max_by_key(|w| **w);
            match widest {
                Some(w) => *w = w.saturating_sub(total - max_width).max(MIN_COLUMN_WIDTH),
                None => break,
            }
        }
        widths
    }

    fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
        let mut line = String::new();
        for (i, (cell, &width)) in cells.zip(widths).enumerate() {
            if i > 0 {
                line.push_str(COLUMN_GAP);
            }
            let fitted = truncate(&single_line(cell), width);
            let pad = width.saturating_sub(fitted.width());
            let _ = write!(line, "{fitted}{:pad$}", "");
        }
        line.trim_end().to_string()
    }
}

/// Terminal width, clamped to a reasonable range.
pub fn term_width() -> usize {
    terminal_size::terminal_size()
        .map_or(120, |(w, _)| usize::from(w.0))
        .clamp(40, 240)
}

/// Cut `s` to at most `max` display cells, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let budget = max.saturating_sub(3);
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(&".".repeat(max.min(3)));
    out
}

/// Collapse line breaks so a value fits in one table cell.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

/// Format a Slack message timestamp (`1234567890.123456`) as local time.
pub fn format_ts(ts: &str) -> String {
    ts.split('.')
        .next()
        .and_then(|secs| secs.parse::<i64>().ok())
        .map_or_else(|| ts.to_string(), format_unix)
}

/// Format seconds since the epoch as local `YYYY-MM-DD HH:MM`.
pub fn format_unix(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0).map_or_else(
        || secs.to_string(),
        |utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// Read a string at a JSON pointer, or `default` when absent.
pub fn str_at<'a>(value: &'a Value, pointer: &str, default: &'a str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or(default)
}

/// Read a string field, or `default` when absent.
pub fn str_field<'a>(value: &'a Value, key: &str, default: &'a str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Print a value as pretty JSON.
pub fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("日本語テキスト", 7), "日本...");
        assert_eq!(truncate("abcdef", 2), "..");
    }

    #[test]
    fn single_line_collapses_whitespace() {
        assert_eq!(single_line("line one\nline two\t end"), "line one line two end");
    }

    #[test]
    fn table_pads_columns() {
        let mut table = Table::new(&["ID", "Name"]);
        table.push(vec!["C1".to_string(), "general".to_string()]);
        table.push(vec!["C22".to_string(), "random".to_string()]);

        let rendered = table.render(80, false);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, ["ID   Name", "C1   general", "C22  random"]);
    }

    #[test]
    fn table_shrinks_widest_column_to_fit() {
        let mut table = Table::new(&["ID", "Text"]);
        table.push(vec!["C1".to_string(), "x".repeat(100)]);

        let rendered = table.render(40, false);
        for line in rendered.lines() {
            assert!(line.width() <= 40, "{line}");
        }
        assert!(rendered.contains("..."));
    }

    #[test]
    fn table_tolerates_short_rows() {
        let mut table = Table::new(&["A", "B", "C"]);
        table.push(vec!["only".to_string()]);
        assert!(table.render(80, false).contains("only"));
    }

    #[test]
    fn invalid_timestamp_is_shown_verbatim() {
        assert_eq!(format_ts("not-a-ts"), "not-a-ts");
        assert_eq!(format_ts("1234567890.123456").len(), "2009-02-13 23:31".len());
    }

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn json_accessors_default_when_missing() {
        let value = json!({"user": "alice", "channel": {"name": "general"}});
        assert_eq!(str_field(&value, "user", "-"), "alice");
        assert_eq!(str_field(&value, "team", "-"), "-");
        assert_eq!(str_at(&value, "/channel/name", "-"), "general");
        assert_eq!(str_at(&value, "/channel/topic", "-"), "-");
    }
}

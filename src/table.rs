use std::borrow::Cow;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Plain-text report table. Numeric columns are right-aligned and an
/// optional footer (the synthetic total row) sits below a second rule.
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    footer: Option<Vec<String>>,
}

impl TextTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            ..Self::default()
        }
    }

    pub fn with_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_footer(mut self, footer: Vec<String>) -> Self {
        self.footer = Some(footer);
        self
    }

    fn alignments(&self) -> Vec<Align> {
        (0..self.headers.len())
            .map(|idx| {
                let mut cells = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .filter(|cell| !cell.is_empty())
                    .peekable();
                if cells.peek().is_some() && cells.all(|cell| cell.parse::<f64>().is_ok()) {
                    Align::Right
                } else {
                    Align::Left
                }
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let column_count = self.headers.len();
        let mut widths = self
            .headers
            .iter()
            .map(|h| display_width(h))
            .collect::<Vec<_>>();
        for row in self.rows.iter().chain(self.footer.iter()) {
            for (idx, cell) in row.iter().enumerate().take(column_count) {
                widths[idx] = widths[idx].max(display_width(cell));
            }
        }
        for width in &mut widths {
            *width = (*width).max(3);
        }
        let aligns = self.alignments();
        let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        let left = vec![Align::Left; column_count];

        let mut output = String::new();
        let _ = writeln!(output, "{}", format_row(&self.headers, &widths, &left));
        let _ = writeln!(output, "{}", format_row(&rule, &widths, &left));
        for row in &self.rows {
            let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
        }
        if let Some(footer) = &self.footer {
            let _ = writeln!(output, "{}", format_row(&rule, &widths, &left));
            let _ = writeln!(output, "{}", format_row(footer, &widths, &aligns));
        }
        output
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let cells = widths
        .iter()
        .enumerate()
        .map(|(idx, width)| {
            let value = values.get(idx).map(String::as_str).unwrap_or("");
            let sanitized = sanitize_cell(value);
            let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
            match aligns.get(idx).copied().unwrap_or(Align::Left) {
                Align::Left => format!("{sanitized}{padding}"),
                Align::Right => format!("{padding}{sanitized}"),
            }
        })
        .collect::<Vec<_>>();
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().filter(|ch| !is_zero_width(*ch)).count()
}

/// Joiners and bidi marks common in Persian text take no terminal column.
fn is_zero_width(ch: char) -> bool {
    matches!(ch, '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}')
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn numbers_are_right_aligned_and_footer_is_ruled_off() {
        let table = TextTable::new(strings(&["part", "hours"]))
            .with_rows(vec![strings(&["P1", "12.5"]), strings(&["P22", "3"])])
            .with_footer(strings(&["total", "15.5"]));
        let rendered = table.render();
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "part   hours");
        assert_eq!(lines[2], "P1      12.5");
        assert_eq!(lines[3], "P22        3");
        assert_eq!(lines[4], "-----  -----");
        assert_eq!(lines[5], "total   15.5");
    }

    #[test]
    fn zero_width_joiners_do_not_widen_cells() {
        assert_eq!(display_width("می\u{200C}شود"), 5);
        assert_eq!(sanitize_cell("a\tb"), "a b");
    }
}

//! Converts assistant answers into display blocks.
//!
//! Only a small subset of Markdown is understood: `#`/`##` headings, pipe
//! tables, dash lists, `---` dividers and plain paragraphs. A
//! `## Quantitativos` section is lifted out and rendered as a metric table
//! ahead of everything else.

use std::{borrow::Cow, sync::LazyLock};

use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const QUANTITATIVOS_HEADING: &str = "## Quantitativos";
const UNIDENTIFIED: &str = "Não identificado";

static MARKDOWN_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?m)^#{1,6}\s",
        r"\*\*.*\*\*",
        r"\*.*\*",
        r"(?m)^-",
        r"(?m)^\|.*\|[ \t\r]*$",
        r"```",
        r"(?m)^[ \t]*---[ \t\r]*$",
    ])
    .expect("markdown detection patterns are valid")
});

static METRIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^- \*\*([^*]+)\*\*:?\s*(.+)").expect("metric line pattern is valid")
});

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\s*\.?-?\s*").expect("list marker pattern is valid"));

/// Styling applied to headings and to the paragraphs that follow them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum StyleHint {
    #[default]
    Default,
    Quantitativos,
    Relatorio,
    Insight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetricRow {
    pub(crate) metric: String,
    pub(crate) value: String,
    /// Set when the assistant reported the metric as `Não identificado`.
    pub(crate) is_unidentified: bool,
}

/// One renderable unit of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub(crate) enum Block {
    Heading {
        level: u8,
        text: String,
        style: StyleHint,
    },
    Paragraph {
        text: String,
        style: StyleHint,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    List {
        items: Vec<String>,
    },
    Divider {},
    MetricTable {
        rows: Vec<MetricRow>,
    },
}

/// Renders `content` into blocks. Never fails: anything not understood
/// ends up as a paragraph.
pub(crate) fn render(content: &str) -> Vec<Block> {
    let text = unwrap_response(content);
    if text.trim().is_empty() {
        return Vec::new();
    }
    if !is_markdown(&text) {
        return vec![Block::Paragraph {
            text: text.into_owned(),
            style: StyleHint::Default,
        }];
    }

    let mut reducer = Reducer::default();
    let remainder = match extract_quantitativos(&text) {
        Some((rows, remainder)) => {
            if !rows.is_empty() {
                reducer.blocks.push(Block::MetricTable { rows });
            }
            Cow::Owned(remainder)
        }
        None => Cow::Borrowed(text.as_ref()),
    };
    for line in remainder.lines() {
        reducer.feed(line);
    }
    reducer.finish()
}

/// Webhooks sometimes answer with `[{"output": "..."}]` instead of the
/// text itself.
pub(crate) fn unwrap_response(content: &str) -> Cow<'_, str> {
    json_output(content).map_or(Cow::Borrowed(content), Cow::Owned)
}

fn json_output(content: &str) -> Option<String> {
    let Value::Array(items) = serde_json::from_str::<Value>(content).ok()? else {
        return None;
    };
    let Value::Object(mut first) = items.into_iter().next()? else {
        return None;
    };
    match first.remove("output")? {
        Value::String(output) if !output.is_empty() => Some(output),
        _ => None,
    }
}

pub(crate) fn is_markdown(text: &str) -> bool {
    MARKDOWN_PATTERNS.is_match(text)
}

/// Splits off the `## Quantitativos` section, which runs up to the next
/// `##` heading or the end of the text.
fn extract_quantitativos(text: &str) -> Option<(Vec<MetricRow>, String)> {
    let start = text.find(QUANTITATIVOS_HEADING)?;
    let body_start = start + QUANTITATIVOS_HEADING.len();
    let end = text[body_start..]
        .find("\n##")
        .map_or(text.len(), |offset| body_start + offset);

    let rows = text[body_start..end].lines().filter_map(metric_row).collect();

    let mut remainder = String::with_capacity(text.len() - (end - start));
    remainder.push_str(&text[..start]);
    remainder.push_str(&text[end..]);
    Some((rows, remainder))
}

fn metric_row(line: &str) -> Option<MetricRow> {
    let caps = METRIC_LINE.captures(line.trim())?;
    let raw = caps[2].trim();
    let value = raw.strip_suffix('.').unwrap_or(raw).to_string();
    Some(MetricRow {
        metric: caps[1].trim().to_string(),
        is_unidentified: value == UNIDENTIFIED,
        value,
    })
}

/// The `##` section the reducer is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Body(StyleHint),
    /// Under a `##` heading outside the whitelist; its content is dropped.
    Skipped,
}

struct Reducer {
    blocks: Vec<Block>,
    table: Vec<String>,
    list: Vec<String>,
    section: Section,
}

impl Default for Reducer {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            table: Vec::new(),
            list: Vec::new(),
            section: Section::Body(StyleHint::Default),
        }
    }
}

impl Reducer {
    fn feed(&mut self, line: &str) {
        let trimmed = line.trim();
        let is_heading = trimmed.starts_with("# ") || trimmed.starts_with("## ");
        if self.section == Section::Skipped && !is_heading {
            return;
        }

        if trimmed.contains('|')
            && (!self.table.is_empty() || trimmed.contains("Métrica") || trimmed.contains("---"))
        {
            self.flush_list();
            self.table.push(trimmed.to_string());
            return;
        }
        self.flush_table();

        if trimmed == "---" {
            self.flush_list();
            self.blocks.push(Block::Divider {});
            return;
        }

        if trimmed.starts_with('-') && trimmed.len() > 1 {
            self.list.push(LIST_MARKER.replace(trimmed, "").into_owned());
            return;
        }
        if !trimmed.is_empty() {
            self.flush_list();
        }

        if let Some(title) = trimmed.strip_prefix("# ") {
            self.blocks.push(Block::Heading {
                level: 1,
                text: title.trim().to_string(),
                style: StyleHint::Default,
            });
            self.section = Section::Body(StyleHint::Default);
        } else if let Some(title) = trimmed.strip_prefix("## ") {
            // Only the whitelisted sections are shown; everything else
            // (Tendências, Dúvidas, ...) is hidden along with its content.
            self.section = match section_heading(title.trim()) {
                Some((text, style)) => {
                    self.blocks.push(Block::Heading {
                        level: 2,
                        text: text.to_string(),
                        style,
                    });
                    Section::Body(style)
                }
                None => Section::Skipped,
            };
        } else if !trimmed.is_empty() {
            let style = match self.section {
                Section::Body(hint @ (StyleHint::Insight | StyleHint::Relatorio)) => hint,
                _ => StyleHint::Default,
            };
            self.blocks.push(Block::Paragraph {
                text: trimmed.to_string(),
                style,
            });
        }
    }

    fn flush_table(&mut self) {
        if self.table.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.table);
        let mut rows = lines.iter().map(|line| split_row(line));
        let headers = rows.next().unwrap_or_default();
        // The second line is the `|---|---|` separator.
        let rows = rows.skip(1).collect();
        self.blocks.push(Block::Table { headers, rows });
    }

    fn flush_list(&mut self) {
        if self.list.is_empty() {
            return;
        }
        let items = std::mem::take(&mut self.list);
        self.blocks.push(Block::List { items });
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_table();
        self.flush_list();
        self.blocks
    }
}

fn section_heading(title: &str) -> Option<(&'static str, StyleHint)> {
    match title {
        "Quantitativos" => Some(("Quantitativos", StyleHint::Quantitativos)),
        "Relatorio" => Some(("Relatório", StyleHint::Relatorio)),
        "Insight da IA" => Some(("Insight da IA", StyleHint::Insight)),
        _ => None,
    }
}

fn split_row(line: &str) -> Vec<String> {
    let mut cells: Vec<String> = line.split('|').map(|cell| cell.trim().to_string()).collect();
    if cells.last().is_some_and(String::is_empty) {
        cells.pop();
    }
    if cells.first().is_some_and(String::is_empty) {
        cells.remove(0);
    }
    cells
}

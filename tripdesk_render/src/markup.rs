//! Lightweight markup used by the agent's replies.
//!
//! Supported: numbered list items with indented detail lines, `**bold**`
//! spans, and blank-line section breaks. Everything else is a paragraph.

use serde::Serialize;
use std::sync::OnceLock;

static LIST_ITEM_PATTERN: OnceLock<regex::Regex> = OnceLock::new();
static DETAIL_LABEL_PATTERN: OnceLock<regex::Regex> = OnceLock::new();

/// Labels that get differentiated rendering inside list-item details.
const DETAIL_LABELS: &[&str] = &[
    "Depart",
    "Departure",
    "Arrive",
    "Arrival",
    "Price",
    "Duration",
    "Stops",
    "Airline",
    "Flight",
    "Check-in",
    "Check-out",
    "Rating",
    "Location",
    "Total",
];

/// Columns of leading whitespace that mark a detail line.
const DETAIL_INDENT: usize = 2;
const TAB_WIDTH: usize = 4;

#[expect(
    clippy::expect_used,
    reason = "Static regex pattern validated at compile time"
)]
fn list_item_pattern() -> &'static regex::Regex {
    LIST_ITEM_PATTERN.get_or_init(|| {
        regex::Regex::new(r"^(\d+)\.\s+(\S.*)$")
            .expect("Static regex pattern is guaranteed to be valid")
    })
}

#[expect(
    clippy::expect_used,
    reason = "Static regex pattern validated at compile time"
)]
fn detail_label_pattern() -> &'static regex::Regex {
    DETAIL_LABEL_PATTERN.get_or_init(|| {
        regex::Regex::new(r"^([A-Za-z][A-Za-z -]*?)\s*:\s*(.*)$")
            .expect("Static regex pattern is guaranteed to be valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Span {
    Plain(String),
    Bold(String),
}

/// One indented line under a list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailLine {
    /// Canonical spelling of a recognized label, e.g. `Depart`.
    pub label: Option<&'static str>,
    /// The value after the label, or the whole line when unlabeled.
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayBlock {
    Paragraph {
        spans: Vec<Span>,
    },
    ListItem {
        index: u64,
        title: Vec<Span>,
        details: Vec<DetailLine>,
    },
    Spacer,
}

/// Render raw message text into display blocks in a single forward pass.
#[must_use]
pub fn render_markup(text: &str) -> Vec<DisplayBlock> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if is_blank(line) {
            let run_end = next_non_blank(&lines, i);
            // One spacer per blank run, and only between content.
            if i > 0 && run_end < lines.len() {
                blocks.push(DisplayBlock::Spacer);
            }
            i = run_end;
            continue;
        }

        if let Some((index, title)) = parse_list_item(line) {
            let (details, next) = collect_details(&lines, i + 1);
            blocks.push(DisplayBlock::ListItem {
                index,
                title: split_bold(title),
                details,
            });
            i = next;
            continue;
        }

        blocks.push(DisplayBlock::Paragraph {
            spans: split_bold(line.trim()),
        });
        i += 1;
    }

    blocks
}

/// Split text on `**` delimiter pairs into plain and bold spans.
///
/// A delimiter without a partner, or a pair enclosing nothing, stays in the
/// text literally.
#[must_use]
pub fn split_bold(text: &str) -> Vec<Span> {
    let parts: Vec<&str> = text.split("**").collect();
    let last = parts.len() - 1;
    let mut spans = Vec::new();
    let mut plain = String::new();

    for (i, part) in parts.iter().enumerate() {
        let opens_pair = i % 2 == 1;
        if !opens_pair {
            plain.push_str(part);
        } else if i == last {
            plain.push_str("**");
            plain.push_str(part);
        } else if part.is_empty() {
            plain.push_str("****");
        } else {
            if !plain.is_empty() {
                spans.push(Span::Plain(std::mem::take(&mut plain)));
            }
            spans.push(Span::Bold((*part).to_string()));
        }
    }

    if !plain.is_empty() {
        spans.push(Span::Plain(plain));
    }
    spans
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn next_non_blank(lines: &[&str], from: usize) -> usize {
    (from..lines.len())
        .find(|&j| !is_blank(lines[j]))
        .unwrap_or(lines.len())
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .map_while(|c| match c {
            ' ' => Some(1),
            '\t' => Some(TAB_WIDTH),
            _ => None,
        })
        .sum()
}

fn parse_list_item(line: &str) -> Option<(u64, &str)> {
    let caps = list_item_pattern().captures(line.trim_start())?;
    // Digits only, so overflow is the sole parse failure.
    let index = caps.get(1)?.as_str().parse().unwrap_or(u64::MAX);
    Some((index, caps.get(2)?.as_str().trim_end()))
}

/// Consume the detail lines of a list item starting at `from`. Returns the
/// details and the index of the first line not consumed.
fn collect_details(lines: &[&str], from: usize) -> (Vec<DetailLine>, usize) {
    let mut details = Vec::new();
    let mut j = from;

    while j < lines.len() {
        let line = lines[j];
        if is_blank(line) {
            // A blank line only belongs to the item if more details follow.
            let resume = next_non_blank(lines, j);
            if resume < lines.len() && indent_width(lines[resume]) >= DETAIL_INDENT {
                j = resume;
                continue;
            }
            break;
        }
        if indent_width(line) < DETAIL_INDENT {
            break;
        }
        details.push(parse_detail(line.trim()));
        j += 1;
    }

    (details, j)
}

fn parse_detail(line: &str) -> DetailLine {
    let labeled = detail_label_pattern().captures(line).and_then(|caps| {
        let label = caps.get(1)?.as_str();
        let canonical = DETAIL_LABELS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(label))?;
        Some((*canonical, caps.get(2).map_or("", |m| m.as_str())))
    });

    match labeled {
        Some((label, value)) => DetailLine {
            label: Some(label),
            spans: split_bold(value),
        },
        None => DetailLine {
            label: None,
            spans: split_bold(line),
        },
    }
}

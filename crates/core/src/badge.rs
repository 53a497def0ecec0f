// Status badge lookup
//
// Fixed status -> style table plus a generic label formatter.
// Unknown statuses render with the `created` style.

use serde::Serialize;

use crate::session::SessionStatus;

/// Colour family of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTone {
    Blue,
    Yellow,
    Purple,
    Green,
    Red,
}

impl BadgeTone {
    /// ANSI foreground colour escape for terminal rendering.
    pub fn ansi_code(&self) -> &'static str {
        match self {
            BadgeTone::Blue => "\x1b[34m",
            BadgeTone::Yellow => "\x1b[33m",
            BadgeTone::Purple => "\x1b[35m",
            BadgeTone::Green => "\x1b[32m",
            BadgeTone::Red => "\x1b[31m",
        }
    }
}

const ANSI_RESET: &str = "\x1b[0m";

const BADGE_TABLE: [(&str, BadgeTone); 5] = [
    ("created", BadgeTone::Blue),
    ("recording_uploaded", BadgeTone::Yellow),
    ("processing", BadgeTone::Purple),
    ("completed", BadgeTone::Green),
    ("error", BadgeTone::Red),
];

/// Rendered badge for a session status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub tone: BadgeTone,
    pub label: String,
}

impl StatusBadge {
    /// Render as `● Label`, optionally coloured.
    pub fn render(&self, color: bool) -> String {
        if color {
            format!("{}● {}{}", self.tone.ansi_code(), self.label, ANSI_RESET)
        } else {
            format!("● {}", self.label)
        }
    }
}

/// Look up the badge for a status. Unknown values fall back to the
/// `created` entry but keep their own label.
pub fn status_badge(status: &SessionStatus) -> StatusBadge {
    let raw = status.as_str();
    let tone = BADGE_TABLE
        .iter()
        .find(|(key, _)| *key == raw)
        .map(|(_, tone)| *tone)
        .unwrap_or(BADGE_TABLE[0].1);

    StatusBadge {
        tone,
        label: format_status_label(raw),
    }
}

/// Title-case a snake_case status: "recording_uploaded" -> "Recording Uploaded".
pub fn format_status_label(raw: &str) -> String {
    raw.replace('_', " ")
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

//! Signal-list renderer.
//!
//! Input is the raw multi-line text the administrator pastes after `/list`.
//! Lines split on `;`; a line becomes an entry only with at least four
//! fields. The first non-blank line may instead carry a timeframe label
//! before the first `;`. Malformed lines are skipped silently, and zero
//! valid entries still yields a body with header and footer.

use signalpost_core::messages;

/// Minimum `;`-separated fields for a line to count as a signal entry.
const MIN_FIELDS: usize = 4;

/// The assembled preview body plus what the parser found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedList {
    /// Full body: header, entries, footer. This exact text is what gets
    /// broadcast and logged on publish.
    pub body: String,
    pub entry_count: usize,
    pub timeframe: String,
}

/// Render raw draft text into a publishable list. Never fails.
pub fn render_list(raw: &str) -> RenderedList {
    let mut timeframe = messages::DEFAULT_TIMEFRAME.to_string();
    let mut entries: Vec<String> = Vec::new();
    let mut seen_first = false;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(';').map(str::trim).collect();
        let is_first = !seen_first;
        seen_first = true;

        if fields.len() >= MIN_FIELDS {
            entries.push(format!("📈 {}", fields.join(" | ")));
        } else if is_first && !fields[0].is_empty() {
            // Short first line: timeframe label, not a signal.
            timeframe = fields[0].to_string();
        }
        // Anything else is silently skipped.
    }

    let mut body = messages::list_header(&timeframe);
    for entry in &entries {
        body.push_str(entry);
        body.push('\n');
    }
    body.push_str(messages::LIST_FOOTER);

    RenderedList {
        body,
        entry_count: entries.len(),
        timeframe,
    }
}

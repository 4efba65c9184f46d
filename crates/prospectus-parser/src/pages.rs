//! Page splitting.
//!
//! Pages are delimited by `<!-- PAGE n -->` or `## Page n` markers
//! (case-insensitive). Page content runs from the end of a marker to the
//! start of the next one. A document without markers is a single page 1.

use std::sync::LazyLock;

static RE_PAGE_MARKER: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?mi)^(?:<!--\s*page\s+(\d+)\s*-->|##\s*page\s+(\d+))\s*$").unwrap()
});

/// Split a document body into `(page_number, content)` pairs, in document
/// order. Content is trimmed.
#[must_use]
pub fn split_pages(body: &str) -> Vec<(u32, String)> {
    let markers: Vec<(u32, usize, usize)> = RE_PAGE_MARKER
        .captures_iter(body)
        .filter_map(|caps| {
            let page = caps
                .get(1)
                .or_else(|| caps.get(2))?
                .as_str()
                .parse()
                .ok()?;
            let whole = caps.get(0)?;
            Some((page, whole.start(), whole.end()))
        })
        .collect();

    if markers.is_empty() {
        return vec![(1, body.trim().to_string())];
    }

    markers
        .iter()
        .enumerate()
        .map(|(idx, &(page, _, end))| {
            let content_end = markers
                .get(idx + 1)
                .map_or(body.len(), |&(_, next_start, _)| next_start);
            (page, body[end..content_end].trim().to_string())
        })
        .collect()
}

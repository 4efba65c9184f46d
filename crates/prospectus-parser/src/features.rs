//! Feature and USP section extraction.
//!
//! Locates `## Features` / `## USPs` style sections, parses their bullet
//! lists, infers a tag per bullet from a fixed keyword map, and emits each
//! bullet both as a structured record and as a `global` chunk prefixed for
//! keyword retrievability.

use std::sync::LazyLock;

use indexmap::IndexMap;
use serde_json::json;

use prospectus_core::model::{ChunkType, ParsedChunk, ParsedFeature, ParsedUsp};

static RE_FEATURES_SECTION: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?mi)^#{2,}\s*(?:key\s+features|features|highlights)\s*$").unwrap()
});
static RE_USP_SECTION: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?mi)^#{2,}\s*(?:usps?|unique\s+selling\s+points?|why\s+buy|why\s+choose)\b.*$")
        .unwrap()
});
static RE_ANY_HEADER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?m)^#{2,}\s+").unwrap());

/// Keyword → tag map for bullet classification. First match wins.
static TAG_KEYWORDS: &[(&str, &[&str])] = &[
    ("safety", &["airbag", "abs", "safety", "brake", "camera", "sensor", "alert", "iso-fix"]),
    ("comfort", &["comfort", "seat", "climate", "armrest", "legroom", "lumbar", "ventilat"]),
    (
        "technology",
        &["touchscreen", "carplay", "android", "bluetooth", "connect", "digital", "smart", "infotainment", "voice"],
    ),
    ("performance", &["engine", "power", "torque", "turbo", "acceleration", "drive mode", "paddle"]),
    ("efficiency", &["mileage", "efficien", "fuel", "economy", "hybrid", "regenerat"]),
    ("exterior", &["led", "lamp", "alloy", "wheel", "grille", "sunroof", "design", "chrome", "color"]),
];

/// Infer a tag for one bullet from the fixed keyword map.
#[must_use]
pub fn infer_tag(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    TAG_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(tag, _)| (*tag).to_string())
}

/// Bullet lines (`-` or `*`) of the section following a matched header,
/// up to the next header or end of page. Returns `(line_number, text)`.
fn section_bullets(page_text: &str, section: &regex::Regex) -> Vec<(u32, String)> {
    let Some(header) = section.find(page_text) else {
        return Vec::new();
    };
    let rest = &page_text[header.end()..];
    let section_end = RE_ANY_HEADER
        .find(rest)
        .map_or(rest.len(), |next| next.start());
    let header_line = page_text[..header.start()].lines().count();

    rest[..section_end]
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let trimmed = line.trim();
            let bullet = trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))?;
            let text = bullet.trim();
            if text.is_empty() {
                return None;
            }
            let line_no = u32::try_from(header_line + idx + 2).unwrap_or(u32::MAX);
            Some((line_no, text.to_string()))
        })
        .collect()
}

/// Build a `global` chunk for one prefixed bullet.
fn bullet_chunk(prefix: &str, text: &str, tag: Option<&str>, page: u32, line: u32) -> ParsedChunk {
    let mut metadata = IndexMap::new();
    if let Some(tag) = tag {
        metadata.insert("tag".to_string(), json!(tag));
    }
    ParsedChunk {
        text: format!("{prefix}{text}"),
        chunk_type: ChunkType::Global,
        source_page: page,
        start_line: line,
        end_line: line,
        metadata,
    }
}

/// Extract features from one page: structured records plus their chunks.
#[must_use]
pub fn extract_features(page_text: &str, page: u32) -> (Vec<ParsedFeature>, Vec<ParsedChunk>) {
    let mut features = Vec::new();
    let mut chunks = Vec::new();
    for (line, text) in section_bullets(page_text, &RE_FEATURES_SECTION) {
        let tag = infer_tag(&text);
        chunks.push(bullet_chunk("Key Feature: ", &text, tag.as_deref(), page, line));
        features.push(ParsedFeature {
            text,
            tag,
            source_page: page,
        });
    }
    (features, chunks)
}

/// Extract USPs from one page: structured records plus their chunks.
#[must_use]
pub fn extract_usps(page_text: &str, page: u32) -> (Vec<ParsedUsp>, Vec<ParsedChunk>) {
    let mut usps = Vec::new();
    let mut chunks = Vec::new();
    for (line, text) in section_bullets(page_text, &RE_USP_SECTION) {
        let tag = infer_tag(&text);
        chunks.push(bullet_chunk("USP: ", &text, tag.as_deref(), page, line));
        usps.push(ParsedUsp {
            text,
            tag,
            source_page: page,
        });
    }
    (usps, chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "\
## Key Features

- Six airbags as standard
- 9-inch touchscreen with Apple CarPlay
* LED projector headlamps

## Why Buy

- Best-in-class mileage of 25.49 kmpl

## Specifications
| Engine | Power | 88 bhp |";

    #[test]
    fn features_parsed_with_tags() {
        let (features, chunks) = extract_features(PAGE, 2);
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].tag.as_deref(), Some("safety"));
        assert_eq!(features[1].tag.as_deref(), Some("technology"));
        assert_eq!(features[2].tag.as_deref(), Some("exterior"));
        assert!(chunks[0].text.starts_with("Key Feature: Six airbags"));
        assert_eq!(chunks[0].chunk_type, ChunkType::Global);
        assert_eq!(chunks[0].source_page, 2);
    }

    #[test]
    fn usps_parsed_with_prefix() {
        let (usps, chunks) = extract_usps(PAGE, 2);
        assert_eq!(usps.len(), 1);
        assert_eq!(usps[0].tag.as_deref(), Some("efficiency"));
        assert!(chunks[0].text.starts_with("USP: Best-in-class mileage"));
    }

    #[test]
    fn section_stops_at_next_header() {
        let (usps, _) = extract_usps(PAGE, 1);
        assert!(usps.iter().all(|usp| !usp.text.contains("Power")));
    }

    #[test]
    fn missing_sections_yield_nothing() {
        let (features, chunks) = extract_features("plain prose only", 1);
        assert!(features.is_empty());
        assert!(chunks.is_empty());
    }

    #[test]
    fn untagged_bullets_have_no_tag() {
        assert_eq!(infer_tag("Something entirely generic"), None);
    }
}

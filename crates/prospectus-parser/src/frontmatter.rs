//! Frontmatter parsing.
//!
//! A document whose trimmed content starts with `---` carries a key/value
//! block terminated by the next `---` line. Keys are lowercased; unknown
//! keys are ignored; values are quote-stripped. An unclosed fence emits a
//! warning and leaves the content unchanged.

use prospectus_core::model::{BrochureMetadata, ParseError};

/// Result of the frontmatter stage: metadata plus the remaining body.
#[derive(Debug)]
pub struct FrontmatterOutcome<'a> {
    /// Parsed metadata (empty when no frontmatter block exists).
    pub metadata: BrochureMetadata,
    /// Document body after the closing fence.
    pub body: &'a str,
    /// Collected problems.
    pub errors: Vec<ParseError>,
}

/// Strip one layer of matching quotes from a value.
fn strip_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

/// Parse the optional frontmatter block off the front of a document.
#[must_use]
pub fn parse_frontmatter(content: &str) -> FrontmatterOutcome<'_> {
    let mut outcome = FrontmatterOutcome {
        metadata: BrochureMetadata::default(),
        body: content,
        errors: Vec::new(),
    };

    let trimmed = content.trim_start();
    if !trimmed.starts_with("---") {
        return outcome;
    }
    let offset = content.len() - trimmed.len();
    let after_open = match trimmed.find('\n') {
        Some(newline) => offset + newline + 1,
        // A lone fence line with no newline is an unclosed block
        None => {
            outcome
                .errors
                .push(ParseError::warning("frontmatter fence is not closed"));
            return outcome;
        }
    };

    // Locate the closing fence line
    let mut cursor = after_open;
    let mut close: Option<(usize, usize)> = None;
    for line in content[after_open..].split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']).trim() == "---" {
            close = Some((cursor, cursor + line.len()));
            break;
        }
        cursor += line.len();
    }
    let Some((close_start, close_end)) = close else {
        outcome
            .errors
            .push(ParseError::warning("frontmatter fence is not closed"));
        return outcome;
    };

    for line in content[after_open..close_start].lines() {
        let Some((raw_key, raw_value)) = line.split_once(':') else {
            continue;
        };
        let key = raw_key.trim().to_lowercase();
        let value = strip_quotes(raw_value);
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "title" => outcome.metadata.title = Some(value.to_string()),
            "product" | "product_name" | "product name" => {
                outcome.metadata.product_name = Some(value.to_string());
            }
            // A year that fails to parse is silently ignored
            "year" | "model_year" | "model year" => {
                outcome.metadata.model_year = value.parse().ok();
            }
            "locale" | "language" => outcome.metadata.locale = Some(value.to_string()),
            "market" => outcome.metadata.market = Some(value.to_string()),
            "trim" | "variant" => outcome.metadata.trim = Some(value.to_string()),
            "extractor" | "source" | "provenance" => {
                outcome.metadata.extractor = Some(value.to_string());
            }
            _ => {}
        }
    }

    outcome.body = &content[close_end..];
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospectus_core::model::ParseSeverity;

    #[test]
    fn parses_known_keys() {
        let doc = "---\ntitle: \"Grand Brochure\"\nproduct: Vitara\nyear: 2024\nlocale: en-IN\n---\nbody text";
        let outcome = parse_frontmatter(doc);
        assert_eq!(outcome.metadata.title.as_deref(), Some("Grand Brochure"));
        assert_eq!(outcome.metadata.product_name.as_deref(), Some("Vitara"));
        assert_eq!(outcome.metadata.model_year, Some(2024));
        assert_eq!(outcome.body.trim(), "body text");
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn bad_year_silently_ignored() {
        let doc = "---\nyear: twenty-four\n---\nbody";
        let outcome = parse_frontmatter(doc);
        assert_eq!(outcome.metadata.model_year, None);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn unknown_keys_ignored() {
        let doc = "---\nwhatever: x\nproduct: Swift\n---\nbody";
        let outcome = parse_frontmatter(doc);
        assert_eq!(outcome.metadata.product_name.as_deref(), Some("Swift"));
    }

    #[test]
    fn unclosed_fence_warns_and_passes_content_through() {
        let doc = "---\ntitle: Lost\nno closing fence here";
        let outcome = parse_frontmatter(doc);
        assert_eq!(outcome.body, doc);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].severity, ParseSeverity::Warning);
        assert!(outcome.metadata.title.is_none());
    }

    #[test]
    fn no_frontmatter_is_not_an_error() {
        let doc = "# Just a heading\nbody";
        let outcome = parse_frontmatter(doc);
        assert_eq!(outcome.body, doc);
        assert!(outcome.errors.is_empty());
    }
}

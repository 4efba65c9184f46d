//! Text canonicalization and content hashing.
//!
//! Row chunks are identified by a SHA-256 over their normalized structured
//! text: two chunks collide iff their normalized text is byte-identical.
//! Normalization is whitespace-only so that semantically irrelevant
//! differences (CRLF, indentation, run-on spaces) do not split identities.
//!
//! The markdown stripper feeds prose chunking: headers, emphasis, links,
//! images, and HTML comments are removed before paragraphs are split.

use sha2::{Digest, Sha256};
use std::sync::LazyLock;

// ────────────────────────────────────────────────────────────────────
// Whitespace normalization + hashing
// ────────────────────────────────────────────────────────────────────

/// Normalize text for hashing: trim outer whitespace, convert `\r\n`/`\r`
/// to `\n`, collapse every whitespace run to a single space.
#[must_use]
pub fn normalize_for_hash(text: &str) -> String {
    let unified = text.trim().replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut in_whitespace = false;
    for ch in unified.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(ch);
            in_whitespace = false;
        }
    }
    out
}

/// Hex SHA-256 over the normalized text (64 lowercase chars).
#[must_use]
pub fn content_hash(text: &str) -> String {
    let normalized = normalize_for_hash(text);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hex SHA-256 over raw bytes, used for document-source provenance.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ────────────────────────────────────────────────────────────────────
// Markdown stripping (prose chunking input)
// ────────────────────────────────────────────────────────────────────

/// Strip markdown ornaments to plain text.
///
/// Handles: HTML comments, headers, emphasis, links, images, inline code,
/// blockquotes, horizontal rules, list markers, and table separators.
#[must_use]
pub fn strip_markdown(input: &str) -> String {
    static RE_HTML_COMMENT: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"(?s)<!--.*?-->").unwrap());
    static RE_IMAGE: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"!\[([^\]]*)\]\([^)]+\)").unwrap());
    static RE_LINK: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"\[([^\]]*)\]\([^)]+\)").unwrap());
    static RE_HEADER: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"(?m)^#{1,6}\s+").unwrap());
    static RE_BOLD_ITALIC: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"\*{1,3}([^*]+)\*{1,3}").unwrap());
    static RE_UNDERSCORE_EMPHASIS: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"_{1,3}([^_]+)_{1,3}").unwrap());
    static RE_INLINE_CODE: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"`([^`]+)`").unwrap());
    static RE_BLOCKQUOTE: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"(?m)^>\s*").unwrap());
    static RE_HR: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"(?m)^[-*_]{3,}\s*$").unwrap());
    static RE_LIST_MARKER: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"(?m)^(\s*)[-*+]\s+").unwrap());
    static RE_ORDERED_LIST: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"(?m)^(\s*)\d+\.\s+").unwrap());
    static RE_TABLE_SEPARATOR: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"(?m)^\|?[\s:-]+\|[\s:\-|]+$").unwrap());

    let mut text = input.to_owned();
    text = RE_HTML_COMMENT.replace_all(&text, "").to_string();
    // Images before links: the image syntax embeds the link syntax
    text = RE_IMAGE.replace_all(&text, "$1").to_string();
    text = RE_LINK.replace_all(&text, "$1").to_string();
    text = RE_HEADER.replace_all(&text, "").to_string();
    text = RE_BOLD_ITALIC.replace_all(&text, "$1").to_string();
    text = RE_UNDERSCORE_EMPHASIS.replace_all(&text, "$1").to_string();
    text = RE_INLINE_CODE.replace_all(&text, "$1").to_string();
    text = RE_BLOCKQUOTE.replace_all(&text, "").to_string();
    text = RE_HR.replace_all(&text, "").to_string();
    text = RE_LIST_MARKER.replace_all(&text, "$1").to_string();
    text = RE_ORDERED_LIST.replace_all(&text, "$1").to_string();
    text = RE_TABLE_SEPARATOR.replace_all(&text, "").to_string();
    text
}

//! Chunk generation: table-row chunks and prose chunks.
//!
//! Row chunks reuse the table detection from [`crate::tables`] and carry
//! the wire-contract metadata bag plus a content hash over their
//! structured text. Prose chunks are built from ornament-stripped page
//! text, greedily packed to a byte budget with a word-boundary overlap
//! seed between consecutive chunks.

use indexmap::IndexMap;
use serde_json::{Value, json};

use prospectus_core::canonical::{content_hash, strip_markdown};
use prospectus_core::model::{
    ChunkType, DEFAULT_PARENT_CATEGORY, DEFAULT_SPECIFICATION_TYPE, DEFAULT_SUB_CATEGORY,
    ParsedChunk, meta_keys,
};

use crate::tables::TableRow;

// ────────────────────────────────────────────────────────────────────
// Row chunks
// ────────────────────────────────────────────────────────────────────

/// Build the structured key-value text for one table row.
///
/// Wire contract: `Category` / `Sub-Category` / `Specification` / `Value` /
/// `Additional Metadata` lines, with empty fields omitted entirely.
#[must_use]
pub fn row_chunk_text(row: &TableRow) -> String {
    let additional = row.additional_metadata();
    let fields = [
        ("Category", row.parent_category.as_str()),
        ("Sub-Category", row.sub_category.as_str()),
        ("Specification", row.spec_name.as_str()),
        ("Value", row.value.as_str()),
        ("Additional Metadata", additional.as_str()),
    ];
    fields
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the wire-contract metadata bag for one table row.
///
/// Empty category fields take their documented defaults; the raw cells are
/// kept under `table_column_1..5` for auditability. `parsed_spec_ids`
/// starts empty and is filled during persistence.
#[must_use]
pub fn row_chunk_metadata(row: &TableRow, text: &str) -> IndexMap<String, Value> {
    let parent = if row.parent_category.is_empty() {
        DEFAULT_PARENT_CATEGORY
    } else {
        &row.parent_category
    };
    let sub = if row.sub_category.is_empty() {
        DEFAULT_SUB_CATEGORY
    } else {
        &row.sub_category
    };
    let spec = if row.spec_name.is_empty() {
        DEFAULT_SPECIFICATION_TYPE
    } else {
        &row.spec_name
    };

    let mut metadata = IndexMap::new();
    metadata.insert(meta_keys::PARENT_CATEGORY.to_string(), json!(parent));
    metadata.insert(meta_keys::SUB_CATEGORY.to_string(), json!(sub));
    metadata.insert(meta_keys::SPECIFICATION_TYPE.to_string(), json!(spec));
    metadata.insert(meta_keys::VALUE.to_string(), json!(row.value));
    metadata.insert(
        meta_keys::ADDITIONAL_METADATA.to_string(),
        json!(row.additional_metadata()),
    );
    metadata.insert(meta_keys::CONTENT_HASH.to_string(), json!(content_hash(text)));
    metadata.insert(meta_keys::PARSED_SPEC_IDS.to_string(), json!([]));
    metadata.insert(
        meta_keys::EXPLANATION.to_string(),
        json!(format!("{} is {}.", spec, row.value)),
    );
    for (key, cell) in meta_keys::TABLE_COLUMNS.iter().zip(row.columns.iter()) {
        metadata.insert((*key).to_string(), json!(cell));
    }
    metadata
}

/// Convert accepted table rows on one page into row chunks.
#[must_use]
pub fn row_chunks(rows: &[TableRow], page: u32) -> Vec<ParsedChunk> {
    rows.iter()
        .map(|row| {
            let text = row_chunk_text(row);
            let metadata = row_chunk_metadata(row, &text);
            ParsedChunk {
                text,
                chunk_type: ChunkType::SpecRow,
                source_page: page,
                start_line: row.line,
                end_line: row.line,
                metadata,
            }
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────
// Prose chunks
// ────────────────────────────────────────────────────────────────────

/// The tail of a closed chunk used to seed the next one: the last
/// `overlap` bytes, snapped forward to the next word boundary.
fn overlap_seed(text: &str, overlap: usize) -> String {
    if overlap == 0 || text.len() <= overlap {
        return String::new();
    }
    let mut idx = text.len() - overlap;
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    let tail = &text[idx..];
    match tail.find(char::is_whitespace) {
        Some(ws) => tail[ws..].trim_start().to_string(),
        None => tail.to_string(),
    }
}

/// Chunk ornament-stripped page prose into byte-budgeted chunks.
///
/// Paragraphs (blank-line separated) are concatenated greedily up to
/// `chunk_size` bytes; each closed chunk seeds the next with its overlap
/// tail. Line numbers are tracked approximately and must not be relied on
/// across chunk boundaries.
#[must_use]
pub fn prose_chunks(
    page_text: &str,
    page: u32,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<ParsedChunk> {
    let cleaned = strip_markdown(page_text);
    let paragraphs: Vec<&str> = cleaned
        .split("\n\n")
        .map(str::trim)
        .filter(|para| !para.is_empty())
        .collect();

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut start_line: u32 = 1;
    let mut current_lines: usize = 0;

    let mut flush =
        |current: &mut String, start_line: &mut u32, current_lines: &mut usize, seed: bool| {
            let text = current.trim().to_string();
            if !text.is_empty() {
                let line_span = u32::try_from(text.lines().count().max(1)).unwrap_or(1);
                chunks.push(ParsedChunk {
                    text: text.clone(),
                    chunk_type: ChunkType::Global,
                    source_page: page,
                    start_line: *start_line,
                    end_line: *start_line + line_span - 1,
                    metadata: IndexMap::new(),
                });
            }
            let next = if seed {
                overlap_seed(current, chunk_overlap)
            } else {
                String::new()
            };
            *current = next;
            // Approximate: the cursor advances by the paragraph lines seen
            // so far, after the buffer reset
            *start_line += u32::try_from(*current_lines).unwrap_or(0);
            *current_lines = 0;
        };

    for para in paragraphs {
        if !current.is_empty() && current.len() + para.len() + 2 > chunk_size {
            flush(&mut current, &mut start_line, &mut current_lines, true);
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(para);
        current_lines += para.lines().count() + 1;
    }
    flush(&mut current, &mut start_line, &mut current_lines, false);
    chunks
}

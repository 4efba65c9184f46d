//! Spec-table extraction.
//!
//! Per line, a 5-column pipe match is attempted first, then 4, then 3.
//! Separator lines (`---`/`===`) and header rows are skipped. An empty
//! category cell inherits the sticky category from the row above.
//!
//! Five-column tables are ambiguous between
//! `{Parent, Sub, Spec, Value, Meta}` and
//! `{Category, Spec, Value, KeyFeatures, VariantAvailability}`.
//! The third cell decides: spec names run longer than five characters,
//! carry domain keywords, and never contain `>`, while values in the
//! second layout are short range expressions. The heuristic is known to
//! misclassify edge cases; rows it drops or mislabels are accepted as-is.

use std::sync::LazyLock;

use prospectus_core::categories::normalize_category;
use prospectus_core::model::ParsedSpec;
use prospectus_core::units::{
    is_known_unit, is_numeric_portion, is_single_char_unit, normalize_unit,
};

/// Confidence attached to table-extracted specs.
const TABLE_SPEC_CONFIDENCE: f64 = 0.9;

/// Keywords that mark a cell as a specification name during 5-column
/// disambiguation.
const SPEC_NAME_KEYWORDS: &[&str] = &[
    "color", "carplay", "android", "bluetooth", "speaker", "system", "feature",
];

/// Header tokens that mark a row as a table header.
const HEADER_TOKENS: &[&str] = &[
    "category",
    "parent category",
    "sub category",
    "sub-category",
    "specification",
    "spec",
    "value",
    "key features",
    "variant availability",
    "metadata",
    "additional metadata",
];

static RE_5_COL: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^\s*\|([^|]*)\|([^|]*)\|([^|]*)\|([^|]*)\|([^|]*)\|").unwrap()
});
static RE_4_COL: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^\s*\|([^|]*)\|([^|]*)\|([^|]*)\|([^|]*)\|\s*$").unwrap()
});
static RE_3_COL: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^\s*\|([^|]*)\|([^|]*)\|([^|]*)\|\s*$").unwrap()
});

/// One accepted table row, with its column layout already resolved.
#[derive(Debug, Clone)]
pub struct TableRow {
    /// Effective (sticky, normalized) parent category.
    pub parent_category: String,
    /// Sub-category cell (5-column parent/sub layout only).
    pub sub_category: String,
    /// Specification name.
    pub spec_name: String,
    /// Value cell.
    pub value: String,
    /// Key-features cell.
    pub key_features: String,
    /// Variant-availability cell.
    pub variant_availability: String,
    /// Raw cells as they appeared, padded to five columns.
    pub columns: [String; 5],
    /// In-page line number (1-based).
    pub line: u32,
    /// The raw line text.
    pub raw_text: String,
}

impl TableRow {
    /// The trailing metadata for the row chunk: the meta cell in the
    /// parent/sub layout, otherwise the non-empty feature/availability
    /// cells joined.
    #[must_use]
    pub fn additional_metadata(&self) -> String {
        let parts: Vec<&str> = [self.key_features.as_str(), self.variant_availability.as_str()]
            .into_iter()
            .filter(|cell| !cell.is_empty())
            .collect();
        parts.join("; ")
    }
}

/// Whether a cell reads as a specification name rather than a value.
fn is_spec_name_like(cell: &str) -> bool {
    let trimmed = cell.trim();
    if trimmed.len() > 5 {
        return true;
    }
    let lower = trimmed.to_lowercase();
    if SPEC_NAME_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return true;
    }
    !trimmed.contains('>')
}

/// Whether a row is a header row: any cell matches a header token.
fn is_header_row(cells: &[String]) -> bool {
    cells.iter().any(|cell| {
        let lower = cell.trim().to_lowercase();
        HEADER_TOKENS.contains(&lower.as_str())
    })
}

/// Split a line into pipe-delimited cells: 5 columns first, then 4, then
/// 3. Lines with more than five columns keep only the first five.
fn split_columns(line: &str) -> Option<Vec<String>> {
    for re in [&*RE_5_COL, &*RE_4_COL, &*RE_3_COL] {
        if let Some(caps) = re.captures(line) {
            return Some(
                (1..caps.len())
                    .map(|i| caps[i].trim().to_string())
                    .collect(),
            );
        }
    }
    None
}

/// Extract every accepted spec row from one page.
///
/// The sticky category carries across rows: a row with an empty category
/// cell belongs to the last non-empty one.
#[must_use]
pub fn extract_rows(page_text: &str) -> Vec<TableRow> {
    let mut rows = Vec::new();
    let mut current_category = String::new();

    for (idx, line) in page_text.lines().enumerate() {
        // Separator rows
        if line.contains("---") || line.contains("===") {
            continue;
        }
        let Some(cells) = split_columns(line) else {
            continue;
        };
        if is_header_row(&cells) {
            continue;
        }

        let (category_cell, sub_category, spec_name, value, key_features, variant_availability) =
            match cells.len() {
                5 => {
                    if is_spec_name_like(&cells[2]) {
                        // {Parent, Sub, Spec, Value, Meta}
                        (
                            cells[0].clone(),
                            cells[1].clone(),
                            cells[2].clone(),
                            cells[3].clone(),
                            String::new(),
                            cells[4].clone(),
                        )
                    } else {
                        // {Category, Spec, Value, KeyFeatures, VariantAvailability}
                        (
                            cells[0].clone(),
                            String::new(),
                            cells[1].clone(),
                            cells[2].clone(),
                            cells[3].clone(),
                            cells[4].clone(),
                        )
                    }
                }
                4 => (
                    cells[0].clone(),
                    String::new(),
                    cells[1].clone(),
                    cells[2].clone(),
                    cells[3].clone(),
                    String::new(),
                ),
                _ => (
                    cells[0].clone(),
                    String::new(),
                    cells[1].clone(),
                    cells[2].clone(),
                    String::new(),
                    String::new(),
                ),
            };

        if !category_cell.is_empty() {
            current_category = normalize_category(&category_cell);
        }
        // Rows without a name or value carry nothing retrievable
        if spec_name.is_empty() || value.is_empty() {
            continue;
        }

        let mut columns: [String; 5] = std::array::from_fn(|_| String::new());
        for (slot, cell) in columns.iter_mut().zip(cells.iter()) {
            slot.clone_from(cell);
        }

        rows.push(TableRow {
            parent_category: current_category.clone(),
            sub_category,
            spec_name,
            value,
            key_features,
            variant_availability,
            columns,
            line: u32::try_from(idx + 1).unwrap_or(u32::MAX),
            raw_text: line.to_string(),
        });
    }
    rows
}

/// Scan a value for a trailing unit token.
///
/// Space-separated tokens match the full multi-character unit list.
/// Single-character units (`L`, `m`) and suffix-attached units
/// (`25.49km/l`) additionally require a numeric portion.
#[must_use]
pub fn extract_unit(value: &str) -> Option<String> {
    static RE_SUFFIX_UNIT: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"^(-?[\d.,]+)\s*([A-Za-z][A-Za-z/·-]*)$").unwrap());

    let trimmed = value.trim();
    if let Some((head, last)) = trimmed.rsplit_once(char::is_whitespace) {
        if is_known_unit(last) {
            return Some(normalize_unit(last));
        }
        if is_single_char_unit(last) && is_numeric_portion(head) {
            return Some(normalize_unit(last));
        }
    }
    if let Some(caps) = RE_SUFFIX_UNIT.captures(trimmed) {
        let (numeric, unit) = (&caps[1], &caps[2]);
        if is_numeric_portion(numeric) && (is_known_unit(unit) || is_single_char_unit(unit)) {
            return Some(normalize_unit(unit));
        }
    }
    None
}

/// Numeric interpretation of a value after comma-stripping. Falls back to
/// the numeric prefix when a unit is attached.
#[must_use]
pub fn parse_numeric(value: &str) -> Option<f64> {
    let stripped = value.trim().replace(',', "");
    if let Ok(parsed) = stripped.parse::<f64>() {
        return Some(parsed);
    }
    // "25.49 km/l" / "25.49km/l": parse the leading numeric run
    let prefix: String = stripped
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if prefix.is_empty() || !prefix.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    prefix.parse::<f64>().ok()
}

/// Convert accepted rows on one page into [`ParsedSpec`] records.
#[must_use]
pub fn rows_to_specs(rows: &[TableRow], page: u32) -> Vec<ParsedSpec> {
    rows.iter()
        .map(|row| {
            let unit = extract_unit(&row.value);
            ParsedSpec {
                category: row.parent_category.clone(),
                name: row.spec_name.clone(),
                value: row.value.clone(),
                unit,
                key_features: row.key_features.clone(),
                variant_availability: row.variant_availability.clone(),
                numeric: parse_numeric(&row.value),
                confidence: TABLE_SPEC_CONFIDENCE,
                source_page: page,
                source_line: row.line,
                raw_text: row.raw_text.clone(),
            }
        })
        .collect()
}

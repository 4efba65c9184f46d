//! Post-parse validation.
//!
//! A separate pass over the parsed brochure that only ever emits warnings:
//! empty spec list, duplicate `(category, name)` specs, missing product
//! name. Duplicates stay in the output; downstream persistence keeps both.

use std::collections::HashMap;

use prospectus_core::model::{ParseError, ParsedBrochure};

/// Validate a parsed brochure, returning collected warnings.
#[must_use]
pub fn validate(brochure: &ParsedBrochure) -> Vec<ParseError> {
    let mut warnings = Vec::new();

    if brochure.specs.is_empty() {
        warnings.push(ParseError::warning("no specifications were parsed"));
    }

    if brochure.metadata.product_name.is_none() {
        warnings.push(ParseError::warning("product name is missing"));
    }

    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    for spec in &brochure.specs {
        let key = (spec.category.to_lowercase(), spec.name.to_lowercase());
        *seen.entry(key).or_insert(0) += 1;
    }
    for ((category, name), count) in seen {
        if count > 1 {
            warnings.push(ParseError::warning(format!(
                "duplicate spec ({category}, {name}) appears {count} times"
            )));
        }
    }

    warnings
}

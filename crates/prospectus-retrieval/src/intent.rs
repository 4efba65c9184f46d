//! Query intent detection.
//!
//! An explicit intent hint is always adopted; otherwise keyword patterns
//! classify the question. Comparison keywords win over question verbs,
//! which win over numeric-spec keywords; everything else is `general`.

use prospectus_core::model::QueryIntent;

/// Phrases that mark a comparison request.
const COMPARISON_KEYWORDS: &[&str] = &[
    "compare",
    "comparison",
    " vs ",
    " vs.",
    "versus",
    "difference between",
    "better than",
    "which is better",
];

/// Question verbs that mark free-form QA.
const QUESTION_VERBS: &[&str] = &[
    " what", " how", " why", " when", " where", " which", " who ", " does", " do ", " is ",
    " are ", " can ", " will ",
];

/// Numeric-spec keywords that mark a spec lookup.
const SPEC_KEYWORDS: &[&str] = &[
    "mileage",
    "kmpl",
    "power",
    "torque",
    "displacement",
    "price",
    "weight",
    "capacity",
    "dimension",
    "length",
    "width",
    "height",
    "wheelbase",
    "clearance",
    "speed",
    "range",
    "airbag",
    "bhp",
    "cc",
];

/// Classify a question. The hint, when present, wins.
#[must_use]
pub fn detect_intent(question: &str, hint: Option<QueryIntent>) -> QueryIntent {
    if let Some(hint) = hint {
        return hint;
    }
    let lower = format!(" {} ", question.trim().to_lowercase());
    if COMPARISON_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return QueryIntent::Comparison;
    }
    if QUESTION_VERBS.iter().any(|kw| lower.contains(kw)) {
        return QueryIntent::Qa;
    }
    if SPEC_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return QueryIntent::SpecLookup;
    }
    QueryIntent::General
}

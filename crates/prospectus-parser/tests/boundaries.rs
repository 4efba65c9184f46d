//! Boundary behaviors of the markdown parser.

use prospectus_core::model::{ChunkType, ParseSeverity};
use prospectus_parser::{ParserOptions, parse_brochure, validate};

fn parse(doc: &str) -> prospectus_core::model::ParsedBrochure {
    parse_brochure(doc, &ParserOptions::default())
}

#[test]
fn tables_with_fewer_than_three_columns_are_skipped() {
    let brochure = parse("| one | two |\n| single |\n");
    assert!(brochure.specs.is_empty());
    assert!(!brochure
        .raw_chunks
        .iter()
        .any(|chunk| chunk.chunk_type == ChunkType::SpecRow));
}

#[test]
fn tables_with_more_than_five_columns_keep_the_first_five() {
    let brochure = parse("| Exterior | Colors | Color | Red | Standard | sixth | seventh |\n");
    assert_eq!(brochure.specs.len(), 1);
    let row = brochure
        .raw_chunks
        .iter()
        .find(|chunk| chunk.chunk_type == ChunkType::SpecRow)
        .unwrap();
    assert!(row.meta_str("table_column_5").is_some());
    assert!(row.meta_str("table_column_6").is_none());
    assert!(!row.text.contains("sixth"));
}

#[test]
fn empty_value_with_nonempty_specification_is_dropped() {
    let brochure = parse("| Engine | Power | |\n");
    assert!(brochure.specs.is_empty());
}

#[test]
fn duplicate_specs_both_persist_with_a_warning() {
    let brochure = parse("| Engine | Power | 88 bhp |\n| Engine | Power | 90 bhp |\n");
    assert_eq!(brochure.specs.len(), 2);
    let warnings = validate(&brochure);
    assert!(warnings.iter().any(|warning| {
        warning.severity == ParseSeverity::Warning && warning.message.contains("duplicate spec")
    }));
}

#[test]
fn unclosed_frontmatter_passes_content_through() {
    let brochure = parse("---\ntitle: broken\n| Engine | Power | 88 bhp |\n");
    // The fence never closed: the warning is collected and the table line
    // is still reachable as content
    assert!(brochure
        .errors
        .iter()
        .any(|error| error.message.contains("not closed")));
    assert_eq!(brochure.specs.len(), 1);
}

#[test]
fn reparsing_yields_identical_hash_sets() {
    let doc = "\
<!-- PAGE 1 -->
| Exterior | Colors | Color | Red | Standard |
| Engine | Power | 88 bhp |
<!-- PAGE 2 -->
| Engine | Torque | 113 Nm |
";
    let hashes = |brochure: &prospectus_core::model::ParsedBrochure| -> Vec<String> {
        brochure
            .raw_chunks
            .iter()
            .filter_map(|chunk| chunk.content_hash().map(ToString::to_string))
            .collect()
    };
    let first = parse(doc);
    let second = parse(doc);
    assert_eq!(hashes(&first), hashes(&second));
    assert_eq!(hashes(&first).len(), 3);
}

#[test]
fn prose_chunks_do_not_promise_exact_lines() {
    let para = "This paragraph talks about the driving experience at length. ".repeat(5);
    let doc = format!("{para}\n\n{para}\n\n{para}");
    let brochure = parse(&doc);
    let prose: Vec<_> = brochure
        .raw_chunks
        .iter()
        .filter(|chunk| chunk.chunk_type == ChunkType::Global)
        .collect();
    assert!(prose.len() > 1);
    // Ordering and page attribution are the contract; exact line numbers
    // across chunk boundaries are not
    for chunk in &prose {
        assert_eq!(chunk.source_page, 1);
        assert!(chunk.start_line <= chunk.end_line);
    }
}

#[test]
fn five_column_disambiguation_reads_the_third_cell() {
    // A spec-name-like third cell selects the parent/sub layout
    let parent_sub = parse("| Exterior | Colors | Color | Red | Standard |\n");
    assert_eq!(parent_sub.specs[0].name, "Color");
    assert_eq!(parent_sub.specs[0].value, "Red");

    // A short range expression in the third cell selects the
    // category/spec/value layout
    let flat = parse("| Performance | Top Speed | >150 | Governed | All trims |\n");
    assert_eq!(flat.specs[0].name, "Top Speed");
    assert_eq!(flat.specs[0].value, ">150");
    assert_eq!(flat.specs[0].key_features, "Governed");
    assert_eq!(flat.specs[0].variant_availability, "All trims");
}

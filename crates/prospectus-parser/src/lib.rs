//! Markdown brochure parser.
//!
//! Transforms one markdown document (a brochure extracted from a PDF) into
//! a [`ParsedBrochure`]: frontmatter metadata, per-page content, structured
//! spec records, feature/USP bullets, and the heterogeneous chunk list.
//!
//! # Stages
//!
//! 1. Frontmatter ([`frontmatter`])
//! 2. Page splitting ([`pages`])
//! 3. Spec-table extraction ([`tables`])
//! 4. Row-chunk generation ([`chunks`])
//! 5. Feature/USP extraction ([`features`])
//! 6. Prose chunking ([`chunks`])
//!
//! Parse problems are collected on the brochure with a severity, never
//! raised; a separate [`validate`] pass adds document-level warnings.

#![forbid(unsafe_code)]

pub mod chunks;
pub mod features;
pub mod frontmatter;
pub mod pages;
pub mod tables;
pub mod validate;

use tracing::debug;

use prospectus_core::model::ParsedBrochure;

pub use validate::validate;

/// Parser knobs, usually taken from [`prospectus_core::Config`].
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Prose chunk budget in bytes.
    pub chunk_size: usize,
    /// Bytes of overlap seeded between consecutive prose chunks.
    pub chunk_overlap: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            chunk_size: prospectus_core::config::DEFAULT_CHUNK_SIZE,
            chunk_overlap: prospectus_core::config::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl From<&prospectus_core::Config> for ParserOptions {
    fn from(config: &prospectus_core::Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

/// Parse one markdown brochure.
///
/// Always returns a brochure; problems are collected on
/// [`ParsedBrochure::errors`] rather than raised.
#[must_use]
pub fn parse_brochure(markdown: &str, options: &ParserOptions) -> ParsedBrochure {
    let mut brochure = ParsedBrochure::default();

    let frontmatter = frontmatter::parse_frontmatter(markdown);
    brochure.metadata = frontmatter.metadata;
    brochure.errors.extend(frontmatter.errors);

    for (page, content) in pages::split_pages(frontmatter.body) {
        let rows = tables::extract_rows(&content);
        brochure.specs.extend(tables::rows_to_specs(&rows, page));
        brochure.raw_chunks.extend(chunks::row_chunks(&rows, page));

        let (features, feature_chunks) = features::extract_features(&content, page);
        brochure.features.extend(features);
        brochure.raw_chunks.extend(feature_chunks);

        let (usps, usp_chunks) = features::extract_usps(&content, page);
        brochure.usps.extend(usps);
        brochure.raw_chunks.extend(usp_chunks);

        brochure.raw_chunks.extend(chunks::prose_chunks(
            &content,
            page,
            options.chunk_size,
            options.chunk_overlap,
        ));

        brochure.source_pages.insert(page, content);
    }

    debug!(
        specs = brochure.specs.len(),
        features = brochure.features.len(),
        usps = brochure.usps.len(),
        chunks = brochure.raw_chunks.len(),
        errors = brochure.errors.len(),
        "parsed brochure"
    );
    brochure
}

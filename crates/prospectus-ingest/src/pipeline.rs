//! The ingestion pipeline.
//!
//! Drives one ingestion job end to end through nine strictly ordered
//! phases:
//!
//! 1. source acquisition (markdown file or external PDF extractor)
//! 2. parse
//! 3. validate (warnings only)
//! 4. document source record
//! 5. spec persistence with conflict detection
//! 6. feature/USP persistence (best-effort)
//! 7. chunk persistence + batched embedding (best-effort)
//! 8. lineage emission (best-effort)
//! 9. status resolution
//!
//! Phases 1–5 are fatal: a failure aborts the job with `status=failed`.
//! Later phases log and continue; the job succeeds even with conflicts or
//! embedding failures (conflicts still block downstream publish).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use prospectus_core::cancel::CancelContext;
use prospectus_core::canonical::sha256_hex;
use prospectus_core::config::Config;
use prospectus_core::error::{Error, Result};
use prospectus_core::ids::spec_value_id;
use prospectus_core::model::{
    DocumentSource, IngestionCounts, IngestionError, IngestionRequest, IngestionResult,
    JobStatus, ParseSeverity, ParsedBrochure, ParsedSpec, SpecStatus, SpecValue,
};
use prospectus_parser::{ParserOptions, parse_brochure, validate};
use prospectus_store::{
    ChunkStore, EmbeddingProvider, FeatureStore, KvCache, LineageWriter, SpecStore,
    SpecUpsertOutcome, VectorIndex,
};

use crate::chunk_persist::{ChunkScope, embed_chunks, persist_chunks};
use crate::extractor::PdfExtractor;
use crate::metrics::PipelineMetrics;

/// The ingestion pipeline and its collaborators.
///
/// Collaborators are shared with the retrieval router; each is safe for
/// concurrent use by its own contract. The pipeline itself holds no
/// mutable state beyond its metrics.
pub struct IngestionPipeline {
    config: Config,
    spec_store: Arc<dyn SpecStore>,
    feature_store: Arc<dyn FeatureStore>,
    chunk_store: Arc<dyn ChunkStore>,
    vector_index: Arc<dyn VectorIndex>,
    cache: Arc<dyn KvCache>,
    embedder: Arc<dyn EmbeddingProvider>,
    lineage: Arc<dyn LineageWriter>,
    extractor: PdfExtractor,
    metrics: Arc<PipelineMetrics>,
}

impl IngestionPipeline {
    /// Wire up a pipeline.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        spec_store: Arc<dyn SpecStore>,
        feature_store: Arc<dyn FeatureStore>,
        chunk_store: Arc<dyn ChunkStore>,
        vector_index: Arc<dyn VectorIndex>,
        cache: Arc<dyn KvCache>,
        embedder: Arc<dyn EmbeddingProvider>,
        lineage: Arc<dyn LineageWriter>,
    ) -> Self {
        let extractor = PdfExtractor::new(config.pdf_extractor_cmd.clone());
        Self {
            config,
            spec_store,
            feature_store,
            chunk_store,
            vector_index,
            cache,
            embedder,
            lineage,
            extractor,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Shared pipeline metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run one ingestion job. Always returns a populated result; fatal
    /// phase failures are reported through `status` and `errors`.
    pub fn ingest(&self, request: &IngestionRequest, cancel: &CancelContext) -> IngestionResult {
        let started = Instant::now();
        PipelineMetrics::add(&self.metrics.jobs_started, 1);

        let mut result = IngestionResult {
            status: JobStatus::Running,
            document: None,
            counts: IngestionCounts::default(),
            conflicting_specs: Vec::new(),
            errors: Vec::new(),
            duration_ms: 0,
        };

        match self.run_phases(request, cancel, &mut result) {
            Ok(()) => {
                result.status = JobStatus::Succeeded;
                PipelineMetrics::add(&self.metrics.jobs_succeeded, 1);
                // Cached query results predate this ingest
                let prefix = format!("{}:", request.tenant_id);
                if let Err(e) = self.cache.delete_by_prefix(&prefix) {
                    warn!(error = %e, "cache invalidation failed");
                }
            }
            Err(e) => {
                result.status = JobStatus::Failed;
                PipelineMetrics::add(&self.metrics.jobs_failed, 1);
                result.errors.push(IngestionError {
                    phase: "fatal".into(),
                    severity: ParseSeverity::Error,
                    message: e.to_string(),
                });
            }
        }

        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            status = ?result.status,
            specs_created = result.counts.specs_created,
            chunks_created = result.counts.chunks_created,
            conflicts = result.conflicting_specs.len(),
            duration_ms = result.duration_ms,
            "ingestion finished"
        );
        result
    }

    /// Re-embed every chunk on the retry surface for a tenant.
    pub fn retry_incomplete_embeddings(
        &self,
        tenant_id: Uuid,
        cancel: &CancelContext,
    ) -> Result<crate::chunk_persist::EmbedOutcome> {
        let pending = self.chunk_store.pending_embedding(tenant_id)?;
        Ok(embed_chunks(
            self.chunk_store.as_ref(),
            self.vector_index.as_ref(),
            self.embedder.as_ref(),
            &pending,
            self.config.embedding_batch_size,
            &self.metrics,
            cancel,
        ))
    }

    fn run_phases(
        &self,
        request: &IngestionRequest,
        cancel: &CancelContext,
        result: &mut IngestionResult,
    ) -> Result<()> {
        // Phase 1: source acquisition (fatal)
        cancel.check("ingestion")?;
        let (content, source_path) = self.acquire_source(request, cancel)?;

        // Phase 2: parse (fatal); parser problems accumulate as warnings
        let brochure = parse_brochure(&content, &ParserOptions::from(&self.config));
        collect_parse_errors(result, "parse", &brochure.errors);

        // Phase 3: validate (warnings only)
        collect_parse_errors(result, "validate", &validate(&brochure));

        // Phase 4: document source record (fatal)
        let document = self.document_record(request, &content, &source_path)?;
        result.document = Some(document.clone());

        // Phase 5: spec persistence (fatal)
        cancel.check("spec persistence")?;
        self.persist_specs(request, &brochure, document.id, result)?;

        // Phase 6: feature/USP persistence (best-effort)
        self.persist_features(request, &brochure, document.id, result);

        // Phase 7: chunk persistence + embedding (best-effort)
        self.persist_and_embed_chunks(request, &brochure, document.id, result, cancel);

        // Phase 8: lineage emission (best-effort)
        self.lineage.record(
            "ingestion",
            request.tenant_id,
            json!({
                "product_id": request.product_id.to_string(),
                "document_id": document.id.to_string(),
                "operator": request.operator,
                "specs_created": result.counts.specs_created,
                "specs_updated": result.counts.specs_updated,
                "chunks_created": result.counts.chunks_created,
                "chunks_deduplicated": result.counts.chunks_deduplicated,
                "conflicts": result.conflicting_specs.len(),
            }),
        );

        Ok(())
    }

    /// Phase 1: read markdown directly or route a PDF through the
    /// external extractor. Exactly one source is required.
    fn acquire_source(
        &self,
        request: &IngestionRequest,
        cancel: &CancelContext,
    ) -> Result<(String, PathBuf)> {
        match (&request.markdown_path, &request.pdf_path) {
            (Some(markdown), None) => Ok((std::fs::read_to_string(markdown)?, markdown.clone())),
            (None, Some(pdf)) => {
                let output = std::env::temp_dir()
                    .join(format!("prospectus-extract-{}.md", Uuid::new_v4()));
                self.extractor.extract(pdf, &output, cancel)?;
                let content = std::fs::read_to_string(&output)?;
                let _ = std::fs::remove_file(&output);
                Ok((content, pdf.clone()))
            }
            (Some(_), Some(_)) => Err(Error::Config(
                "both markdown_path and pdf_path were given; exactly one is required".into(),
            )),
            (None, None) => Err(Error::Config(
                "no content source: one of markdown_path or pdf_path is required".into(),
            )),
        }
    }

    /// Phase 4: provenance record over the raw source content.
    fn document_record(
        &self,
        request: &IngestionRequest,
        content: &str,
        source_path: &Path,
    ) -> Result<DocumentSource> {
        let absolute = source_path
            .canonicalize()
            .unwrap_or_else(|_| source_path.to_path_buf());
        Ok(DocumentSource {
            id: Uuid::new_v4(),
            tenant_id: request.tenant_id,
            product_id: request.product_id,
            campaign_variant_id: request.campaign_id,
            content_sha256: sha256_hex(content.as_bytes()),
            storage_uri: format!("file://{}", absolute.display()),
            operator: request.operator.clone(),
            created_at: Utc::now(),
        })
    }

    /// Phase 5: one deterministic-identity upsert per parsed spec.
    fn persist_specs(
        &self,
        request: &IngestionRequest,
        brochure: &ParsedBrochure,
        source_doc_id: Uuid,
        result: &mut IngestionResult,
    ) -> Result<()> {
        for spec in &brochure.specs {
            let value = build_spec_value(request, spec, source_doc_id);
            let outcome = self.spec_store.upsert(
                value,
                self.config.conflict_confidence_threshold,
                request.overwrite,
            )?;
            PipelineMetrics::add(&self.metrics.specs_persisted, 1);
            match outcome {
                SpecUpsertOutcome::Created(_) => result.counts.specs_created += 1,
                SpecUpsertOutcome::Updated(_) => result.counts.specs_updated += 1,
                SpecUpsertOutcome::Conflicted(id) => {
                    PipelineMetrics::add(&self.metrics.spec_conflicts, 1);
                    result.counts.specs_updated += 1;
                    result.conflicting_specs.push(id);
                    result.errors.push(IngestionError {
                        phase: "spec_persistence".into(),
                        severity: ParseSeverity::Warning,
                        message: format!(
                            "spec ({}, {}) disagrees with the active value",
                            spec.category, spec.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Phase 6: best-effort feature/USP persistence.
    fn persist_features(
        &self,
        request: &IngestionRequest,
        brochure: &ParsedBrochure,
        source_doc_id: Uuid,
        result: &mut IngestionResult,
    ) {
        match self.feature_store.insert_features(
            request.tenant_id,
            request.product_id,
            source_doc_id,
            &brochure.features,
        ) {
            Ok(count) => result.counts.features = count,
            Err(e) => {
                warn!(error = %e, "feature persistence failed");
                result.errors.push(IngestionError {
                    phase: "feature_persistence".into(),
                    severity: ParseSeverity::Warning,
                    message: e.to_string(),
                });
            }
        }
        match self.feature_store.insert_usps(
            request.tenant_id,
            request.product_id,
            source_doc_id,
            &brochure.usps,
        ) {
            Ok(count) => result.counts.usps = count,
            Err(e) => {
                warn!(error = %e, "usp persistence failed");
                result.errors.push(IngestionError {
                    phase: "usp_persistence".into(),
                    severity: ParseSeverity::Warning,
                    message: e.to_string(),
                });
            }
        }
    }

    /// Phase 7: chunk persistence with dedup, then batched embedding.
    fn persist_and_embed_chunks(
        &self,
        request: &IngestionRequest,
        brochure: &ParsedBrochure,
        source_doc_id: Uuid,
        result: &mut IngestionResult,
        cancel: &CancelContext,
    ) {
        let scope = ChunkScope {
            tenant_id: request.tenant_id,
            product_id: request.product_id,
            campaign_variant_id: request.campaign_id,
            source_doc_id,
        };
        let persisted = persist_chunks(self.chunk_store.as_ref(), brochure, scope, &self.metrics);
        result.counts.chunks_created = persisted.created;
        result.counts.chunks_deduplicated = persisted.deduplicated;
        for message in persisted.errors {
            result.errors.push(IngestionError {
                phase: "chunk_persistence".into(),
                severity: ParseSeverity::Warning,
                message,
            });
        }

        let pending: Vec<_> = persisted
            .pending
            .iter()
            .filter_map(|id| {
                self.chunk_store
                    .get(request.tenant_id, *id)
                    .ok()
                    .flatten()
            })
            .collect();
        let embedded = embed_chunks(
            self.chunk_store.as_ref(),
            self.vector_index.as_ref(),
            self.embedder.as_ref(),
            &pending,
            self.config.embedding_batch_size,
            &self.metrics,
            cancel,
        );
        result.counts.embeddings_succeeded = embedded.succeeded;
        result.counts.embeddings_failed = embedded.failed;
        for message in embedded.errors {
            result.errors.push(IngestionError {
                phase: "embedding".into(),
                severity: ParseSeverity::Warning,
                message,
            });
        }
    }
}

/// Collect parser/validator problems into the job result.
fn collect_parse_errors(
    result: &mut IngestionResult,
    phase: &str,
    errors: &[prospectus_core::model::ParseError],
) {
    for error in errors {
        result.errors.push(IngestionError {
            phase: phase.to_string(),
            severity: error.severity,
            message: error.message.clone(),
        });
    }
}

/// Build the persistable spec value for one parsed spec.
fn build_spec_value(
    request: &IngestionRequest,
    spec: &ParsedSpec,
    source_doc_id: Uuid,
) -> SpecValue {
    let now = Utc::now();
    SpecValue {
        id: spec_value_id(
            request.tenant_id,
            request.product_id,
            &spec.category,
            &spec.name,
        ),
        tenant_id: request.tenant_id,
        product_id: request.product_id,
        campaign_variant_id: request.campaign_id,
        category: spec.category.clone(),
        name: spec.name.clone(),
        value: spec.value.clone(),
        unit: spec.unit.clone(),
        key_features: spec.key_features.clone(),
        variant_availability: spec.variant_availability.clone(),
        numeric: spec.numeric,
        confidence: spec.confidence,
        status: SpecStatus::Active,
        version: 1,
        source_doc_id,
        source_page: spec.source_page,
        created_at: now,
        updated_at: now,
    }
}

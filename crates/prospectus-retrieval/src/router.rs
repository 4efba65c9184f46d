//! The retrieval router.
//!
//! Single entry point for retrieval requests. Structured requests (a spec
//! list) dispatch to the parallel batch processor; natural-language
//! requests run the structured-first keyword lookup and fall back to
//! semantic search when it is inconclusive. Responses carry availability,
//! aggregated confidence, and optionally lineage and a summary.
//!
//! The router holds no mutable state across calls beyond its configuration
//! and collaborators; every collaborator is concurrency-safe per its own
//! contract.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

use prospectus_core::cancel::CancelContext;
use prospectus_core::config::Config;
use prospectus_core::error::{Error, Result};
use prospectus_core::model::{
    ChunkType, QueryIntent, RetrievalRequest, RetrievalResponse, SpecAvailabilityStatus,
    SpecFact,
};
use prospectus_core::specnames::normalize_spec_name;
use prospectus_store::{EmbeddingProvider, KvCache, LineageWriter, SpecStore, VectorIndex};

use crate::availability::{AvailabilityDetector, AvailabilityThresholds};
use crate::batch;
use crate::confidence::{ConfidenceCalculator, ConfidenceWeights};
use crate::intent::detect_intent;
use crate::semantic::semantic_search;
use crate::summary::compose_summary;

/// Lineage events echoed into a response when requested.
const LINEAGE_ECHO_LIMIT: usize = 10;

/// The retrieval router and its collaborators.
pub struct RetrievalRouter {
    config: Config,
    spec_store: Arc<dyn SpecStore>,
    vector_index: Arc<dyn VectorIndex>,
    cache: Arc<dyn KvCache>,
    embedder: Arc<dyn EmbeddingProvider>,
    lineage: Arc<dyn LineageWriter>,
    availability: AvailabilityDetector,
    confidence: ConfidenceCalculator,
}

impl RetrievalRouter {
    /// Wire up a router.
    #[must_use]
    pub fn new(
        config: Config,
        spec_store: Arc<dyn SpecStore>,
        vector_index: Arc<dyn VectorIndex>,
        cache: Arc<dyn KvCache>,
        embedder: Arc<dyn EmbeddingProvider>,
        lineage: Arc<dyn LineageWriter>,
    ) -> Self {
        let availability = AvailabilityDetector::new(AvailabilityThresholds {
            min_confidence: config.min_availability_confidence,
            min_similarity: config.min_similarity_threshold,
        });
        let confidence = ConfidenceCalculator::new(ConfidenceWeights {
            structured: config.structured_weight,
            semantic: config.semantic_weight,
            keyword: config.keyword_weight,
        });
        Self {
            config,
            spec_store,
            vector_index,
            cache,
            embedder,
            lineage,
            availability,
            confidence,
        }
    }

    /// Answer one retrieval request.
    ///
    /// Validation problems are returned as errors; execution failures from
    /// collaborators are logged and produce a degraded response with zero
    /// confidence, so a query always yields a response.
    pub fn query(
        &self,
        request: &RetrievalRequest,
        cancel: &CancelContext,
    ) -> Result<RetrievalResponse> {
        let started = Instant::now();
        self.validate(request)?;

        let intent = detect_intent(
            request.question.as_deref().unwrap_or_default(),
            request.intent_hint,
        );

        let cache_key = self.cache_key(request);
        if self.config.cache_results {
            if let Some(cached) = self.cache_probe(&cache_key) {
                debug!(%cache_key, "query served from cache");
                return Ok(cached);
            }
        }

        let mut response = match self.dispatch(request, cancel) {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, kind = e.error_type(), "query execution failed");
                RetrievalResponse::empty(intent)
            }
        };
        response.intent = intent;
        response.latency_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if request.include_summary {
            response.summary = Some(compose_summary(
                &response.structured_facts,
                &response.spec_availability,
            ));
        }

        self.lineage.record(
            "query",
            request.tenant_id,
            json!({
                "intent": intent,
                "question": request.question,
                "requested_specs": request.requested_specs,
                "facts": response.structured_facts.len(),
                "chunks": response.semantic_chunks.len(),
                "latency_ms": response.latency_ms,
            }),
        );
        if request.include_lineage {
            response.lineage = self.lineage.recent(request.tenant_id, LINEAGE_ECHO_LIMIT);
        }

        if self.config.cache_results {
            self.cache_store(&cache_key, &response);
        }
        Ok(response)
    }

    /// Structured multi-spec processing (also reachable directly).
    ///
    /// Statuses come back in request order; the second element reports a
    /// fired batch deadline.
    pub fn process_specs_in_parallel(
        &self,
        request: &RetrievalRequest,
        specs: &[String],
        cancel: &CancelContext,
    ) -> (Vec<SpecAvailabilityStatus>, Option<Error>) {
        batch::process_in_parallel(
            specs,
            self.config.batch_workers,
            self.config.batch_timeout,
            cancel,
            |name, worker_cancel| self.process_single_spec(request, name, worker_cancel),
        )
    }

    // ────────────────────────────────────────────────────────────────
    // Dispatch paths
    // ────────────────────────────────────────────────────────────────

    fn validate(&self, request: &RetrievalRequest) -> Result<()> {
        if request.tenant_id.is_nil() {
            return Err(Error::Validation("tenant_id is required".into()));
        }
        if request.product_ids.is_empty() {
            return Err(Error::Validation("at least one product_id is required".into()));
        }
        if !request.is_structured()
            && request
                .question
                .as_deref()
                .is_none_or(|question| question.trim().is_empty())
        {
            return Err(Error::Validation(
                "natural-language mode needs a question".into(),
            ));
        }
        Ok(())
    }

    fn dispatch(
        &self,
        request: &RetrievalRequest,
        cancel: &CancelContext,
    ) -> Result<RetrievalResponse> {
        if request.is_structured() {
            Ok(self.structured_response(request, cancel))
        } else {
            self.natural_language_response(request, cancel)
        }
    }

    /// Structured mode: batch-process the requested specs. No free-text
    /// routing.
    fn structured_response(
        &self,
        request: &RetrievalRequest,
        cancel: &CancelContext,
    ) -> RetrievalResponse {
        let (availability, timeout) =
            self.process_specs_in_parallel(request, &request.requested_specs, cancel);
        if let Some(timeout) = timeout {
            warn!(error = %timeout, "structured batch returned partial results");
        }

        let structured_facts: Vec<SpecFact> = availability
            .iter()
            .flat_map(|entry| entry.matched_specs.iter().cloned())
            .collect();
        let semantic_chunks: Vec<_> = availability
            .iter()
            .flat_map(|entry| entry.matched_chunks.iter().cloned())
            .collect();
        let overall_confidence =
            self.confidence
                .response_confidence(&availability, &structured_facts, &semantic_chunks);

        RetrievalResponse {
            structured_facts,
            semantic_chunks,
            spec_availability: availability,
            overall_confidence,
            ..RetrievalResponse::empty(QueryIntent::SpecLookup)
        }
    }

    /// Natural-language mode: structured-first keyword lookup, semantic
    /// fallback when it is inconclusive.
    fn natural_language_response(
        &self,
        request: &RetrievalRequest,
        cancel: &CancelContext,
    ) -> Result<RetrievalResponse> {
        let question = request
            .question
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string();

        let mut keyword_facts = Vec::new();
        if self.config.structured_first {
            // The primary structured path surfaces its failures
            keyword_facts = self
                .spec_store
                .keyword_lookup(
                    request.tenant_id,
                    &request.product_ids,
                    &question,
                    &[],
                    &request.filters.categories,
                )
                .map_err(|e| Error::Store(format!("structured lookup: {e}")))?;
            let best = keyword_facts
                .iter()
                .map(|fact| fact.confidence)
                .fold(0.0_f64, f64::max);
            if best >= self.config.keyword_confidence_threshold {
                debug!(best, "structured-first lookup was conclusive");
                let overall =
                    self.confidence
                        .response_confidence(&[], &keyword_facts, &[]);
                return Ok(RetrievalResponse {
                    structured_facts: keyword_facts,
                    overall_confidence: overall,
                    ..RetrievalResponse::empty(QueryIntent::Qa)
                });
            }
        }

        let (semantic_chunks, semantic_facts) = if self.config.semantic_fallback {
            semantic_search(
                self.embedder.as_ref(),
                self.vector_index.as_ref(),
                request,
                &question,
                request.max_chunks.unwrap_or(self.config.max_chunks),
                cancel,
            )?
        } else {
            (Vec::new(), Vec::new())
        };

        // Synthesized facts lead: they answered the question the keyword
        // pass could not
        let mut structured_facts = semantic_facts;
        structured_facts.extend(keyword_facts);

        let comparisons: Vec<_> = semantic_chunks
            .iter()
            .filter(|chunk| chunk.chunk_type == ChunkType::Comparison)
            .cloned()
            .collect();
        let overall_confidence =
            self.confidence
                .response_confidence(&[], &structured_facts, &semantic_chunks);

        Ok(RetrievalResponse {
            structured_facts,
            semantic_chunks,
            comparisons,
            overall_confidence,
            ..RetrievalResponse::empty(QueryIntent::Qa)
        })
    }

    /// One spec of a structured batch: normalize, keyword lookup, semantic
    /// fallback, availability call. Per-spec failures degrade to
    /// `unavailable` rather than failing the batch.
    fn process_single_spec(
        &self,
        request: &RetrievalRequest,
        original_name: &str,
        cancel: &CancelContext,
    ) -> SpecAvailabilityStatus {
        let (canonical, alternatives) = normalize_spec_name(original_name);

        let facts = match self.spec_store.keyword_lookup(
            request.tenant_id,
            &request.product_ids,
            &canonical,
            &alternatives,
            &request.filters.categories,
        ) {
            Ok(facts) => facts,
            Err(e) => {
                warn!(spec = original_name, error = %e, "keyword lookup failed");
                Vec::new()
            }
        };
        let best = facts
            .iter()
            .map(|fact| fact.confidence)
            .fold(0.0_f64, f64::max);

        let mut chunks = Vec::new();
        let mut semantic_facts = Vec::new();
        if best < self.config.keyword_confidence_threshold && self.config.semantic_fallback {
            match semantic_search(
                self.embedder.as_ref(),
                self.vector_index.as_ref(),
                request,
                &canonical,
                request.max_chunks.unwrap_or(self.config.max_chunks),
                cancel,
            ) {
                Ok((found_chunks, found_facts)) => {
                    chunks = found_chunks;
                    semantic_facts = found_facts;
                }
                Err(e) => {
                    warn!(spec = original_name, error = %e, "semantic fallback failed");
                }
            }
        }

        let mut all_facts = facts;
        all_facts.extend(semantic_facts);
        let mut status = self
            .availability
            .determine(&canonical, all_facts, chunks, None);
        status.spec_name = original_name.to_string();
        status.alternative_names = alternatives;
        status
    }

    // ────────────────────────────────────────────────────────────────
    // Cache
    // ────────────────────────────────────────────────────────────────

    /// Tenant-scoped cache key over the request fingerprint.
    fn cache_key(&self, request: &RetrievalRequest) -> String {
        let fingerprint = json!({
            "products": request.product_ids,
            "campaign": request.campaign_variant_id,
            "question": request.question,
            "specs": request.requested_specs,
            "categories": request.filters.categories,
            "chunk_types": request.filters.chunk_types,
        });
        let mut hasher = Sha256::new();
        hasher.update(fingerprint.to_string().as_bytes());
        format!("{}:query:{}", request.tenant_id, hex::encode(hasher.finalize()))
    }

    fn cache_probe(&self, key: &str) -> Option<RetrievalResponse> {
        match self.cache.get(key) {
            Ok(Some(serialized)) => serde_json::from_str(&serialized).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "cache read failed");
                None
            }
        }
    }

    fn cache_store(&self, key: &str, response: &RetrievalResponse) {
        match serde_json::to_string(response) {
            Ok(serialized) => {
                if let Err(e) = self.cache.set(key, &serialized, self.config.cache_ttl) {
                    warn!(error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(error = %e, "response serialization for cache failed"),
        }
    }
}

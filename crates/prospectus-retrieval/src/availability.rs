//! Per-spec availability classification.
//!
//! Blends the strongest structured fact with the strongest semantic hit
//! into a `found` / `partial` / `unavailable` call. Custom per-request
//! thresholds override the defaults only when strictly positive.

use prospectus_core::model::{
    AvailabilityState, SemanticChunk, SpecAvailabilityStatus, SpecFact,
};

/// Weight of the structured signal in the blended confidence.
const FACT_WEIGHT: f64 = 0.6;
/// Weight of the semantic signal in the blended confidence.
const SIMILARITY_WEIGHT: f64 = 0.4;
/// Blended confidence above which weak evidence still counts as partial.
const PARTIAL_FLOOR: f64 = 0.3;

/// Classification thresholds.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityThresholds {
    /// Structured-fact confidence that alone makes a spec `found`.
    pub min_confidence: f64,
    /// Semantic similarity that alone makes a spec `found`.
    pub min_similarity: f64,
}

impl Default for AvailabilityThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            min_similarity: 0.5,
        }
    }
}

/// The availability detector.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityDetector {
    thresholds: AvailabilityThresholds,
}

impl AvailabilityDetector {
    /// A detector with explicit default thresholds.
    #[must_use]
    pub const fn new(thresholds: AvailabilityThresholds) -> Self {
        Self { thresholds }
    }

    /// Effective thresholds for one request: custom values override the
    /// defaults only when strictly positive.
    fn effective(&self, custom: Option<AvailabilityThresholds>) -> AvailabilityThresholds {
        let Some(custom) = custom else {
            return self.thresholds;
        };
        AvailabilityThresholds {
            min_confidence: if custom.min_confidence > 0.0 {
                custom.min_confidence
            } else {
                self.thresholds.min_confidence
            },
            min_similarity: if custom.min_similarity > 0.0 {
                custom.min_similarity
            } else {
                self.thresholds.min_similarity
            },
        }
    }

    /// Classify one spec from its retrieved evidence.
    #[must_use]
    pub fn determine(
        &self,
        spec_name: &str,
        facts: Vec<SpecFact>,
        chunks: Vec<SemanticChunk>,
        custom: Option<AvailabilityThresholds>,
    ) -> SpecAvailabilityStatus {
        let thresholds = self.effective(custom);

        if facts.is_empty() && chunks.is_empty() {
            return SpecAvailabilityStatus::unavailable(spec_name);
        }

        let max_fact_conf = facts
            .iter()
            .map(|fact| fact.confidence)
            .fold(0.0_f64, f64::max);
        let max_sim = chunks
            .iter()
            .map(SemanticChunk::similarity)
            .fold(0.0_f64, f64::max);

        let overall = if max_fact_conf > 0.0 && max_sim > 0.0 {
            max_fact_conf * FACT_WEIGHT + max_sim * SIMILARITY_WEIGHT
        } else if max_fact_conf > 0.0 {
            max_fact_conf
        } else {
            max_sim
        };

        let status = if max_fact_conf >= thresholds.min_confidence
            || max_sim >= thresholds.min_similarity
        {
            AvailabilityState::Found
        } else if overall > PARTIAL_FLOOR {
            AvailabilityState::Partial
        } else {
            AvailabilityState::Unavailable
        };

        SpecAvailabilityStatus {
            spec_name: spec_name.to_string(),
            status,
            confidence: overall.clamp(0.0, 1.0),
            alternative_names: Vec::new(),
            matched_specs: facts,
            matched_chunks: chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use prospectus_core::model::{ChunkType, FactSource, Provenance};
    use uuid::Uuid;

    fn fact(confidence: f64) -> SpecFact {
        SpecFact {
            spec_item_id: None,
            category: "Engine".into(),
            name: "Power".into(),
            value: "88 bhp".into(),
            unit: None,
            key_features: String::new(),
            variant_availability: String::new(),
            explanation: String::new(),
            provenance: Provenance::Structured,
            confidence,
            campaign_variant_id: None,
            source: FactSource::default(),
        }
    }

    fn chunk(distance: f64) -> SemanticChunk {
        SemanticChunk {
            id: Uuid::new_v4(),
            text: String::new(),
            chunk_type: ChunkType::SpecRow,
            distance,
            source_page: 1,
            metadata: IndexMap::new(),
        }
    }

    #[test]
    fn no_evidence_is_unavailable_with_zero_confidence() {
        let detector = AvailabilityDetector::new(AvailabilityThresholds::default());
        let status = detector.determine("Power", Vec::new(), Vec::new(), None);
        assert_eq!(status.status, AvailabilityState::Unavailable);
        assert!((status.confidence - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn strong_fact_alone_is_found() {
        let detector = AvailabilityDetector::new(AvailabilityThresholds::default());
        let status = detector.determine("Power", vec![fact(0.9)], Vec::new(), None);
        assert_eq!(status.status, AvailabilityState::Found);
        assert!((status.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn strong_similarity_alone_is_found() {
        let detector = AvailabilityDetector::new(AvailabilityThresholds::default());
        let status = detector.determine("Power", Vec::new(), vec![chunk(0.3)], None);
        assert_eq!(status.status, AvailabilityState::Found);
    }

    #[test]
    fn both_signals_blend_sixty_forty() {
        let detector = AvailabilityDetector::new(AvailabilityThresholds::default());
        let status = detector.determine("Power", vec![fact(0.5)], vec![chunk(0.6)], None);
        // 0.5 * 0.6 + 0.4 * 0.4 = 0.46
        assert!((status.confidence - 0.46).abs() < 1e-9);
        assert_eq!(status.status, AvailabilityState::Partial);
    }

    #[test]
    fn weak_evidence_is_partial_then_unavailable() {
        let detector = AvailabilityDetector::new(AvailabilityThresholds::default());
        let partial = detector.determine("Power", vec![fact(0.4)], Vec::new(), None);
        assert_eq!(partial.status, AvailabilityState::Partial);

        let unavailable = detector.determine("Power", vec![fact(0.2)], Vec::new(), None);
        assert_eq!(unavailable.status, AvailabilityState::Unavailable);
    }

    #[test]
    fn custom_thresholds_override_only_when_positive() {
        let detector = AvailabilityDetector::new(AvailabilityThresholds::default());
        let strict = AvailabilityThresholds {
            min_confidence: 0.95,
            min_similarity: 0.0,
        };
        let status = detector.determine("Power", vec![fact(0.9)], Vec::new(), Some(strict));
        // 0.9 no longer clears the raised bar; similarity kept its default
        assert_eq!(status.status, AvailabilityState::Partial);
    }
}

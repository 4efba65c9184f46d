//! Response-level confidence aggregation.
//!
//! A single scalar blends structured, semantic, and keyword signals under
//! configurable weights (re-normalized when their sum is positive). When a
//! response carries per-spec availability entries, the response confidence
//! is instead the mean over entries whose status is `found`.

use prospectus_core::model::{
    AvailabilityState, SemanticChunk, SpecAvailabilityStatus, SpecFact,
};

/// Aggregation weights for the three signals.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceWeights {
    /// Weight of the mean structured-fact confidence.
    pub structured: f64,
    /// Weight of the mean semantic similarity.
    pub semantic: f64,
    /// Weight of the caller-supplied keyword signal.
    pub keyword: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            structured: 0.5,
            semantic: 0.3,
            keyword: 0.2,
        }
    }
}

impl ConfidenceWeights {
    /// Normalize the weights to sum to one. Non-positive sums fall back to
    /// the defaults.
    #[must_use]
    pub fn normalized(self) -> Self {
        let sum = self.structured + self.semantic + self.keyword;
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            structured: self.structured / sum,
            semantic: self.semantic / sum,
            keyword: self.keyword / sum,
        }
    }
}

/// The confidence calculator.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceCalculator {
    weights: ConfidenceWeights,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0_usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = count as f64;
    sum / count
}

impl ConfidenceCalculator {
    /// A calculator with the given (possibly unnormalized) weights.
    #[must_use]
    pub fn new(weights: ConfidenceWeights) -> Self {
        Self {
            weights: weights.normalized(),
        }
    }

    /// Weighted aggregate over the three signals, clamped to `[0, 1]`.
    ///
    /// Adversarial inputs (negative confidences, values above one) are
    /// clamped rather than rejected.
    #[must_use]
    pub fn overall(
        &self,
        facts: &[SpecFact],
        chunks: &[SemanticChunk],
        keyword_confidence: f64,
    ) -> f64 {
        let structured = mean(facts.iter().map(|fact| fact.confidence.clamp(0.0, 1.0)));
        let semantic = mean(chunks.iter().map(|chunk| chunk.similarity()));
        let keyword = keyword_confidence.clamp(0.0, 1.0);

        (structured * self.weights.structured
            + semantic * self.weights.semantic
            + keyword * self.weights.keyword)
            .clamp(0.0, 1.0)
    }

    /// Response-level policy: mean over `found` availability entries when
    /// any entries exist, otherwise the weighted fallback with the mean
    /// fact confidence standing in for the keyword signal.
    #[must_use]
    pub fn response_confidence(
        &self,
        availability: &[SpecAvailabilityStatus],
        facts: &[SpecFact],
        chunks: &[SemanticChunk],
    ) -> f64 {
        if !availability.is_empty() {
            return mean(
                availability
                    .iter()
                    .filter(|entry| entry.status == AvailabilityState::Found)
                    .map(|entry| entry.confidence),
            );
        }
        // Keyword proxy: the mean fact confidence is a deliberate
        // approximation here
        let keyword_proxy = mean(facts.iter().map(|fact| fact.confidence.clamp(0.0, 1.0)));
        self.overall(facts, chunks, keyword_proxy)
    }
}

impl Default for ConfidenceCalculator {
    fn default() -> Self {
        Self::new(ConfidenceWeights::default())
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
            chunk_type: ChunkType::Global,
            distance,
            source_page: 1,
            metadata: IndexMap::new(),
        }
    }

    fn status(state: AvailabilityState, confidence: f64) -> SpecAvailabilityStatus {
        SpecAvailabilityStatus {
            spec_name: "x".into(),
            status: state,
            confidence,
            alternative_names: Vec::new(),
            matched_specs: Vec::new(),
            matched_chunks: Vec::new(),
        }
    }

    #[test]
    fn weighted_blend_with_defaults() {
        let calc = ConfidenceCalculator::default();
        let overall = calc.overall(&[fact(0.8)], &[chunk(0.2)], 0.5);
        // 0.8*0.5 + 0.8*0.3 + 0.5*0.2 = 0.74
        assert!((overall - 0.74).abs() < 1e-9);
    }

    #[test]
    fn empty_inputs_yield_zero() {
        let calc = ConfidenceCalculator::default();
        assert!((calc.overall(&[], &[], 0.0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn adversarial_inputs_stay_in_unit_interval() {
        let calc = ConfidenceCalculator::default();
        for keyword in [-5.0, 0.0, 0.5, 5.0] {
            let overall = calc.overall(&[fact(-3.0), fact(7.0)], &[chunk(-2.0)], keyword);
            assert!((0.0..=1.0).contains(&overall), "out of range: {overall}");
        }
    }

    #[test]
    fn weights_renormalize() {
        let calc = ConfidenceCalculator::new(ConfidenceWeights {
            structured: 2.0,
            semantic: 0.0,
            keyword: 0.0,
        });
        let overall = calc.overall(&[fact(0.6)], &[], 1.0);
        assert!((overall - 0.6).abs() < 1e-9);
    }

    #[test]
    fn non_positive_weights_fall_back_to_defaults() {
        let calc = ConfidenceCalculator::new(ConfidenceWeights {
            structured: 0.0,
            semantic: 0.0,
            keyword: 0.0,
        });
        let overall = calc.overall(&[fact(1.0)], &[], 1.0);
        assert!(overall > 0.0);
    }

    #[test]
    fn response_confidence_means_found_entries() {
        let calc = ConfidenceCalculator::default();
        let availability = vec![
            status(AvailabilityState::Found, 0.9),
            status(AvailabilityState::Unavailable, 0.1),
            status(AvailabilityState::Found, 0.7),
        ];
        let confidence = calc.response_confidence(&availability, &[], &[]);
        assert!((confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn no_found_entries_yield_zero() {
        let calc = ConfidenceCalculator::default();
        let availability = vec![status(AvailabilityState::Unavailable, 0.2)];
        assert!((calc.response_confidence(&availability, &[], &[]) - 0.0).abs() < f64::EPSILON);
    }
}

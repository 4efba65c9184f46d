//! Response summary composition.
//!
//! A short plain-text digest of what retrieval found: availability counts
//! for structured requests, the top facts either way. Bounded output; this
//! is a convenience surface, not a rendering layer.

use prospectus_core::model::{AvailabilityState, SpecAvailabilityStatus, SpecFact};

/// Facts quoted in a summary at most.
const MAX_SUMMARY_FACTS: usize = 3;

/// Compose a summary over the response's facts and availability entries.
#[must_use]
pub fn compose_summary(facts: &[SpecFact], availability: &[SpecAvailabilityStatus]) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !availability.is_empty() {
        let found = availability
            .iter()
            .filter(|entry| entry.status == AvailabilityState::Found)
            .count();
        let partial = availability
            .iter()
            .filter(|entry| entry.status == AvailabilityState::Partial)
            .count();
        let mut line = format!(
            "{found} of {} requested specifications found",
            availability.len()
        );
        if partial > 0 {
            line.push_str(&format!(" ({partial} partial)"));
        }
        line.push('.');
        parts.push(line);
    }

    for fact in facts.iter().take(MAX_SUMMARY_FACTS) {
        if fact.explanation.is_empty() {
            parts.push(format!("{} is {}.", fact.name, fact.value));
        } else {
            parts.push(fact.explanation.clone());
        }
    }

    if parts.is_empty() {
        "No matching information was found.".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospectus_core::model::{FactSource, Provenance};

    fn fact(name: &str, value: &str) -> SpecFact {
        SpecFact {
            spec_item_id: None,
            category: "Engine".into(),
            name: name.into(),
            value: value.into(),
            unit: None,
            key_features: String::new(),
            variant_availability: String::new(),
            explanation: String::new(),
            provenance: Provenance::Structured,
            confidence: 0.9,
            campaign_variant_id: None,
            source: FactSource::default(),
        }
    }

    fn entry(state: AvailabilityState) -> SpecAvailabilityStatus {
        SpecAvailabilityStatus {
            status: state,
            ..SpecAvailabilityStatus::unavailable("x")
        }
    }

    #[test]
    fn counts_found_and_partial() {
        let availability = vec![
            entry(AvailabilityState::Found),
            entry(AvailabilityState::Partial),
            entry(AvailabilityState::Unavailable),
        ];
        let summary = compose_summary(&[], &availability);
        assert!(summary.contains("1 of 3"));
        assert!(summary.contains("1 partial"));
    }

    #[test]
    fn quotes_top_facts_only() {
        let facts: Vec<SpecFact> = (0..5)
            .map(|i| fact(&format!("Spec{i}"), &format!("v{i}")))
            .collect();
        let summary = compose_summary(&facts, &[]);
        assert!(summary.contains("Spec0"));
        assert!(summary.contains("Spec2"));
        assert!(!summary.contains("Spec3"));
    }

    #[test]
    fn empty_inputs_say_so() {
        assert_eq!(compose_summary(&[], &[]), "No matching information was found.");
    }
}

//! Spec-value store contract and in-memory implementation.
//!
//! Spec values live in version chains keyed by their deterministic ID.
//! An upsert against an existing chain either supersedes the active value
//! or, when the new value disagrees above a confidence threshold, lands as
//! a `conflict` version that blocks downstream publish.
//!
//! The keyword lookup is the structured half of hybrid retrieval: it
//! scores active values against a requested name and its aliases and
//! returns them as [`SpecFact`]s.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use prospectus_core::error::{Error, Result};
use prospectus_core::model::{FactSource, Provenance, SpecFact, SpecStatus, SpecValue};

/// Outcome of one spec upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecUpsertOutcome {
    /// First version of this identity.
    Created(Uuid),
    /// New version superseding the previous active one.
    Updated(Uuid),
    /// New version recorded with `conflict` status.
    Conflicted(Uuid),
}

impl SpecUpsertOutcome {
    /// The affected spec-value identity.
    #[must_use]
    pub const fn id(self) -> Uuid {
        match self {
            Self::Created(id) | Self::Updated(id) | Self::Conflicted(id) => id,
        }
    }
}

/// Read/write contract for the spec view.
///
/// Implementations must be safe for concurrent use; every operation is
/// tenant-scoped.
pub trait SpecStore: Send + Sync {
    /// The active version for an identity, if any.
    fn get_active(&self, tenant_id: Uuid, spec_id: Uuid) -> Result<Option<SpecValue>>;

    /// Insert or version-chain a spec value. `value.id` must already be
    /// the deterministic identity; `value.version` is assigned here.
    fn upsert(
        &self,
        value: SpecValue,
        conflict_threshold: f64,
        overwrite: bool,
    ) -> Result<SpecUpsertOutcome>;

    /// Keyword lookup over active values, scored against the requested
    /// name and its aliases. Best match first.
    fn keyword_lookup(
        &self,
        tenant_id: Uuid,
        product_ids: &[Uuid],
        name: &str,
        alternatives: &[String],
        categories: &[String],
    ) -> Result<Vec<SpecFact>>;

    /// Number of identity chains for a tenant.
    fn count(&self, tenant_id: Uuid) -> Result<usize>;
}

/// Score a stored spec name against one query name.
///
/// Exact match scores 1.0, containment 0.8, token overlap proportionally
/// below that. Zero means no match.
fn name_match_score(stored: &str, query: &str) -> f64 {
    let stored_lower = stored.to_lowercase();
    let query_lower = query.to_lowercase();
    if stored_lower == query_lower {
        return 1.0;
    }
    if stored_lower.contains(&query_lower) || query_lower.contains(&stored_lower) {
        return 0.8;
    }
    let stored_tokens: Vec<&str> = stored_lower.split_whitespace().collect();
    let query_tokens: Vec<&str> = query_lower.split_whitespace().collect();
    if stored_tokens.is_empty() || query_tokens.is_empty() {
        return 0.0;
    }
    let overlap = query_tokens
        .iter()
        .filter(|token| stored_tokens.contains(*token))
        .count();
    if overlap == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = overlap as f64 / query_tokens.len() as f64;
    0.7 * ratio
}

/// One-sentence gloss for a spec fact.
fn fact_explanation(value: &SpecValue) -> String {
    match &value.unit {
        Some(unit) if !unit.is_empty() => {
            format!("{} is {} {}.", value.name, value.value, unit)
        }
        _ => format!("{} is {}.", value.name, value.value),
    }
}

/// Convert an active spec value into a structured fact.
fn to_fact(value: &SpecValue, confidence: f64) -> SpecFact {
    SpecFact {
        spec_item_id: Some(value.id),
        category: value.category.clone(),
        name: value.name.clone(),
        value: value.value.clone(),
        unit: value.unit.clone(),
        key_features: value.key_features.clone(),
        variant_availability: value.variant_availability.clone(),
        explanation: fact_explanation(value),
        provenance: Provenance::Structured,
        confidence,
        campaign_variant_id: value.campaign_variant_id,
        source: FactSource {
            document_id: Some(value.source_doc_id),
            page: Some(value.source_page),
            url: None,
        },
    }
}

/// In-memory spec store: tenant → identity → version chain.
#[derive(Debug, Default)]
pub struct MemorySpecStore {
    chains: RwLock<HashMap<Uuid, HashMap<Uuid, Vec<SpecValue>>>>,
}

impl MemorySpecStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All versions across all chains, for snapshots and tests.
    #[must_use]
    pub fn all_versions(&self, tenant_id: Uuid) -> Vec<SpecValue> {
        let chains = self.chains.read().expect("spec store lock poisoned");
        chains
            .get(&tenant_id)
            .map(|tenant| tenant.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Persist every version to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let chains = self.chains.read().expect("spec store lock poisoned");
        let versions: Vec<&SpecValue> = chains
            .values()
            .flat_map(|tenant| tenant.values().flatten())
            .collect();
        std::fs::write(path, serde_json::to_vec_pretty(&versions)?)?;
        Ok(())
    }

    /// Rebuild a store from a JSON snapshot. A missing file is an empty
    /// store.
    pub fn load(path: &Path) -> Result<Self> {
        let store = Self::new();
        if !path.exists() {
            return Ok(store);
        }
        let versions: Vec<SpecValue> = serde_json::from_slice(&std::fs::read(path)?)?;
        {
            let mut chains = store.chains.write().expect("spec store lock poisoned");
            for value in versions {
                chains
                    .entry(value.tenant_id)
                    .or_default()
                    .entry(value.id)
                    .or_default()
                    .push(value);
            }
            for tenant in chains.values_mut() {
                for chain in tenant.values_mut() {
                    chain.sort_by_key(|v| v.version);
                }
            }
        }
        Ok(store)
    }
}

impl SpecStore for MemorySpecStore {
    fn get_active(&self, tenant_id: Uuid, spec_id: Uuid) -> Result<Option<SpecValue>> {
        let chains = self.chains.read().expect("spec store lock poisoned");
        Ok(chains
            .get(&tenant_id)
            .and_then(|tenant| tenant.get(&spec_id))
            .and_then(|chain| {
                chain
                    .iter()
                    .rev()
                    .find(|v| v.status == SpecStatus::Active)
                    .cloned()
            }))
    }

    fn upsert(
        &self,
        mut value: SpecValue,
        conflict_threshold: f64,
        overwrite: bool,
    ) -> Result<SpecUpsertOutcome> {
        let mut chains = self.chains.write().expect("spec store lock poisoned");
        let chain = chains
            .entry(value.tenant_id)
            .or_default()
            .entry(value.id)
            .or_default();

        let Some(latest) = chain.last() else {
            value.version = 1;
            value.status = SpecStatus::Active;
            let id = value.id;
            chain.push(value);
            return Ok(SpecUpsertOutcome::Created(id));
        };

        let id = value.id;
        value.version = latest.version + 1;

        let active = chain
            .iter()
            .rev()
            .find(|v| v.status == SpecStatus::Active)
            .cloned();
        let disagrees = active.as_ref().is_some_and(|current| {
            current.value != value.value
                && current.confidence >= conflict_threshold
                && value.confidence >= conflict_threshold
        });

        if disagrees && !overwrite {
            value.status = SpecStatus::Conflict;
            chain.push(value);
            return Ok(SpecUpsertOutcome::Conflicted(id));
        }

        for previous in chain.iter_mut() {
            if previous.status == SpecStatus::Active {
                previous.status = SpecStatus::Deprecated;
                previous.updated_at = Utc::now();
            }
        }
        value.status = SpecStatus::Active;
        chain.push(value);
        Ok(SpecUpsertOutcome::Updated(id))
    }

    fn keyword_lookup(
        &self,
        tenant_id: Uuid,
        product_ids: &[Uuid],
        name: &str,
        alternatives: &[String],
        categories: &[String],
    ) -> Result<Vec<SpecFact>> {
        if name.trim().is_empty() {
            return Err(Error::Validation("keyword lookup needs a name".into()));
        }
        let category_filter: Vec<String> =
            categories.iter().map(|c| c.to_lowercase()).collect();
        let chains = self.chains.read().expect("spec store lock poisoned");
        let Some(tenant) = chains.get(&tenant_id) else {
            return Ok(Vec::new());
        };

        let mut facts: Vec<SpecFact> = tenant
            .values()
            .filter_map(|chain| {
                chain.iter().rev().find(|v| v.status == SpecStatus::Active)
            })
            .filter(|value| product_ids.is_empty() || product_ids.contains(&value.product_id))
            .filter(|value| {
                category_filter.is_empty()
                    || category_filter.contains(&value.category.to_lowercase())
            })
            .filter_map(|value| {
                let best = std::iter::once(name)
                    .chain(alternatives.iter().map(String::as_str))
                    .map(|candidate| {
                        name_match_score(&value.name, candidate)
                            .max(name_match_score(&value.category, candidate))
                    })
                    .fold(0.0_f64, f64::max);
                if best <= 0.0 {
                    return None;
                }
                Some(to_fact(value, (best * value.confidence).clamp(0.0, 1.0)))
            })
            .collect();

        facts.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(facts)
    }

    fn count(&self, tenant_id: Uuid) -> Result<usize> {
        let chains = self.chains.read().expect("spec store lock poisoned");
        Ok(chains.get(&tenant_id).map_or(0, HashMap::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospectus_core::ids::spec_value_id;

    fn value(tenant: Uuid, product: Uuid, name: &str, value_str: &str, confidence: f64) -> SpecValue {
        let now = Utc::now();
        SpecValue {
            id: spec_value_id(tenant, product, "Engine", name),
            tenant_id: tenant,
            product_id: product,
            campaign_variant_id: None,
            category: "Engine".into(),
            name: name.into(),
            value: value_str.into(),
            unit: None,
            key_features: String::new(),
            variant_availability: String::new(),
            numeric: None,
            confidence,
            status: SpecStatus::Active,
            version: 0,
            source_doc_id: Uuid::new_v4(),
            source_page: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn first_upsert_creates_version_one() {
        let store = MemorySpecStore::new();
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        let outcome = store.upsert(value(tenant, product, "Power", "88 bhp", 0.9), 0.5, false);
        assert!(matches!(outcome, Ok(SpecUpsertOutcome::Created(_))));
        let active = store
            .get_active(tenant, spec_value_id(tenant, product, "Engine", "Power"))
            .unwrap()
            .unwrap();
        assert_eq!(active.version, 1);
    }

    #[test]
    fn disagreeing_value_conflicts_and_blocks_active() {
        let store = MemorySpecStore::new();
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        store
            .upsert(value(tenant, product, "Power", "176 hp", 0.9), 0.5, false)
            .unwrap();
        let outcome = store
            .upsert(value(tenant, product, "Power", "200 hp", 0.9), 0.5, false)
            .unwrap();
        assert!(matches!(outcome, SpecUpsertOutcome::Conflicted(_)));
        // The original active value survives the conflict
        let active = store.get_active(tenant, outcome.id()).unwrap().unwrap();
        assert_eq!(active.value, "176 hp");
    }

    #[test]
    fn same_value_reingest_updates_version_chain() {
        let store = MemorySpecStore::new();
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        store
            .upsert(value(tenant, product, "Power", "88 bhp", 0.9), 0.5, false)
            .unwrap();
        let outcome = store
            .upsert(value(tenant, product, "Power", "88 bhp", 0.9), 0.5, false)
            .unwrap();
        assert!(matches!(outcome, SpecUpsertOutcome::Updated(_)));
        let active = store.get_active(tenant, outcome.id()).unwrap().unwrap();
        assert_eq!(active.version, 2);
    }

    #[test]
    fn overwrite_supersedes_instead_of_conflicting() {
        let store = MemorySpecStore::new();
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        store
            .upsert(value(tenant, product, "Power", "176 hp", 0.9), 0.5, false)
            .unwrap();
        let outcome = store
            .upsert(value(tenant, product, "Power", "200 hp", 0.9), 0.5, true)
            .unwrap();
        assert!(matches!(outcome, SpecUpsertOutcome::Updated(_)));
        let active = store.get_active(tenant, outcome.id()).unwrap().unwrap();
        assert_eq!(active.value, "200 hp");
    }

    #[test]
    fn keyword_lookup_scores_exact_match_highest() {
        let store = MemorySpecStore::new();
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        store
            .upsert(value(tenant, product, "Power", "88 bhp", 0.9), 0.5, false)
            .unwrap();
        store
            .upsert(value(tenant, product, "Max Power Output", "90 bhp", 0.9), 0.5, false)
            .unwrap();
        let facts = store
            .keyword_lookup(tenant, &[product], "Power", &[], &[])
            .unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].name, "Power");
        assert!(facts[0].confidence > facts[1].confidence);
        assert_eq!(facts[0].provenance, Provenance::Structured);
    }

    #[test]
    fn lookup_is_tenant_scoped() {
        let store = MemorySpecStore::new();
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        store
            .upsert(value(tenant, product, "Power", "88 bhp", 0.9), 0.5, false)
            .unwrap();
        let facts = store
            .keyword_lookup(Uuid::new_v4(), &[product], "Power", &[], &[])
            .unwrap();
        assert!(facts.is_empty());
    }

    #[test]
    fn snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specs.json");
        let store = MemorySpecStore::new();
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        store
            .upsert(value(tenant, product, "Power", "88 bhp", 0.9), 0.5, false)
            .unwrap();
        store.save(&path).unwrap();

        let restored = MemorySpecStore::load(&path).unwrap();
        assert_eq!(restored.count(tenant).unwrap(), 1);
    }
}

//! Feature/USP store contract and in-memory implementation.
//!
//! Feature and USP persistence is best-effort: a failure here logs and the
//! ingestion job continues. Retrievability is carried by the prefixed
//! `global` chunks; these records exist for structured listing.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use prospectus_core::error::Result;
use prospectus_core::model::{ParsedFeature, ParsedUsp};

/// A persisted feature bullet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Record identity.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Owning product.
    pub product_id: Uuid,
    /// Whether this is a USP rather than a plain feature.
    pub is_usp: bool,
    /// Bullet text.
    pub text: String,
    /// Inferred tag.
    pub tag: Option<String>,
    /// Page the bullet was found on.
    pub source_page: u32,
    /// Document source that produced this record.
    pub source_doc_id: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Feature/USP persistence contract.
pub trait FeatureStore: Send + Sync {
    /// Persist feature bullets, returning how many were stored.
    fn insert_features(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        source_doc_id: Uuid,
        features: &[ParsedFeature],
    ) -> Result<usize>;

    /// Persist USP bullets, returning how many were stored.
    fn insert_usps(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        source_doc_id: Uuid,
        usps: &[ParsedUsp],
    ) -> Result<usize>;

    /// Every record for a tenant.
    fn list(&self, tenant_id: Uuid) -> Result<Vec<FeatureRecord>>;
}

/// In-memory feature store.
#[derive(Debug, Default)]
pub struct MemoryFeatureStore {
    records: RwLock<HashMap<Uuid, Vec<FeatureRecord>>>,
}

impl MemoryFeatureStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeatureStore for MemoryFeatureStore {
    fn insert_features(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        source_doc_id: Uuid,
        features: &[ParsedFeature],
    ) -> Result<usize> {
        let mut records = self.records.write().expect("feature store lock poisoned");
        let tenant = records.entry(tenant_id).or_default();
        for feature in features {
            tenant.push(FeatureRecord {
                id: Uuid::new_v4(),
                tenant_id,
                product_id,
                is_usp: false,
                text: feature.text.clone(),
                tag: feature.tag.clone(),
                source_page: feature.source_page,
                source_doc_id,
                created_at: Utc::now(),
            });
        }
        Ok(features.len())
    }

    fn insert_usps(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        source_doc_id: Uuid,
        usps: &[ParsedUsp],
    ) -> Result<usize> {
        let mut records = self.records.write().expect("feature store lock poisoned");
        let tenant = records.entry(tenant_id).or_default();
        for usp in usps {
            tenant.push(FeatureRecord {
                id: Uuid::new_v4(),
                tenant_id,
                product_id,
                is_usp: true,
                text: usp.text.clone(),
                tag: usp.tag.clone(),
                source_page: usp.source_page,
                source_doc_id,
                created_at: Utc::now(),
            });
        }
        Ok(usps.len())
    }

    fn list(&self, tenant_id: Uuid) -> Result<Vec<FeatureRecord>> {
        let records = self.records.read().expect("feature store lock poisoned");
        Ok(records.get(&tenant_id).cloned().unwrap_or_default())
    }
}

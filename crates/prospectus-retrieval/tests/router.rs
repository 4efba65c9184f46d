//! Router integration tests over prepopulated in-memory collaborators.

use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::json;
use uuid::Uuid;

use prospectus_core::cancel::CancelContext;
use prospectus_core::config::Config;
use prospectus_core::ids::spec_value_id;
use prospectus_core::model::{
    AvailabilityState, ChunkType, RetrievalRequest, SpecStatus, SpecValue,
};
use prospectus_retrieval::RetrievalRouter;
use prospectus_store::{
    EmbeddingProvider, HashEmbedder, KvCache, LineageWriter, MemoryCache, MemoryLineage,
    MemorySpecStore, MemoryVectorIndex, SpecStore, VectorEntry, VectorIndex,
};

const DIMENSION: usize = 64;

struct Fixture {
    tenant: Uuid,
    product: Uuid,
    spec_store: Arc<MemorySpecStore>,
    vector_index: Arc<MemoryVectorIndex>,
    embedder: Arc<HashEmbedder>,
    router: RetrievalRouter,
}

impl Fixture {
    fn new(config: Config) -> Self {
        let spec_store = Arc::new(MemorySpecStore::new());
        let vector_index = Arc::new(MemoryVectorIndex::new(DIMENSION));
        let embedder = Arc::new(HashEmbedder::new(DIMENSION));
        let router = RetrievalRouter::new(
            config,
            Arc::clone(&spec_store) as Arc<dyn SpecStore>,
            Arc::clone(&vector_index) as Arc<dyn VectorIndex>,
            Arc::new(MemoryCache::new()) as Arc<dyn KvCache>,
            Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>,
            Arc::new(MemoryLineage::new()) as Arc<dyn LineageWriter>,
        );
        Self {
            tenant: Uuid::new_v4(),
            product: Uuid::new_v4(),
            spec_store,
            vector_index,
            embedder,
            router,
        }
    }

    fn seed_spec(&self, category: &str, name: &str, value: &str) {
        let now = Utc::now();
        let spec = SpecValue {
            id: spec_value_id(self.tenant, self.product, category, name),
            tenant_id: self.tenant,
            product_id: self.product,
            campaign_variant_id: None,
            category: category.into(),
            name: name.into(),
            value: value.into(),
            unit: None,
            key_features: String::new(),
            variant_availability: String::new(),
            numeric: None,
            confidence: 0.9,
            status: SpecStatus::Active,
            version: 1,
            source_doc_id: Uuid::new_v4(),
            source_page: 1,
            created_at: now,
            updated_at: now,
        };
        self.spec_store.upsert(spec, 0.5, false).unwrap();
    }

    fn seed_row_chunk(&self, category: &str, sub: &str, name: &str, value: &str) {
        let text = format!(
            "Category: {category}\nSub-Category: {sub}\nSpecification: {name}\nValue: {value}"
        );
        let vector = self
            .embedder
            .embed_single(&text, &CancelContext::none())
            .unwrap();
        let mut metadata = IndexMap::new();
        metadata.insert("parent_category".to_string(), json!(category));
        metadata.insert("sub_category".to_string(), json!(sub));
        metadata.insert("specification_type".to_string(), json!(name));
        metadata.insert("value".to_string(), json!(value));
        metadata.insert("explanation".to_string(), json!(format!("{name} is {value}.")));
        metadata.insert("text".to_string(), json!(text));
        metadata.insert("source_page".to_string(), json!(1));
        self.vector_index
            .insert(vec![VectorEntry {
                id: Uuid::new_v4(),
                tenant_id: self.tenant,
                product_id: self.product,
                campaign_variant_id: None,
                chunk_type: ChunkType::SpecRow,
                vector,
                metadata,
            }])
            .unwrap();
    }
}

#[test]
fn empty_question_in_nl_mode_is_a_validation_error() {
    let fixture = Fixture::new(Config::default());
    let request = RetrievalRequest::question(fixture.tenant, fixture.product, "   ");
    let err = fixture
        .router
        .query(&request, &CancelContext::none())
        .unwrap_err();
    assert_eq!(err.error_type(), "VALIDATION");
}

#[test]
fn structured_batch_keeps_request_order_under_aliases() {
    let config = Config {
        embedding_dimension: DIMENSION,
        ..Config::default()
    };
    let fixture = Fixture::new(config);
    fixture.seed_spec("Fuel Efficiency", "Fuel Efficiency", "25.49 km/l");
    fixture.seed_spec("Engine", "Power", "88 bhp");

    let request = RetrievalRequest::structured(
        fixture.tenant,
        fixture.product,
        vec!["Mileage".into(), "Horsepower".into(), "Frunk Volume".into()],
    );
    let response = fixture
        .router
        .query(&request, &CancelContext::none())
        .unwrap();

    assert_eq!(response.spec_availability.len(), 3);
    assert_eq!(response.spec_availability[0].spec_name, "Mileage");
    assert_eq!(response.spec_availability[0].status, AvailabilityState::Found);
    assert_eq!(response.spec_availability[1].spec_name, "Horsepower");
    assert_eq!(response.spec_availability[1].status, AvailabilityState::Found);
    assert_eq!(
        response.spec_availability[2].status,
        AvailabilityState::Unavailable
    );
    // Alias groups surface as alternative names
    assert!(response.spec_availability[0]
        .alternative_names
        .iter()
        .any(|name| name == "Fuel Economy"));
}

#[test]
fn semantic_fallback_disabled_leaves_keyword_results_only() {
    let config = Config {
        embedding_dimension: DIMENSION,
        semantic_fallback: false,
        ..Config::default()
    };
    let fixture = Fixture::new(config);
    fixture.seed_row_chunk("Exterior", "Colors", "Color", "Red");

    let request = RetrievalRequest::question(
        fixture.tenant,
        fixture.product,
        "What colors does this car come in?",
    );
    let response = fixture
        .router
        .query(&request, &CancelContext::none())
        .unwrap();
    assert!(response.semantic_chunks.is_empty());
}

#[test]
fn semantic_path_groups_and_materializes() {
    let config = Config {
        embedding_dimension: DIMENSION,
        cache_results: false,
        ..Config::default()
    };
    let fixture = Fixture::new(config);
    fixture.seed_row_chunk("Exterior", "Colors", "Color", "Pearl Red");
    fixture.seed_row_chunk("Exterior", "Colors", "Color Options", "Seven");

    let request = RetrievalRequest::question(
        fixture.tenant,
        fixture.product,
        "What colors does this car come in?",
    );
    let response = fixture
        .router
        .query(&request, &CancelContext::none())
        .unwrap();

    assert!(!response.semantic_chunks.is_empty());
    assert!(response
        .structured_facts
        .iter()
        .any(|fact| fact.name == "Color"));

    let groups = prospectus_retrieval::group_row_chunks(&response.semantic_chunks);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].parent_category, "Exterior");
    assert_eq!(groups[0].sub_category, "Colors");
    assert_eq!(groups[0].chunks.len(), response.semantic_chunks.len());
}

#[test]
fn queries_are_tenant_scoped() {
    let config = Config {
        embedding_dimension: DIMENSION,
        ..Config::default()
    };
    let fixture = Fixture::new(config);
    fixture.seed_spec("Engine", "Power", "88 bhp");
    fixture.seed_row_chunk("Engine", "General", "Power", "88 bhp");

    let foreign = RetrievalRequest::question(Uuid::new_v4(), fixture.product, "What is the power?");
    let response = fixture
        .router
        .query(&foreign, &CancelContext::none())
        .unwrap();
    assert!(response.structured_facts.is_empty());
    assert!(response.semantic_chunks.is_empty());
    assert!((response.overall_confidence - 0.0).abs() < f64::EPSILON);
}

//! Integration tests for the ingestion pipeline against the in-memory
//! collaborators.

use std::io::Write;
use std::sync::Arc;

use uuid::Uuid;

use prospectus_core::cancel::CancelContext;
use prospectus_core::config::Config;
use prospectus_core::model::{IngestionRequest, JobStatus};
use prospectus_ingest::IngestionPipeline;
use prospectus_store::{
    ChunkStore, EmbeddingProvider, FeatureStore, FlakyEmbedder, HashEmbedder, KvCache,
    LineageWriter, MemoryCache, MemoryChunkStore, MemoryFeatureStore, MemoryLineage,
    MemorySpecStore, MemoryVectorIndex, SpecStore, VectorIndex,
};

const DIMENSION: usize = 64;

struct Fixture {
    spec_store: Arc<MemorySpecStore>,
    feature_store: Arc<MemoryFeatureStore>,
    chunk_store: Arc<MemoryChunkStore>,
    vector_index: Arc<MemoryVectorIndex>,
    cache: Arc<MemoryCache>,
    lineage: Arc<MemoryLineage>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            spec_store: Arc::new(MemorySpecStore::new()),
            feature_store: Arc::new(MemoryFeatureStore::new()),
            chunk_store: Arc::new(MemoryChunkStore::new()),
            vector_index: Arc::new(MemoryVectorIndex::new(DIMENSION)),
            cache: Arc::new(MemoryCache::new()),
            lineage: Arc::new(MemoryLineage::new()),
        }
    }

    fn pipeline(&self, embedder: Arc<dyn EmbeddingProvider>) -> IngestionPipeline {
        let config = Config {
            embedding_dimension: DIMENSION,
            ..Config::default()
        };
        IngestionPipeline::new(
            config,
            Arc::clone(&self.spec_store) as Arc<dyn SpecStore>,
            Arc::clone(&self.feature_store) as Arc<dyn FeatureStore>,
            Arc::clone(&self.chunk_store) as Arc<dyn ChunkStore>,
            Arc::clone(&self.vector_index) as Arc<dyn VectorIndex>,
            Arc::clone(&self.cache) as Arc<dyn KvCache>,
            embedder,
            Arc::clone(&self.lineage) as Arc<dyn LineageWriter>,
        )
    }
}

fn write_markdown(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write markdown");
    file
}

fn request(tenant: Uuid, markdown: &tempfile::NamedTempFile) -> IngestionRequest {
    IngestionRequest {
        tenant_id: tenant,
        product_id: Uuid::new_v4(),
        campaign_id: None,
        markdown_path: Some(markdown.path().to_path_buf()),
        pdf_path: None,
        operator: "tests".into(),
        overwrite: false,
        auto_publish: false,
    }
}

const DOC: &str = "\
---
product: Vitara
---
<!-- PAGE 1 -->
| Exterior | Colors | Color | Red | Standard |
| Engine | Power | 88 bhp |

## Key Features

- Six airbags as standard
";

#[test]
fn full_ingest_populates_every_store() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline(Arc::new(HashEmbedder::new(DIMENSION)));
    let tenant = Uuid::new_v4();
    let doc = write_markdown(DOC);

    let result = pipeline.ingest(&request(tenant, &doc), &CancelContext::none());

    assert_eq!(result.status, JobStatus::Succeeded);
    assert_eq!(result.counts.specs_created, 2);
    assert_eq!(result.counts.features, 1);
    assert!(result.counts.chunks_created >= 3);
    assert_eq!(result.counts.embeddings_failed, 0);
    assert!(result.document.is_some());
    assert_eq!(result.document.as_ref().unwrap().content_sha256.len(), 64);

    assert_eq!(fixture.spec_store.count(tenant).unwrap(), 2);
    assert_eq!(fixture.feature_store.list(tenant).unwrap().len(), 1);
    assert_eq!(
        fixture.vector_index.count(tenant).unwrap(),
        result.counts.chunks_created
    );
    assert!(fixture.chunk_store.pending_embedding(tenant).unwrap().is_empty());
    assert_eq!(fixture.lineage.recent(tenant, 10).len(), 1);
}

#[test]
fn missing_source_is_a_fatal_config_error() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline(Arc::new(HashEmbedder::new(DIMENSION)));
    let request = IngestionRequest {
        tenant_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        campaign_id: None,
        markdown_path: None,
        pdf_path: None,
        operator: "tests".into(),
        overwrite: false,
        auto_publish: false,
    };
    let result = pipeline.ingest(&request, &CancelContext::none());
    assert_eq!(result.status, JobStatus::Failed);
    assert!(result.errors.iter().any(|e| e.message.contains("content source")));
}

#[test]
fn two_sources_are_rejected() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline(Arc::new(HashEmbedder::new(DIMENSION)));
    let doc = write_markdown(DOC);
    let mut req = request(Uuid::new_v4(), &doc);
    req.pdf_path = Some(doc.path().to_path_buf());
    let result = pipeline.ingest(&req, &CancelContext::none());
    assert_eq!(result.status, JobStatus::Failed);
}

#[test]
fn unreadable_markdown_fails_the_job() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline(Arc::new(HashEmbedder::new(DIMENSION)));
    let mut req = request(Uuid::new_v4(), &write_markdown(DOC));
    req.markdown_path = Some("/definitely/not/here.md".into());
    let result = pipeline.ingest(&req, &CancelContext::none());
    assert_eq!(result.status, JobStatus::Failed);
}

#[test]
fn retry_surface_drains_with_a_healthy_provider() {
    let fixture = Fixture::new();
    let tenant = Uuid::new_v4();
    let doc = write_markdown(DOC);

    // First pass: the Power row fails to embed
    let flaky = fixture.pipeline(Arc::new(FlakyEmbedder::new(
        DIMENSION,
        vec!["Value: 88 bhp".to_string()],
    )));
    let result = flaky.ingest(&request(tenant, &doc), &CancelContext::none());
    assert_eq!(result.status, JobStatus::Succeeded);
    assert_eq!(result.counts.embeddings_failed, 1);
    assert_eq!(fixture.chunk_store.pending_embedding(tenant).unwrap().len(), 1);

    // Out-of-band retry with a healthy provider drains the surface
    let healthy = fixture.pipeline(Arc::new(HashEmbedder::new(DIMENSION)));
    let outcome = healthy
        .retry_incomplete_embeddings(tenant, &CancelContext::none())
        .unwrap();
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 0);
    assert!(fixture.chunk_store.pending_embedding(tenant).unwrap().is_empty());
}

#[test]
fn successful_ingest_invalidates_tenant_cache() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline(Arc::new(HashEmbedder::new(DIMENSION)));
    let tenant = Uuid::new_v4();
    fixture
        .cache
        .set(
            &format!("{tenant}:query:stale"),
            "{}",
            std::time::Duration::from_secs(600),
        )
        .unwrap();
    fixture
        .cache
        .set("other:query:kept", "{}", std::time::Duration::from_secs(600))
        .unwrap();

    let doc = write_markdown(DOC);
    pipeline.ingest(&request(tenant, &doc), &CancelContext::none());

    assert!(fixture.cache.get(&format!("{tenant}:query:stale")).unwrap().is_none());
    assert!(fixture.cache.get("other:query:kept").unwrap().is_some());
}

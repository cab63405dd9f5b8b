//! End-to-end pipeline tests against mocked model backends

use lcg_cache::MokaCacheStore;
use lcg_core::{ContentPipeline, GenerationError, LcgConfig};
use lcg_index::{EmbeddingGenerator, InMemoryVectorIndex, PassageMetadata, VectorIndex};
use lcg_jobs::{GenerationJob, JobId, JobKind, JobStatus, QueueConfig};
use lcg_rag::RagConfig;
use lcg_test_utils::{FixedEmbedder, MockLlmClient};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DIM: usize = 8;

struct Fixture {
    pipeline: ContentPipeline,
    llm: Arc<MockLlmClient>,
    index: Arc<InMemoryVectorIndex>,
}

fn fixture(llm: MockLlmClient) -> Fixture {
    let llm = Arc::new(llm);
    let index = Arc::new(InMemoryVectorIndex::new(DIM));
    let config = LcgConfig::new()
        .with_queue(
            QueueConfig::default()
                .with_workers(2)
                .with_poll_interval(Duration::from_millis(10)),
        )
        .with_rag(RagConfig {
            min_score: None,
            ..RagConfig::default()
        });

    let pipeline = ContentPipeline::with_components(
        config,
        Arc::new(MokaCacheStore::new(100)),
        Arc::new(FixedEmbedder::new(DIM)),
        index.clone(),
        llm.clone(),
    );

    Fixture {
        pipeline,
        llm,
        index,
    }
}

async fn seed_passage(index: &InMemoryVectorIndex, text: &str, metadata: PassageMetadata) {
    let vector = FixedEmbedder::new(DIM).embed(text).await.unwrap();
    index
        .upsert(Uuid::new_v4(), vector, text.to_string(), metadata)
        .await
        .unwrap();
}

async fn poll_until_terminal(pipeline: &ContentPipeline, id: JobId) -> GenerationJob {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let job = pipeline.poll(id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not reach a terminal state in time")
}

#[tokio::test]
async fn syllabus_job_completes_with_generated_document() {
    let fx = fixture(MockLlmClient::fixed("UNIT 1: Numbers\nUNIT 2: Algebra"));
    seed_passage(
        &fx.index,
        "NCERT class 8 math covers rational numbers",
        PassageMetadata {
            subject: Some("Math".to_string()),
            class_level: Some("8".to_string()),
            board: Some("CBSE".to_string()),
            ..Default::default()
        },
    )
    .await;

    let id = fx
        .pipeline
        .submit(
            JobKind::SyllabusGeneration,
            serde_json::json!({"subject": "Math", "class": "8", "board": "CBSE"}),
        )
        .await
        .unwrap();

    let job = poll_until_terminal(&fx.pipeline, id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);

    let result = job.result.unwrap();
    assert_eq!(
        result.get("document").and_then(|v| v.as_str()),
        Some("UNIT 1: Numbers\nUNIT 2: Algebra")
    );

    fx.pipeline.shutdown().await;
}

#[tokio::test]
async fn invalid_payload_is_rejected_before_enqueue() {
    let fx = fixture(MockLlmClient::fixed("unused"));

    let err = fx
        .pipeline
        .submit(
            JobKind::SyllabusGeneration,
            serde_json::json!({"subject": "Math"}),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Validation(_)));
    assert_eq!(fx.llm.calls(), 0);

    fx.pipeline.shutdown().await;
}

#[tokio::test]
async fn polling_unknown_job_is_not_found() {
    let fx = fixture(MockLlmClient::fixed("unused"));

    let err = fx.pipeline.poll(JobId::new()).await.unwrap_err();
    assert!(matches!(err, GenerationError::NotFound(_)));

    fx.pipeline.shutdown().await;
}

#[tokio::test]
async fn identical_syllabus_jobs_hit_the_cache() {
    let fx = fixture(MockLlmClient::fixed("the document"));
    let payload = serde_json::json!({"subject": "Math", "class": "8", "board": "CBSE"});

    let first = fx
        .pipeline
        .submit(JobKind::SyllabusGeneration, payload.clone())
        .await
        .unwrap();
    let first_job = poll_until_terminal(&fx.pipeline, first).await;
    assert_eq!(first_job.status, JobStatus::Completed);

    let second = fx
        .pipeline
        .submit(JobKind::SyllabusGeneration, payload)
        .await
        .unwrap();
    let second_job = poll_until_terminal(&fx.pipeline, second).await;
    assert_eq!(second_job.status, JobStatus::Completed);

    // Same query, filters, and model version: exactly one model call
    assert_eq!(fx.llm.calls(), 1);
    let result = second_job.result.unwrap();
    assert_eq!(result.get("cached"), Some(&serde_json::json!(true)));
    assert_eq!(
        result.get("document").and_then(|v| v.as_str()),
        Some("the document")
    );

    fx.pipeline.shutdown().await;
}

#[tokio::test]
async fn questions_batch_generates_and_indexes_questions() {
    let fx = fixture(MockLlmClient::fixed(
        "1. What is a fraction?\n2. Compare 1/2 and 1/3.\n3. Define a proper fraction.",
    ));

    let id = fx
        .pipeline
        .submit(
            JobKind::QuestionsBatch,
            serde_json::json!({
                "topic_id": "topic-fractions",
                "topic": "Fractions",
                "count": 3,
                "difficulty": "easy",
            }),
        )
        .await
        .unwrap();

    let job = poll_until_terminal(&fx.pipeline, id).await;
    assert_eq!(job.status, JobStatus::Completed);

    let result = job.result.unwrap();
    let questions = result.get("questions").unwrap().as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[0], "What is a fraction?");
    assert_eq!(result.get("embeddings_pending"), Some(&serde_json::json!(0)));

    // Each generated question became searchable
    assert_eq!(fx.index.len(), 3);

    fx.pipeline.shutdown().await;
}

#[tokio::test]
async fn enhancement_resyncs_the_entity_embedding() {
    let fx = fixture(MockLlmClient::fixed("A fraction names equal parts of a whole."));
    let entity_id = Uuid::new_v4();

    let id = fx
        .pipeline
        .submit(
            JobKind::ContentEnhancement,
            serde_json::json!({
                "entity_id": entity_id.to_string(),
                "entity_type": "topic",
                "text": "fractions are parts",
                "subject": "Math",
            }),
        )
        .await
        .unwrap();

    let job = poll_until_terminal(&fx.pipeline, id).await;
    assert_eq!(job.status, JobStatus::Completed);

    let result = job.result.unwrap();
    assert_eq!(result.get("embedding_synced"), Some(&serde_json::json!(true)));
    assert_eq!(fx.index.len(), 1);

    fx.pipeline.shutdown().await;
}

#[tokio::test]
async fn failed_job_carries_structured_error_detail() {
    use lcg_llm::LlmError;

    // Model times out on every attempt
    let fx = fixture(MockLlmClient::scripted(vec![
        Err(LlmError::Timeout { timeout_secs: 1 }),
        Err(LlmError::Timeout { timeout_secs: 1 }),
        Err(LlmError::Timeout { timeout_secs: 1 }),
    ]));

    let id = fx
        .pipeline
        .submit(
            JobKind::SyllabusGeneration,
            serde_json::json!({"subject": "Math", "class": "8", "board": "CBSE"}),
        )
        .await
        .unwrap();

    let job = poll_until_terminal(&fx.pipeline, id).await;
    assert_eq!(job.status, JobStatus::Failed);

    let detail = job.error.unwrap();
    assert_eq!(detail.code, "timeout");
    assert!(detail.retryable);
    assert!(job.result.is_none());

    fx.pipeline.shutdown().await;
}

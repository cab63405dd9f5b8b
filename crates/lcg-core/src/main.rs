//! Smoke binary: submit one syllabus job against a local model server
//! and poll it to a terminal state.
//!
//! ```text
//! LCG_MODEL_URL=http://localhost:11434 LCG_MODEL=llama3:8b cargo run --bin lcg-demo
//! ```

use anyhow::Context;
use lcg_core::{ContentPipeline, LcgConfig};
use lcg_jobs::{JobKind, JobStatus};
use lcg_llm::LlmConfig;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let base_url =
        std::env::var("LCG_MODEL_URL").unwrap_or_else(|_| "http://localhost:11434".to_string());
    let model = std::env::var("LCG_MODEL").unwrap_or_else(|_| "llama3:8b".to_string());

    let config = LcgConfig::new().with_llm(LlmConfig::new(base_url, model));
    let pipeline = ContentPipeline::start(config).context("failed to start pipeline")?;

    let id = pipeline
        .submit(
            JobKind::SyllabusGeneration,
            serde_json::json!({"subject": "Math", "class": "8", "board": "CBSE"}),
        )
        .await
        .context("submission rejected")?;
    tracing::info!(job_id = %id, "submitted syllabus job");

    loop {
        let job = pipeline.poll(id).await?;
        tracing::info!(status = %job.status, progress = job.progress, "polled");
        match job.status {
            JobStatus::Completed => {
                println!("{}", serde_json::to_string_pretty(&job.result)?);
                break;
            }
            JobStatus::Failed => {
                let detail = job.error.context("failed job without error detail")?;
                anyhow::bail!("job failed: [{}] {}", detail.code, detail.message);
            }
            _ => tokio::time::sleep(Duration::from_secs(2)).await,
        }
    }

    pipeline.shutdown().await;
    Ok(())
}

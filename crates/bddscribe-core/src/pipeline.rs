//! End-to-end generation pipeline.
//!
//! Scrape → extract → assemble → plan → render, with metrics reported to the
//! tracker at each stage. Extraction calls are independent and
//! latency-dominated, so they fan out concurrently, but their results are
//! folded into the assembler strictly in input order — `buffered` preserves
//! ordering, which keeps the first-wins merge deterministic.

// Internal imports (std, crate)
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::assemble::assemble;
use crate::config::Config;
use crate::crud;
use crate::error::{Error, Result};
use crate::extract::ChunkExtractor;
use crate::record::RawEndpointRecord;
use crate::render::FeatureRenderer;
use crate::scenario;
use crate::scrape::scrape_swagger_ui;
use crate::tracker::RunTracker;

// External imports (alphabetized)
use futures::stream::{self, StreamExt};
use serde::Serialize;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// What one run produced, for the CLI summary and exit handling.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub chunk_count: usize,
    pub endpoints: usize,
    pub conflicts: usize,
    pub skipped_records: usize,
    pub feature_files: Vec<PathBuf>,
    pub step_files: Vec<PathBuf>,
}

/// Run the full pipeline from a documentation URL.
pub async fn run(
    config: &Config,
    extractor: &dyn ChunkExtractor,
    tracker: &dyn RunTracker,
) -> Result<RunSummary> {
    tracker.log_param("swagger_url", &config.swagger_url).await;
    tracker.log_param("model_name", &config.model).await;

    let client = reqwest::Client::new();
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let chunks = match scrape_swagger_ui(
        &client,
        &config.swagger_url,
        timeout,
        &config.fallback_selectors,
    )
    .await
    {
        Ok(chunks) => chunks,
        Err(e) => {
            tracker.finish(false).await;
            return Err(e);
        }
    };

    run_from_chunks(config, chunks, extractor, tracker).await
}

/// Run the pipeline over pre-scraped HTML chunks.
///
/// Split out from [`run`] so tests and callers with their own scraping can
/// drive everything downstream of the fetch.
pub async fn run_from_chunks(
    config: &Config,
    chunks: Vec<String>,
    extractor: &dyn ChunkExtractor,
    tracker: &dyn RunTracker,
) -> Result<RunSummary> {
    let start = Instant::now();
    let chunk_count = chunks.len();
    tracker.log_metric("chunk_count", chunk_count as f64).await;

    log::info!("Extracting endpoint information from {} chunk(s)", chunk_count);
    let concurrency = config.concurrency.max(1);
    let records: Vec<RawEndpointRecord> = stream::iter(chunks)
        .map(|chunk| async move { extractor.extract(&chunk).await })
        .buffered(concurrency)
        .collect()
        .await;

    // Single-threaded, order-stable fold over the extraction results
    log::info!("Assembling endpoint information");
    let outcome = assemble(records);
    for note in &outcome.conflicts {
        log::warn!(
            "{} for {} {} (field '{}'): {}",
            note.kind.as_str(),
            note.method,
            note.path,
            note.field,
            note.description
        );
    }

    let usage = extractor.usage();
    tracker.log_metric("api_calls", usage.calls as f64).await;
    tracker.log_metric("total_tokens", usage.total_tokens as f64).await;
    tracker.log_metric("total_cost_usd", usage.estimated_cost_usd).await;
    tracker.log_metric("endpoint_count", outcome.catalog.len() as f64).await;
    tracker.log_metric("conflict_count", outcome.conflicts.len() as f64).await;
    tracker.log_metric("skipped_records", outcome.skipped as f64).await;

    if outcome.catalog.is_empty() {
        log::error!("No usable endpoints were assembled; nothing to generate");
        tracker.finish(false).await;
        return Err(Error::NoEndpoints(chunk_count));
    }

    let base_url = config
        .api_base_url
        .as_ref()
        .map(|url| url.to_string().trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let renderer = FeatureRenderer::new(config.template_dir.as_deref().map(Path::new), base_url)?;
    let output_dir = Path::new(&config.output_dir);

    let mut summary = RunSummary {
        chunk_count,
        endpoints: outcome.catalog.len(),
        conflicts: outcome.conflicts.len(),
        skipped_records: outcome.skipped,
        ..RunSummary::default()
    };

    log::info!("Generating feature files for {} endpoint(s)", outcome.catalog.len());
    for endpoint in &outcome.catalog {
        let skeletons = scenario::plan(endpoint, config.max_optional_params);

        let feature_path = renderer.write_feature(output_dir, endpoint, &skeletons).await?;
        tracker.log_artifact(&feature_path, "feature").await;
        summary.feature_files.push(feature_path);

        let steps_path = renderer.write_steps(output_dir, endpoint).await?;
        tracker.log_artifact(&steps_path, "steps").await;
        summary.step_files.push(steps_path);
    }

    log::info!("Generating CRUD scenarios");
    for set in crud::group(&outcome.catalog).values() {
        if set.skeletons.is_empty() {
            continue;
        }
        let crud_path = renderer.write_crud_feature(output_dir, set).await?;
        tracker.log_artifact(&crud_path, "crud").await;
        summary.feature_files.push(crud_path);
    }

    tracker
        .log_metric("total_execution_time", start.elapsed().as_secs_f64())
        .await;
    tracker.finish(true).await;

    Ok(summary)
}

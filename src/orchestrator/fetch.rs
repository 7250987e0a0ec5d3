use crate::errors::AggregationError;
use crate::model::{ExecutionRecord, PipelineRef, TimeWindow};
use crate::pool::WorkerPool;
use crate::providers::{ExecutionSource, PaginationHint};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Every run of `pipeline` inside `window`.
///
/// Page 1 is fetched first to learn how many pages exist. A known page count fans the
/// remaining pages out on the pool; an open-ended "more pages" signal is followed one
/// page at a time. Pages after the first that come back 404 fail the fetch as a server
/// error.
pub async fn fetch_all_pages(
    source: Arc<dyn ExecutionSource>,
    pipeline: PipelineRef,
    window: TimeWindow,
    page_size: u32,
    pool: WorkerPool,
) -> Result<Vec<ExecutionRecord>, AggregationError> {
    let first = pool
        .run(source.fetch_execution_page(&pipeline, 1, page_size, &window))
        .await?;
    let mut records = first.records;

    match first.hint {
        PaginationHint::Exhausted => {}
        PaginationHint::TotalPages(total) => {
            debug!(pipeline = %pipeline.name, total, "Fanning out remaining pages");
            let tasks = (2..=total).map(|page| {
                let source = Arc::clone(&source);
                let pipeline = pipeline.clone();
                let pool = pool.clone();
                async move {
                    pool.run(source.fetch_execution_page(&pipeline, page, page_size, &window))
                        .await
                        .map(|page| page.records)
                        .map_err(|e| AggregationError::from(e).remap_missing_page())
                }
            });
            for page in pool.join_all(tasks).await? {
                records.extend(page);
            }
        }
        PaginationHint::HasMore => {
            let mut page = 1;
            loop {
                page += 1;
                let next = pool
                    .run(source.fetch_execution_page(&pipeline, page, page_size, &window))
                    .await
                    .map_err(|e| AggregationError::from(e).remap_missing_page())?;
                let empty = next.records.is_empty();
                records.extend(next.records);

                let more = match next.hint {
                    PaginationHint::HasMore => !empty,
                    PaginationHint::TotalPages(total) => page < total,
                    PaginationHint::Exhausted => false,
                };
                if !more {
                    break;
                }
            }
            debug!(pipeline = %pipeline.name, pages = page, "Followed pages sequentially");
        }
    }

    info!(pipeline = %pipeline.name, records = records.len(), "Pipeline runs fetched");
    Ok(records)
}

/// Runs one paginated fetch per pipeline and joins them, keeping the request order.
pub async fn fetch_pipelines(
    source: Arc<dyn ExecutionSource>,
    pipelines: &[PipelineRef],
    window: TimeWindow,
    page_size: u32,
    pool: &WorkerPool,
) -> Result<Vec<(PipelineRef, Vec<ExecutionRecord>)>, AggregationError> {
    let tasks = pipelines.iter().cloned().map(|pipeline| {
        let source = Arc::clone(&source);
        let pool = pool.clone();
        async move {
            let records =
                fetch_all_pages(source, pipeline.clone(), window, page_size, pool).await?;
            Ok::<_, AggregationError>((pipeline, records))
        }
    });
    pool.join_all(tasks).await
}

/// Distinct step names of a pipeline's runs, in the order they first appear.
///
/// Runs are visited oldest first so the result does not depend on page order.
pub async fn collect_step_names(
    source: Arc<dyn ExecutionSource>,
    pipeline: PipelineRef,
    window: TimeWindow,
    page_size: u32,
    pool: WorkerPool,
) -> Result<Vec<String>, AggregationError> {
    let mut records = fetch_all_pages(source, pipeline.clone(), window, page_size, pool).await?;
    records.sort_by_key(|r| (r.created_at, r.number));

    let names = step_names(&records);
    if names.is_empty() {
        warn!(pipeline = %pipeline.name, "No steps found in window");
    }
    Ok(names)
}

pub fn step_names(records: &[ExecutionRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .flat_map(|r| r.steps.iter())
        .filter(|step| seen.insert(step.name.as_str()))
        .map(|step| step.name.clone())
        .collect()
}

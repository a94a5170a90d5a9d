//! Library-wide marker artifact generation.

use rk_core::{Error, Result, SceneId, SceneMarkerId};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::pool::WorkPool;
use crate::task::{GenerationContext, GenerationTarget, GenerationTask, TaskReport};

/// Which markers a batch covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchTarget {
    /// Every scene that has at least one marker.
    All,
    Scene(SceneId),
    Marker(SceneMarkerId),
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub target: BatchTarget,
    pub overwrite: bool,
    /// Only compute the outstanding count.
    pub dry_run: bool,
    /// Maximum number of tasks running at once.
    pub concurrency: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            target: BatchTarget::All,
            overwrite: false,
            dry_run: false,
            concurrency: 1,
        }
    }
}

/// Totals over a batch, counted in (marker, kind) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerateSummary {
    /// Tasks built for the batch.
    pub tasks: usize,
    /// Pairs needing generation before the batch ran.
    pub outstanding: usize,
    /// Pairs the encoder was invoked for.
    pub attempted: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Tasks that ended without touching their markers: a metadata error
    /// or a panic.
    pub aborted: usize,
    /// Tasks never submitted because the batch was cancelled.
    pub cancelled: usize,
}

impl GenerateSummary {
    fn record(&mut self, report: &TaskReport) {
        self.attempted += report.attempted();
        self.generated += report.generated();
        self.skipped += report.skipped();
        self.failed += report.failed();
        if report.is_aborted() {
            self.aborted += 1;
        }
    }
}

/// Generate marker artifacts for `options.target`.
///
/// Builds one task per scene (or one for a single marker), sizes the work
/// with [`GenerationTask::outstanding`], then runs the tasks through a
/// [`WorkPool`]. Cancelling `cancel` stops further submissions; tasks
/// already running finish normally. Individual artifact failures only show
/// up in the summary counts.
pub async fn generate_markers(
    ctx: &GenerationContext,
    options: &GenerateOptions,
    cancel: CancellationToken,
) -> Result<GenerateSummary> {
    let targets = match options.target {
        BatchTarget::All => scenes_with_markers(ctx).await?,
        BatchTarget::Scene(id) => vec![GenerationTarget::Scene(id)],
        BatchTarget::Marker(id) => vec![GenerationTarget::Marker(id)],
    };

    let tasks: Vec<GenerationTask> = targets
        .into_iter()
        .map(|target| GenerationTask::new(ctx.clone(), target, options.overwrite))
        .collect();

    let mut summary = GenerateSummary {
        tasks: tasks.len(),
        ..Default::default()
    };
    for task in &tasks {
        summary.outstanding += task.outstanding().await;
    }

    tracing::info!(
        tasks = summary.tasks,
        outstanding = summary.outstanding,
        overwrite = options.overwrite,
        "[generator] generating {} marker artifacts",
        summary.outstanding
    );

    if options.dry_run {
        return Ok(summary);
    }

    let mut pool = WorkPool::new(options.concurrency);
    let mut remaining = tasks.into_iter();
    for task in remaining.by_ref() {
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            res = pool.submit(async move { task.run().await }) => {
                res?;
                true
            }
        };
        if !submitted {
            summary.cancelled += 1;
            break;
        }
    }
    summary.cancelled += remaining.count();
    if summary.cancelled > 0 {
        tracing::warn!(
            skipped_tasks = summary.cancelled,
            "[generator] cancelled, waiting for running tasks"
        );
    }

    let drained = pool.wait_all().await;
    for report in &drained.outputs {
        summary.record(report);
    }
    summary.aborted += drained.panicked;

    tracing::info!(
        generated = summary.generated,
        skipped = summary.skipped,
        failed = summary.failed,
        aborted = summary.aborted,
        "[generator] marker generation complete"
    );

    Ok(summary)
}

async fn scenes_with_markers(ctx: &GenerationContext) -> Result<Vec<GenerationTarget>> {
    let txn = ctx.txn.clone();
    tokio::task::spawn_blocking(move || {
        txn.with_read_txn(|repo| {
            Ok(repo
                .scenes()
                .with_markers()?
                .into_iter()
                .map(|scene| GenerationTarget::Scene(scene.id))
                .collect::<Vec<_>>())
        })
    })
    .await
    .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_serializes_counts() {
        let summary = GenerateSummary {
            tasks: 2,
            outstanding: 4,
            attempted: 4,
            generated: 3,
            failed: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["generated"], 3);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["cancelled"], 0);
    }

    #[test]
    fn default_options_cover_everything() {
        let opts = GenerateOptions::default();
        assert_eq!(opts.target, BatchTarget::All);
        assert!(!opts.overwrite);
        assert!(!opts.dry_run);
    }
}

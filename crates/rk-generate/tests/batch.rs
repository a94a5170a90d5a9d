//! Batch generation and bounded concurrency.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{FakeEncoder, InFlightEncoder, PanickingEncoder, TestHarness};
use rk_core::ArtifactKind;
use rk_generate::{
    generate_markers, BatchTarget, GenerateOptions, GenerationTarget, GenerationTask, WorkPool,
};
use tokio_util::sync::CancellationToken;

fn hash(i: usize) -> String {
    format!("{i:032x}")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn fifty_tasks_never_exceed_limit() {
    let h = TestHarness::new();
    let scenes: Vec<_> = (0..50)
        .map(|i| h.scene_with_markers(&hash(i), &[1.0, 2.0]))
        .collect();

    let encoder = Arc::new(InFlightEncoder::default());
    let ctx = h.context(encoder.clone());
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut pool = WorkPool::new(4);
    for (scene, _) in &scenes {
        let task = GenerationTask::new(ctx.clone(), GenerationTarget::Scene(scene.id), false);
        let current = current.clone();
        let peak = peak.clone();
        pool.submit(async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            let report = task.run().await;
            current.fetch_sub(1, Ordering::SeqCst);
            report
        })
        .await
        .unwrap();
        assert!(pool.in_flight() <= 4);
    }

    let drained = pool.wait_all().await;
    assert_eq!(drained.panicked, 0);
    let reports = drained.outputs;
    assert_eq!(reports.len(), 50);
    assert!(reports.iter().all(|r| !r.is_aborted() && r.failed() == 0));
    assert!(peak.load(Ordering::SeqCst) <= 4);
    assert!(encoder.peak.load(Ordering::SeqCst) <= 4);

    for i in 0..50 {
        for offset in [1, 2] {
            for kind in ArtifactKind::ALL {
                assert!(
                    h.read_artifact(&hash(i), offset, kind).is_some(),
                    "missing {kind} at {offset} for scene {i}"
                );
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batch_summary_counts_pairs() {
    let h = TestHarness::new();
    h.scene_with_markers(&hash(1), &[1.0, 2.0]);
    h.scene_with_markers(&hash(2), &[3.0]);
    // Scenes without markers are not part of the batch.
    h.scene_with_markers(&hash(3), &[]);

    let encoder = FakeEncoder::failing_on(&[(3, ArtifactKind::Preview)], false);
    let ctx = h.context(encoder.clone());
    let options = GenerateOptions {
        concurrency: 2,
        ..Default::default()
    };

    let summary = generate_markers(&ctx, &options, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.tasks, 2);
    assert_eq!(summary.outstanding, 6);
    assert_eq!(summary.attempted, 6);
    assert_eq!(summary.generated, 5);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.aborted, 0);
    assert_eq!(encoder.calls(), summary.outstanding);

    // Re-running only retries the failed pair.
    let encoder = FakeEncoder::new();
    let summary = generate_markers(&h.context(encoder.clone()), &options, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.outstanding, 1);
    assert_eq!(summary.generated, 1);
    assert_eq!(summary.skipped, 5);
    assert_eq!(encoder.calls(), 1);
}

#[tokio::test]
async fn dry_run_only_counts() {
    let h = TestHarness::new();
    let (scene, markers) = h.scene_with_markers(&hash(7), &[1.0, 2.0, 3.0]);
    let encoder = FakeEncoder::new();
    let ctx = h.context(encoder.clone());

    for (target, expected) in [
        (BatchTarget::All, 6),
        (BatchTarget::Scene(scene.id), 6),
        (BatchTarget::Marker(markers[2].id), 2),
    ] {
        let options = GenerateOptions {
            target,
            dry_run: true,
            ..Default::default()
        };
        let summary = generate_markers(&ctx, &options, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.outstanding, expected);
        assert_eq!(summary.attempted, 0);
    }
    assert_eq!(encoder.calls(), 0);
}

#[tokio::test]
async fn cancelled_batch_submits_nothing() {
    let h = TestHarness::new();
    for i in 0..3 {
        h.scene_with_markers(&hash(i), &[1.0]);
    }
    let encoder = FakeEncoder::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = generate_markers(&h.context(encoder.clone()), &GenerateOptions::default(), cancel)
        .await
        .unwrap();
    assert_eq!(summary.tasks, 3);
    assert_eq!(summary.cancelled, 3);
    assert_eq!(encoder.calls(), 0);
}

#[tokio::test]
async fn unknown_marker_counts_as_aborted_task() {
    let h = TestHarness::new();
    let options = GenerateOptions {
        target: BatchTarget::Marker(rk_core::SceneMarkerId::new()),
        ..Default::default()
    };
    let summary = generate_markers(
        &h.context(FakeEncoder::new()),
        &options,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(summary.tasks, 1);
    assert_eq!(summary.outstanding, 0);
    assert_eq!(summary.aborted, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_task_counts_as_aborted() {
    let h = TestHarness::new();
    h.scene_with_markers(&hash(1), &[1.0]);
    h.scene_with_markers(&hash(2), &[2.0]);
    let options = GenerateOptions {
        concurrency: 2,
        ..Default::default()
    };

    let summary = generate_markers(
        &h.context(Arc::new(PanickingEncoder)),
        &options,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(summary.tasks, 2);
    assert_eq!(summary.outstanding, 4);
    assert_eq!(summary.aborted, 2);
    assert_eq!(summary.generated, 0);
}

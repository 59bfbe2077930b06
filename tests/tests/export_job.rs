//! Tests for the hourly export job.
//!
//! The window query is mocked; the blob store and the watermark store are
//! real `object_store` backends held in memory.

use integration_tests::{
    fixtures::{self, ts},
    mocks::MockWindowQuery,
    setup::ExportContext,
};
use pipeline_core::{Error, Watermark, WatermarkStore, Window};
use std::sync::Arc;
use worker::JobOutcome;

fn rows() -> MockWindowQuery {
    MockWindowQuery::new(fixtures::rows_across_hours())
}

/// Without a watermark the last fully elapsed hour is exported.
#[tokio::test]
async fn test_first_run_exports_previous_hour() {
    let ctx = ExportContext::new(rows());
    let now = ts("2023-01-01T13:47:12Z");

    let outcome = ctx.job.run(now).await.expect("job run");

    let window = Window::ending_at(ts("2023-01-01T13:00:00Z")).unwrap();
    match outcome {
        JobOutcome::Exported {
            window: exported,
            object,
            rows,
            ..
        } => {
            assert_eq!(exported, window);
            assert_eq!(object.as_ref(), "hourly/20230101130000.jsonl");
            assert_eq!(rows, 0);
        }
        other => panic!("expected an export, got {:?}", other),
    }

    assert_eq!(ctx.query.requested(), vec![window]);
    assert_eq!(ctx.exported("20230101130000.jsonl").await.as_deref(), Some(""));
    assert_eq!(
        ctx.current_watermark().await,
        Some(Watermark {
            range_start: ts("2023-01-01T12:00:00Z"),
            range_end: ts("2023-01-01T13:00:00Z"),
            execution_time: now,
        })
    );
}

/// A run before the next hour has elapsed touches nothing.
#[tokio::test]
async fn test_window_not_elapsed_is_a_no_op() {
    let ctx = ExportContext::new(rows());
    let seeded = fixtures::watermark_ending("2023-01-01T05:00:00Z");
    ctx.seed_watermark(seeded).await;

    let outcome = ctx.job.run(ts("2023-01-01T05:30:00Z")).await.expect("job run");

    assert_eq!(outcome, JobOutcome::NothingToDo);
    assert!(ctx.query.requested().is_empty(), "no query when nothing is due");
    assert_eq!(ctx.exported_count().await, 0);
    assert_eq!(ctx.current_watermark().await, Some(seeded));
}

/// The hour after the watermark is exported with exactly its rows.
#[tokio::test]
async fn test_exports_next_hour_after_watermark() {
    let ctx = ExportContext::new(rows());
    ctx.seed_watermark(fixtures::watermark_ending("2023-01-01T05:00:00Z"))
        .await;
    let now = ts("2023-01-01T06:05:00Z");

    let outcome = ctx.job.run(now).await.expect("job run");

    assert!(matches!(outcome, JobOutcome::Exported { rows: 2, .. }));

    let body = ctx
        .exported("20230101060000.jsonl")
        .await
        .expect("object exported");
    assert_eq!(
        body,
        "{\"timestamp\":\"2023-01-01T05:10:00Z\",\"temperature\":5.0}\n\
         {\"timestamp\":\"2023-01-01T05:50:00Z\",\"temperature\":5.5}\n"
    );

    let watermark = ctx.current_watermark().await.expect("watermark written");
    assert_eq!(watermark.range_start, ts("2023-01-01T05:00:00Z"));
    assert_eq!(watermark.range_end, ts("2023-01-01T06:00:00Z"));
    assert_eq!(watermark.execution_time, now);
}

/// Every line of an export is a standalone JSON object.
#[tokio::test]
async fn test_export_is_newline_delimited_json() {
    let ctx = ExportContext::new(rows());
    ctx.seed_watermark(fixtures::watermark_ending("2023-01-01T03:00:00Z"))
        .await;

    ctx.job.run(ts("2023-01-01T04:00:00Z")).await.expect("job run");

    let body = ctx
        .exported("20230101040000.jsonl")
        .await
        .expect("object exported");
    let lines: Vec<serde_json::Value> = body
        .lines()
        .map(|line| serde_json::from_str(line).expect("line is JSON"))
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["temperature"], 3.0);
    assert_eq!(lines[1]["temperature"], 3.5);
    assert!(lines.iter().all(|l| l.as_object().map(|o| o.len()) == Some(2)));
}

/// A failed query leaves no object and the watermark untouched.
#[tokio::test]
async fn test_query_failure_keeps_watermark() {
    let ctx = ExportContext::new(rows());
    let seeded = fixtures::watermark_ending("2023-01-01T05:00:00Z");
    ctx.seed_watermark(seeded).await;
    ctx.query.set_should_fail(true);

    let err = ctx.job.run(ts("2023-01-01T06:05:00Z")).await.unwrap_err();

    assert!(matches!(err, Error::Query(_)));
    assert_eq!(ctx.exported_count().await, 0);
    assert_eq!(ctx.current_watermark().await, Some(seeded));
}

/// A cursor that fails halfway leaves no partial object behind.
#[tokio::test]
async fn test_mid_stream_failure_uploads_nothing() {
    let ctx = ExportContext::new(rows());
    let seeded = fixtures::watermark_ending("2023-01-01T05:00:00Z");
    ctx.seed_watermark(seeded).await;
    ctx.query.set_fail_mid_stream(true);

    let err = ctx.job.run(ts("2023-01-01T06:05:00Z")).await.unwrap_err();

    assert!(matches!(err, Error::Query(_)));
    assert!(ctx.exported("20230101060000.jsonl").await.is_none());
    assert_eq!(ctx.current_watermark().await, Some(seeded));
}

/// An upload the store rejects is aborted and the watermark stays put.
#[tokio::test]
async fn test_upload_failure_keeps_watermark() {
    let (ctx, uploads) = ExportContext::with_failing_uploads(rows());
    let seeded = fixtures::watermark_ending("2023-01-01T05:00:00Z");
    ctx.seed_watermark(seeded).await;

    let err = ctx.job.run(ts("2023-01-01T06:05:00Z")).await.unwrap_err();

    assert!(matches!(err, Error::Upload(_)), "got {:?}", err);
    assert_eq!(uploads.aborted(), 1);
    assert_eq!(ctx.exported_count().await, 0);
    assert_eq!(ctx.current_watermark().await, Some(seeded));
    assert_eq!(ctx.query.requested().len(), 1);
}

/// The same window is retried after a failure.
#[tokio::test]
async fn test_failed_window_is_retried() {
    let ctx = ExportContext::new(rows());
    ctx.seed_watermark(fixtures::watermark_ending("2023-01-01T05:00:00Z"))
        .await;
    let now = ts("2023-01-01T06:05:00Z");

    ctx.query.set_should_fail(true);
    assert!(ctx.job.run(now).await.is_err());

    ctx.query.set_should_fail(false);
    ctx.job.run(now).await.expect("retry");

    let requested = ctx.query.requested();
    assert_eq!(requested.len(), 2);
    assert_eq!(requested[0], requested[1]);
    assert!(ctx.exported("20230101060000.jsonl").await.is_some());
}

/// A job that fell behind catches up one hour per run.
#[tokio::test]
async fn test_successive_runs_advance_one_hour() {
    let ctx = ExportContext::new(rows());
    ctx.seed_watermark(fixtures::watermark_ending("2023-01-01T03:00:00Z"))
        .await;
    let now = ts("2023-01-01T06:30:00Z");

    for expected_end in ["04", "05", "06"] {
        let outcome = ctx.job.run(now).await.expect("job run");
        let end = ts(&format!("2023-01-01T{}:00:00Z", expected_end));

        match outcome {
            JobOutcome::Exported { window, rows, .. } => {
                assert_eq!(window.end(), end);
                assert_eq!(rows, 2);
            }
            other => panic!("expected an export, got {:?}", other),
        }
        assert_eq!(ctx.current_watermark().await.map(|w| w.range_end), Some(end));
    }

    assert_eq!(ctx.job.run(now).await.expect("job run"), JobOutcome::NothingToDo);
    assert_eq!(ctx.exported_count().await, 3);
    assert_eq!(ctx.query.requested().len(), 3);
}

/// With conditional writes, a watermark changed mid-run is not clobbered.
#[tokio::test]
async fn test_concurrent_watermark_write_is_a_conflict() {
    let ctx = ExportContext::with_compare_and_swap(rows());
    ctx.seed_watermark(fixtures::watermark_ending("2023-01-01T05:00:00Z"))
        .await;

    let theirs = fixtures::watermark_ending("2023-01-01T06:00:00Z");
    ctx.query
        .interleave_watermark(ctx.watermarks.clone() as Arc<dyn WatermarkStore>, theirs);

    let err = ctx.job.run(ts("2023-01-01T06:05:00Z")).await.unwrap_err();

    assert!(matches!(err, Error::WatermarkConflict(_)));
    assert_eq!(ctx.current_watermark().await, Some(theirs));
}

/// Without conditional writes the last writer wins.
#[tokio::test]
async fn test_unconditional_watermark_write_overwrites() {
    let ctx = ExportContext::new(rows());
    ctx.seed_watermark(fixtures::watermark_ending("2023-01-01T05:00:00Z"))
        .await;

    let theirs = fixtures::watermark_ending("2023-01-01T06:00:00Z");
    ctx.query
        .interleave_watermark(ctx.watermarks.clone() as Arc<dyn WatermarkStore>, theirs);

    let now = ts("2023-01-01T06:05:00Z");
    ctx.job.run(now).await.expect("job run");

    let watermark = ctx.current_watermark().await.expect("watermark");
    assert_eq!(watermark.range_end, ts("2023-01-01T06:00:00Z"));
    assert_eq!(watermark.execution_time, now);
}

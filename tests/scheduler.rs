//! End-to-end scheduler behavior on tokio's paused test clock.
//!
//! Works are deterministic fakes; cadences use the `@every` dialect so fire
//! times depend only on virtual time, never on the host's wall clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time;
use tokio_util::sync::CancellationToken;

use stagehand::{
    ConfigPatch, PipelineWorks, RunOutcome, Scheduler, SchedulerConfig, SchedulerError,
    StageError, StageHealth, StageName, WorkFn, WorkRef,
};

fn ok_work() -> WorkRef {
    WorkFn::arc("ok", |_ctx: CancellationToken| async move {
        Ok::<_, StageError>(Vec::new())
    })
}

fn failing_work(reason: &'static str) -> WorkRef {
    WorkFn::arc("failing", move |_ctx: CancellationToken| async move {
        Err::<Vec<String>, _>(StageError::failed(reason))
    })
}

fn counting_work(counter: Arc<AtomicU32>) -> WorkRef {
    WorkFn::arc("counting", move |_ctx: CancellationToken| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, StageError>(Vec::new())
        }
    })
}

fn slow_work(duration: Duration) -> WorkRef {
    WorkFn::arc("slow", move |_ctx: CancellationToken| async move {
        time::sleep(duration).await;
        Ok::<_, StageError>(Vec::new())
    })
}

fn works_with(stage: StageName, work: WorkRef) -> PipelineWorks {
    let mut works = PipelineWorks {
        video_collection: ok_work(),
        data_processing: ok_work(),
        recommendation: ok_work(),
        cleanup: ok_work(),
    };
    match stage {
        StageName::VideoCollection => works.video_collection = work,
        StageName::DataProcessing => works.data_processing = work,
        StageName::Recommendation => works.recommendation = work,
        StageName::Cleanup => works.cleanup = work,
    }
    works
}

/// Lets spawned trigger loops and run tasks make progress without
/// advancing virtual time.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn count(scheduler: &Scheduler, stage: StageName, outcome: RunOutcome) -> usize {
    scheduler
        .stats(usize::MAX)
        .records
        .iter()
        .filter(|r| r.stage == stage && r.outcome == outcome)
        .count()
}

#[tokio::test(start_paused = true)]
async fn one_fire_after_thirty_one_minutes() {
    let counter = Arc::new(AtomicU32::new(0));
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .with_cadence(StageName::VideoCollection, "@every 30m")
        .with_cadence(StageName::DataProcessing, "@every 6h")
        .with_cadence(StageName::Recommendation, "@every 6h")
        .with_cadence(StageName::Cleanup, "@every 1d")
        .build(works_with(
            StageName::VideoCollection,
            counting_work(Arc::clone(&counter)),
        ))
        .unwrap();

    scheduler.start();
    settle().await;

    time::advance(Duration::from_secs(31 * 60)).await;
    settle().await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(count(&scheduler, StageName::VideoCollection, RunOutcome::Success), 1);
    assert_eq!(count(&scheduler, StageName::Cleanup, RunOutcome::Success), 0);
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn second_trigger_skips_while_first_is_in_flight() {
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .build(works_with(
            StageName::DataProcessing,
            slow_work(Duration::from_secs(5)),
        ))
        .unwrap();

    let background = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.trigger_now(Some(StageName::DataProcessing)).await })
    };
    // Let the first trigger claim the overlap guard and park in its work.
    settle().await;
    assert_eq!(scheduler.status().active_runs, vec![StageName::DataProcessing]);

    // Second trigger returns a skipped-overlap record without running work.
    let records = scheduler.trigger_now(Some(StageName::DataProcessing)).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, RunOutcome::SkippedOverlap);
    assert_eq!(records[0].duration_ms, 0);

    // The first run drains to success once its sleep elapses.
    let first = background.await.unwrap();
    assert_eq!(first[0].outcome, RunOutcome::Success);
    assert!(scheduler.status().active_runs.is_empty());
    // Поток guard-а освобождён: третий trigger выполняется.
    let third = scheduler.trigger_now(Some(StageName::DataProcessing)).await;
    assert_eq!(third[0].outcome, RunOutcome::Success);
}

#[tokio::test(start_paused = true)]
async fn failing_stage_never_blocks_the_others() {
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .with_cadence(StageName::VideoCollection, "@every 10m")
        .with_cadence(StageName::DataProcessing, "@every 10m")
        .with_cadence(StageName::Recommendation, "@every 6h")
        .with_cadence(StageName::Cleanup, "@every 6h")
        .build(works_with(
            StageName::VideoCollection,
            failing_work("collector exploded"),
        ))
        .unwrap();

    scheduler.start();
    settle().await;

    for _ in 0..5 {
        time::advance(Duration::from_secs(10 * 60 + 1)).await;
        settle().await;
    }

    assert_eq!(count(&scheduler, StageName::VideoCollection, RunOutcome::Failure), 5);
    assert_eq!(count(&scheduler, StageName::DataProcessing, RunOutcome::Success), 5);

    let health = scheduler.health();
    assert_eq!(
        health.stage(StageName::VideoCollection).unwrap().health,
        StageHealth::Failing
    );
    assert_eq!(
        health.stage(StageName::DataProcessing).unwrap().health,
        StageHealth::Healthy
    );
    // The read path keeps answering while a stage is failing.
    assert!(scheduler.status().running);
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn lifecycle_is_idempotent() {
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .build(works_with(StageName::Cleanup, ok_work()))
        .unwrap();

    assert!(!scheduler.status().running);
    scheduler.start();
    scheduler.start();
    assert!(scheduler.status().running);

    scheduler.stop();
    scheduler.stop();
    assert!(!scheduler.status().running);

    scheduler.restart().await;
    assert!(scheduler.status().running);
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn history_is_bounded_fifo() {
    let cfg = SchedulerConfig {
        retention: 5,
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::builder(cfg)
        .build(works_with(StageName::Cleanup, ok_work()))
        .unwrap();

    for _ in 0..8 {
        scheduler.trigger_now(Some(StageName::Cleanup)).await;
    }

    let stats = scheduler.stats(usize::MAX);
    assert_eq!(stats.summary.total_runs, 5);
    assert_eq!(count(&scheduler, StageName::Cleanup, RunOutcome::Success), 5);

    // Newest-first, and the retained five are the most recent five.
    let seqs: Vec<u64> = stats.records.iter().map(|r| r.seq).collect();
    let mut sorted = seqs.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(seqs, sorted);
}

#[tokio::test(start_paused = true)]
async fn unknown_config_keys_reject_the_whole_patch() {
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .build(works_with(StageName::Cleanup, ok_work()))
        .unwrap();
    let before = scheduler.status();

    let err = scheduler.reconfigure_json(&json!({ "foo": 1 })).unwrap_err();
    assert_eq!(
        err,
        SchedulerError::UnknownConfigKeys {
            keys: vec!["foo".to_string()]
        }
    );

    // One valid + one invalid key: nothing is applied.
    let err = scheduler
        .reconfigure_json(&json!({
            "cleanup": { "enabled": false },
            "foo": { "enabled": true },
        }))
        .unwrap_err();
    assert!(matches!(err, SchedulerError::UnknownConfigKeys { .. }));

    let after = scheduler.status();
    for (b, a) in before.stages.iter().zip(after.stages.iter()) {
        assert_eq!(b.cadence, a.cadence);
        assert_eq!(b.enabled, a.enabled);
    }
}

#[tokio::test(start_paused = true)]
async fn reconfigure_applies_cadence_and_global_flag() {
    let counter = Arc::new(AtomicU32::new(0));
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .with_cadence(StageName::VideoCollection, "@every 6h")
        .with_cadence(StageName::DataProcessing, "@every 6h")
        .with_cadence(StageName::Recommendation, "@every 6h")
        .with_cadence(StageName::Cleanup, "@every 6h")
        .build(works_with(
            StageName::VideoCollection,
            counting_work(Arc::clone(&counter)),
        ))
        .unwrap();

    scheduler.start();
    settle().await;

    // Tighten one cadence while running; the stage re-arms on the new one.
    scheduler
        .reconfigure(ConfigPatch::new().with_cadence(StageName::VideoCollection, "@every 5m"))
        .unwrap();
    settle().await;
    time::advance(Duration::from_secs(5 * 60 + 1)).await;
    settle().await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let status = scheduler.status();
    let video = &status.stages[0];
    assert_eq!(video.cadence, "@every 5m");

    // An unparsable cadence is rejected synchronously, nothing changes.
    let err = scheduler
        .reconfigure(ConfigPatch::new().with_cadence(StageName::VideoCollection, "61 * * * *"))
        .unwrap_err();
    assert_eq!(err.as_label(), "invalid_cadence");
    assert_eq!(scheduler.status().stages[0].cadence, "@every 5m");

    // Global enabled=false maps to stop.
    scheduler
        .reconfigure_json(&json!({ "enabled": false }))
        .unwrap();
    assert!(!scheduler.status().running);
}

#[tokio::test(start_paused = true)]
async fn disabled_stage_ignores_fires_but_not_manual_triggers() {
    let counter = Arc::new(AtomicU32::new(0));
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .with_cadence(StageName::Recommendation, "@every 10m")
        .with_cadence(StageName::VideoCollection, "@every 6h")
        .with_cadence(StageName::DataProcessing, "@every 6h")
        .with_cadence(StageName::Cleanup, "@every 6h")
        .with_disabled(StageName::Recommendation)
        .build(works_with(
            StageName::Recommendation,
            counting_work(Arc::clone(&counter)),
        ))
        .unwrap();

    scheduler.start();
    settle().await;
    time::advance(Duration::from_secs(21 * 60)).await;
    settle().await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    let health = scheduler.health();
    assert_eq!(
        health.stage(StageName::Recommendation).unwrap().health,
        StageHealth::Disabled
    );

    // Manual trigger is operator intent and still runs.
    let records = scheduler.trigger_now(Some(StageName::Recommendation)).await;
    assert_eq!(records[0].outcome, RunOutcome::Success);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn trigger_all_runs_every_stage_in_pipeline_order() {
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .build(works_with(StageName::Cleanup, ok_work()))
        .unwrap();

    let records = scheduler.trigger_now(None).await;
    let stages: Vec<StageName> = records.iter().map(|r| r.stage).collect();
    assert_eq!(stages, StageName::ALL.to_vec());
    assert!(records.iter().all(|r| r.outcome == RunOutcome::Success));
}

#[tokio::test(start_paused = true)]
async fn timed_out_work_records_a_failure() {
    let canceled = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let work: WorkRef = WorkFn::arc("hung", {
        let canceled = Arc::clone(&canceled);
        move |ctx: CancellationToken| {
            let canceled = Arc::clone(&canceled);
            async move {
                tokio::spawn(async move {
                    ctx.cancelled().await;
                    canceled.store(true, Ordering::SeqCst);
                });
                time::sleep(Duration::from_secs(60)).await;
                Ok::<_, StageError>(Vec::new())
            }
        }
    });
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .with_timeout(StageName::DataProcessing, Duration::from_secs(1))
        .build(works_with(StageName::DataProcessing, work))
        .unwrap();

    let records = scheduler.trigger_now(Some(StageName::DataProcessing)).await;
    assert_eq!(records[0].outcome, RunOutcome::Failure);
    assert!(records[0].error_messages[0].contains("timed out"));
    // Guard released: the stage can run again.
    assert!(scheduler.status().active_runs.is_empty());
    // The run's token was cancelled when the timeout fired.
    settle().await;
    assert!(canceled.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn stop_lets_in_flight_runs_finish_and_record() {
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .with_cadence(StageName::Cleanup, "@every 10m")
        .with_cadence(StageName::VideoCollection, "@every 6h")
        .with_cadence(StageName::DataProcessing, "@every 6h")
        .with_cadence(StageName::Recommendation, "@every 6h")
        .build(works_with(StageName::Cleanup, slow_work(Duration::from_secs(30))))
        .unwrap();

    scheduler.start();
    settle().await;
    time::advance(Duration::from_secs(10 * 60 + 1)).await;
    settle().await;
    assert_eq!(scheduler.status().active_runs, vec![StageName::Cleanup]);

    scheduler.stop();
    // No new dispatches, but the in-flight run drains and records.
    time::advance(Duration::from_secs(30)).await;
    settle().await;
    assert!(scheduler.status().active_runs.is_empty());
    assert_eq!(count(&scheduler, StageName::Cleanup, RunOutcome::Success), 1);

    time::advance(Duration::from_secs(60 * 60)).await;
    settle().await;
    assert_eq!(count(&scheduler, StageName::Cleanup, RunOutcome::Success), 1);
}

// tests/runtime_scenarios.rs

mod common;
use crate::common::builders::DocumentBuilder;
use crate::common::fake_executor::{Reply, ScriptedExecutor};
use crate::common::{
    drain, harness, init_tracing, last_best_guess, last_status, settings, with_timeout, Harness,
};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use barliman::engine::{RuntimeEvent, SlotStatus};
use barliman::types::{QueryKind, SlotIndex, TaskStatus};
use barliman_test_utils::fake_executor::ExecutionLog;

fn slot(i: usize) -> QueryKind {
    QueryKind::PerTest(SlotIndex::new(i).unwrap())
}

/// Build a harness whose executor is configured by `configure`; returns the
/// executor's log too.
fn scripted(
    timeout: Duration,
    configure: impl FnOnce(ScriptedExecutor) -> ScriptedExecutor,
) -> (Harness<ScriptedExecutor>, Arc<Mutex<ExecutionLog>>) {
    let mut log = None;
    let h = harness(settings(timeout), |tx| {
        let executor = configure(ScriptedExecutor::new(tx));
        log = Some(executor.log());
        executor
    });
    (h, log.expect("executor constructed"))
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_starts_one_cycle_with_the_final_content() {
    init_tracing();
    let (h, log) = scripted(Duration::from_secs(30), |e| {
        e.reply(QueryKind::AllTests, Reply::ok("fail", Duration::from_millis(100)))
    });
    let Harness { runtime, doc_tx, .. } = h;

    // Five edits, 200ms apart: all inside one 750ms window.
    tokio::spawn(async move {
        for i in 0..5 {
            let doc = DocumentBuilder::new(&format!("(define f{i} ,A)"))
                .test(0, "(f 1)", "1")
                .build();
            doc_tx.send(doc).unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });

    with_timeout(runtime.run()).await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(
        log.spawned_kinds(),
        vec![QueryKind::Simple, slot(0), QueryKind::AllTests]
    );
    assert!(log.spawned.iter().all(|q| q.task.generation == 5));
    assert!(log.spawned[0].script.contains("(define f4 ,A)"));
    assert!(log.cancelled.is_empty());
}

#[tokio::test(start_paused = true)]
async fn scenario_a_holes_are_filled_and_example_checks_out() {
    init_tracing();
    let (h, _log) = scripted(Duration::from_secs(30), |e| {
        e.reply(QueryKind::Simple, Reply::ok("((f (lambda (x) x)))", Duration::from_millis(50)))
            .reply(slot(0), Reply::ok("((f (lambda (l s) s)))", Duration::from_millis(100)))
            .reply(
                QueryKind::AllTests,
                Reply::ok("(define f (lambda (l s) s))", Duration::from_millis(500)),
            )
    });
    let Harness {
        runtime,
        doc_tx,
        mut ui_rx,
        ..
    } = h;

    doc_tx
        .send(
            DocumentBuilder::new("(define ,A (lambda ,B ,C))")
                .test(0, "(f '() '5)", "5")
                .build(),
        )
        .unwrap();
    with_timeout(runtime.run()).await.unwrap();

    let events = drain(&mut ui_rx);
    assert_eq!(
        last_status(&events, QueryKind::Simple),
        Some(SlotStatus::Done(TaskStatus::Success))
    );
    assert_eq!(
        last_status(&events, slot(0)),
        Some(SlotStatus::Done(TaskStatus::Success))
    );
    assert_eq!(last_status(&events, slot(1)), Some(SlotStatus::Idle));
    assert_eq!(
        last_best_guess(&events),
        Some(Some("(define f (lambda (l s) s))".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn scenario_b_unbalanced_definition_cancels_the_rest() {
    init_tracing();
    let (h, log) = scripted(Duration::from_secs(30), |e| {
        e.reply(QueryKind::Simple, Reply::ok("illegal-sexp-in-defn", Duration::from_millis(50)))
            .default_reply(Reply::Hang)
    });
    let Harness {
        runtime,
        doc_tx,
        mut ui_rx,
        ..
    } = h;

    let mut doc = DocumentBuilder::new("(define f (lambda (x) x)");
    for i in 0..6 {
        doc = doc.test(i, &format!("(f {i})"), &format!("{i}"));
    }
    doc_tx.send(doc.build()).unwrap();
    with_timeout(runtime.run()).await.unwrap();

    let events = drain(&mut ui_rx);
    assert_eq!(
        last_status(&events, QueryKind::Simple),
        Some(SlotStatus::Done(TaskStatus::SyntaxError))
    );
    for i in 0..6 {
        assert_eq!(last_status(&events, slot(i)), Some(SlotStatus::Cancelled));
    }
    assert_eq!(last_status(&events, QueryKind::AllTests), Some(SlotStatus::Cancelled));

    let log = log.lock().unwrap();
    assert_eq!(log.cancelled.len(), 7);
    assert_eq!(log.running_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_inconsistent_examples_fail_together_but_pass_alone() {
    init_tracing();
    let (h, log) = scripted(Duration::from_secs(30), |e| {
        e.reply(QueryKind::AllTests, Reply::ok("fail", Duration::from_millis(300)))
            .default_reply(Reply::ok("(((lambda (x) x)))", Duration::from_millis(100)))
    });
    let Harness {
        runtime,
        doc_tx,
        mut ui_rx,
        ..
    } = h;

    doc_tx
        .send(
            DocumentBuilder::new("(define f (lambda (x) ,A))")
                .test(0, "(f 1)", "1")
                .test(1, "(f 1)", "2")
                .build(),
        )
        .unwrap();
    with_timeout(runtime.run()).await.unwrap();

    let events = drain(&mut ui_rx);
    assert_eq!(
        last_status(&events, QueryKind::AllTests),
        Some(SlotStatus::Done(TaskStatus::Failed))
    );
    assert_eq!(last_status(&events, slot(0)), Some(SlotStatus::Done(TaskStatus::Success)));
    assert_eq!(last_status(&events, slot(1)), Some(SlotStatus::Done(TaskStatus::Success)));
    assert_eq!(last_best_guess(&events), Some(None));
    assert!(log.lock().unwrap().cancelled.is_empty());
}

#[tokio::test(start_paused = true)]
async fn edit_during_a_cycle_cancels_it_before_the_next_starts() {
    init_tracing();
    // A failed synthesis cancels nothing, so every cancel below is staleness.
    let (h, log) = scripted(Duration::from_secs(30), |e| {
        e.reply(QueryKind::AllTests, Reply::ok("fail", Duration::from_secs(2)))
            .default_reply(Reply::ok("(ok)", Duration::from_secs(2)))
    });
    let Harness { runtime, doc_tx, .. } = h;

    tokio::spawn(async move {
        let first = DocumentBuilder::new("(define f ,A)").test(0, "(f)", "1").build();
        doc_tx.send(first).unwrap();
        // First cycle starts at 750ms; edit while it runs.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let second = DocumentBuilder::new("(define f ,B)").test(0, "(f)", "1").build();
        doc_tx.send(second).unwrap();
    });

    with_timeout(runtime.run()).await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.overlaps, 0);
    assert_eq!(log.spawned.len(), 6);
    assert_eq!(log.cancelled.len(), 3);
    assert!(log.cancelled.iter().all(|t| t.generation == 1));
    assert!(log.spawned[3..].iter().all(|q| q.task.generation == 2));
}

#[tokio::test(start_paused = true)]
async fn hung_task_times_out_distinctly() {
    init_tracing();
    let (h, log) = scripted(Duration::from_secs(2), |e| {
        e.reply(QueryKind::AllTests, Reply::Hang)
            .default_reply(Reply::ok("(ok)", Duration::from_millis(100)))
    });
    let Harness {
        runtime,
        doc_tx,
        mut ui_rx,
        ..
    } = h;

    doc_tx
        .send(DocumentBuilder::new("(define f ,A)").test(0, "(f)", "1").build())
        .unwrap();
    with_timeout(runtime.run()).await.unwrap();

    let events = drain(&mut ui_rx);
    assert_eq!(last_status(&events, QueryKind::AllTests), Some(SlotStatus::TimedOut));
    assert_eq!(
        last_status(&events, QueryKind::Simple),
        Some(SlotStatus::Done(TaskStatus::Success))
    );
    let log = log.lock().unwrap();
    assert_eq!(log.cancelled.len(), 1);
    assert_eq!(log.cancelled[0].kind, QueryKind::AllTests);
}

#[tokio::test(start_paused = true)]
async fn spawn_failure_marks_the_slot() {
    init_tracing();
    let (h, _log) = scripted(Duration::from_secs(30), |e| {
        e.reply(QueryKind::Simple, Reply::SpawnFails("permission denied".to_string()))
    });
    let Harness {
        runtime,
        doc_tx,
        mut ui_rx,
        ..
    } = h;

    doc_tx.send(DocumentBuilder::new("(define f ,A)").build()).unwrap();
    with_timeout(runtime.run()).await.unwrap();

    let events = drain(&mut ui_rx);
    assert_eq!(last_status(&events, QueryKind::Simple), Some(SlotStatus::SpawnFailed));
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_everything_running() {
    init_tracing();
    let (h, log) = scripted(Duration::from_secs(30), |e| e.default_reply(Reply::Hang));
    let Harness {
        runtime,
        doc_tx,
        event_tx,
        ..
    } = h;

    doc_tx
        .send(DocumentBuilder::new("(define f ,A)").test(2, "(f)", "1").build())
        .unwrap();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        event_tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    });

    with_timeout(runtime.run()).await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.spawned.len(), 3);
    assert_eq!(log.cancelled.len(), 3);
    assert_eq!(log.running_count(), 0);
}

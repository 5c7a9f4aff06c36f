#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::mpsc;

use barliman::document::DocumentSnapshot;
use barliman::engine::{
    CoreRuntime, OrchestratorSettings, Runtime, RuntimeEvent, RuntimeOptions, SlotStatus,
    StatusUpdate, UiEvent,
};
use barliman::exec::ExecutorBackend;
use barliman::types::QueryKind;
use barliman_test_utils::builders::stub_query_builder;

pub use barliman_test_utils::builders;
pub use barliman_test_utils::fake_executor;
pub use barliman_test_utils::{init_tracing, with_timeout};

pub const DEBOUNCE: Duration = Duration::from_millis(750);

/// Channels and runtime, ready to run.
pub struct Harness<E: ExecutorBackend> {
    pub runtime: Runtime<E>,
    pub event_tx: mpsc::Sender<RuntimeEvent>,
    pub doc_tx: mpsc::UnboundedSender<DocumentSnapshot>,
    pub ui_rx: mpsc::UnboundedReceiver<UiEvent>,
}

/// Build a runtime around `make_executor`, with `--once` semantics.
pub fn harness<E, F>(settings: OrchestratorSettings, make_executor: F) -> Harness<E>
where
    E: ExecutorBackend,
    F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
{
    let (event_tx, event_rx) = mpsc::channel(64);
    let (doc_tx, doc_rx) = mpsc::unbounded_channel();
    let (ui_tx, ui_rx) = mpsc::unbounded_channel();

    let executor = make_executor(event_tx.clone());
    let core = CoreRuntime::new(
        stub_query_builder(),
        settings,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let runtime = Runtime::new(core, event_tx.clone(), event_rx, doc_rx, ui_tx, executor);

    Harness {
        runtime,
        event_tx,
        doc_tx,
        ui_rx,
    }
}

pub fn settings(timeout: Duration) -> OrchestratorSettings {
    OrchestratorSettings {
        debounce: DEBOUNCE,
        task_timeout: timeout,
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

/// Last status published for `kind`.
pub fn last_status(events: &[UiEvent], kind: QueryKind) -> Option<SlotStatus> {
    events.iter().rev().find_map(|e| match e {
        UiEvent::Status(StatusUpdate { kind: k, status, .. }) if *k == kind => Some(*status),
        _ => None,
    })
}

pub fn last_best_guess(events: &[UiEvent]) -> Option<Option<String>> {
    events.iter().rev().find_map(|e| match e {
        UiEvent::BestGuess { text, .. } => Some(text.clone()),
        _ => None,
    })
}

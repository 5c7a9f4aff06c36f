// src/document/mod.rs

//! The document being edited: one definition plus six example slots.
//!
//! - [`Document`] is the mutable model owned by the front end. Each mutator
//!   is a no-op when the new value equals the old one; otherwise it publishes
//!   a fresh [`DocumentSnapshot`] to every listener.
//! - [`DocumentSnapshot`] is the immutable, cheaply clonable view the
//!   orchestrator and the query builder read.

pub mod holes;

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::types::{SlotIndex, TEST_SLOT_COUNT};

/// One (input, expected-output) example pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSlot {
    pub input: String,
    pub expected: String,
}

impl TestSlot {
    pub fn new(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
        }
    }

    /// A slot is complete when both fields are non-blank.
    pub fn is_complete(&self) -> bool {
        !self.input.trim().is_empty() && !self.expected.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DocumentData {
    definition_text: String,
    tests: [TestSlot; TEST_SLOT_COUNT],
}

/// Immutable view of a document at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSnapshot {
    inner: Arc<DocumentData>,
}

impl DocumentSnapshot {
    pub fn new(definition_text: impl Into<String>, tests: [TestSlot; TEST_SLOT_COUNT]) -> Self {
        Self {
            inner: Arc::new(DocumentData {
                definition_text: definition_text.into(),
                tests,
            }),
        }
    }

    pub fn definition_text(&self) -> &str {
        &self.inner.definition_text
    }

    pub fn tests(&self) -> &[TestSlot; TEST_SLOT_COUNT] {
        &self.inner.tests
    }

    pub fn test(&self, slot: SlotIndex) -> &TestSlot {
        &self.inner.tests[slot.get()]
    }

    pub fn is_complete(&self, slot: SlotIndex) -> bool {
        self.test(slot).is_complete()
    }

    /// Slots whose input and expected output are both filled in, in order.
    pub fn complete_slots(&self) -> Vec<SlotIndex> {
        SlotIndex::all().filter(|s| self.is_complete(*s)).collect()
    }

    pub fn has_complete_slot(&self) -> bool {
        SlotIndex::all().any(|s| self.is_complete(s))
    }

    /// Distinct hole letters used in the definition.
    pub fn hole_markers(&self) -> BTreeSet<char> {
        holes::hole_markers(self.definition_text())
    }
}

/// Listener channel receiving one snapshot per effective mutation.
pub type ChangeSender = mpsc::UnboundedSender<DocumentSnapshot>;

/// Mutable document model.
///
/// No validation happens here; whether the text is a usable program is the
/// interpreter's call, via the `Simple` query.
#[derive(Debug, Default)]
pub struct Document {
    data: DocumentData,
    listeners: Vec<ChangeSender>,
}

impl Document {
    pub fn new(snapshot: &DocumentSnapshot) -> Self {
        Self {
            data: (*snapshot.inner).clone(),
            listeners: Vec::new(),
        }
    }

    /// Register a listener. It receives every later effective change.
    pub fn subscribe(&mut self, tx: ChangeSender) {
        self.listeners.push(tx);
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            inner: Arc::new(self.data.clone()),
        }
    }

    /// Send the current state to every listener without mutating anything.
    ///
    /// Used once at startup so the first query cycle sees the seed document.
    pub fn publish_current(&mut self) {
        self.notify();
    }

    pub fn set_definition_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.data.definition_text == text {
            return false;
        }
        self.data.definition_text = text;
        debug!("definition text changed");
        self.notify();
        true
    }

    pub fn set_test_input(&mut self, slot: SlotIndex, text: impl Into<String>) -> bool {
        let text = text.into();
        let target = &mut self.data.tests[slot.get()].input;
        if *target == text {
            return false;
        }
        *target = text;
        debug!(slot = %slot, "test input changed");
        self.notify();
        true
    }

    pub fn set_test_expected(&mut self, slot: SlotIndex, text: impl Into<String>) -> bool {
        let text = text.into();
        let target = &mut self.data.tests[slot.get()].expected;
        if *target == text {
            return false;
        }
        *target = text;
        debug!(slot = %slot, "test expected output changed");
        self.notify();
        true
    }

    /// Bring the whole document in line with `target`, field by field.
    ///
    /// Every field goes through its mutator, so unchanged fields stay silent.
    /// Returns the number of fields that actually changed.
    pub fn apply(&mut self, target: &DocumentSnapshot) -> usize {
        let mut changed = 0;
        if self.set_definition_text(target.definition_text()) {
            changed += 1;
        }
        for slot in SlotIndex::all() {
            let wanted = target.test(slot);
            if self.set_test_input(slot, wanted.input.clone()) {
                changed += 1;
            }
            if self.set_test_expected(slot, wanted.expected.clone()) {
                changed += 1;
            }
        }
        changed
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.listeners.retain(|tx| {
            let alive = tx.send(snapshot.clone()).is_ok();
            if !alive {
                warn!("document listener dropped; unsubscribing");
            }
            alive
        });
    }
}

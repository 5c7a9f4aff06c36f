// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::document::{DocumentSnapshot, TestSlot};
use crate::types::{SlotIndex, TEST_SLOT_COUNT};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// debounce_ms = 750
/// task_timeout_ms = 30000
///
/// [interpreter]
/// candidates = ["scheme", "chez"]
/// mk_vicare = "mk/mk-vicare.scm"
/// mk = "mk/mk.scm"
/// interp = "mk/interp.scm"
///
/// [document]
/// definition = "(define ,A (lambda ,B ,C))"
///
/// [[document.test]]
/// input = "(append '() '5)"
/// expected = "5"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub interpreter: InterpreterSection,

    #[serde(default)]
    pub document: DocumentSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub interpreter: InterpreterSection,
    pub document: DocumentSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        interpreter: InterpreterSection,
        document: DocumentSection,
    ) -> Self {
        Self {
            config,
            interpreter,
            document,
        }
    }
}

/// `[config]` section: orchestrator timing and scratch location.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Quiet period after the last edit before a query cycle starts.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Per-task wall clock limit.
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,

    /// Where the per-kind query scripts are written.
    ///
    /// If `None`, `<system temp>/barliman` is used.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

fn default_debounce_ms() -> u64 {
    750
}

fn default_task_timeout_ms() -> u64 {
    30_000
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            task_timeout_ms: default_task_timeout_ms(),
            scratch_dir: None,
        }
    }
}

impl ConfigSection {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn effective_scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("barliman"))
    }
}

/// `[interpreter]` section: which binary to run and what to load into it.
#[derive(Debug, Clone, Deserialize)]
pub struct InterpreterSection {
    /// Explicit interpreter binary. Skips probing when set.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Binary names probed on `PATH`, in order.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,

    /// First library loaded by every query.
    #[serde(default = "default_mk_vicare")]
    pub mk_vicare: PathBuf,

    /// Second library loaded by every query.
    #[serde(default = "default_mk")]
    pub mk: PathBuf,

    /// Relational interpreter program, inlined into every query.
    #[serde(default = "default_interp")]
    pub interp: PathBuf,
}

fn default_candidates() -> Vec<String> {
    ["scheme", "chez", "chezscheme", "petite"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_mk_vicare() -> PathBuf {
    PathBuf::from("mk/mk-vicare.scm")
}

fn default_mk() -> PathBuf {
    PathBuf::from("mk/mk.scm")
}

fn default_interp() -> PathBuf {
    PathBuf::from("mk/interp.scm")
}

impl Default for InterpreterSection {
    fn default() -> Self {
        Self {
            path: None,
            candidates: default_candidates(),
            mk_vicare: default_mk_vicare(),
            mk: default_mk(),
            interp: default_interp(),
        }
    }
}

/// `[document]` section: the seed document.
///
/// Read-only input; nothing ever writes it back.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DocumentSection {
    #[serde(default)]
    pub definition: String,

    /// Up to six examples, filling slots in order.
    #[serde(default)]
    pub test: Vec<TestEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
pub struct TestEntry {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected: String,
}

impl TestEntry {
    pub fn new(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
        }
    }
}

impl Default for DocumentSection {
    /// The `append` skeleton with three examples.
    fn default() -> Self {
        Self {
            definition: "(define ,A\n  (lambda ,B\n    ,C))".to_string(),
            test: vec![
                TestEntry::new("(append '() '5)", "5"),
                TestEntry::new("(append '(a) '6)", "'(a . 6)"),
                TestEntry::new("(append '(e f) '(g h))", "'(e f g h)"),
            ],
        }
    }
}

impl DocumentSection {
    /// Convert to a snapshot. Entries beyond the slot count are ignored;
    /// validation rejects them before this is reached.
    pub fn to_snapshot(&self) -> DocumentSnapshot {
        let mut tests: [TestSlot; TEST_SLOT_COUNT] = Default::default();
        for (slot, entry) in SlotIndex::all().zip(self.test.iter()) {
            tests[slot.get()] = TestSlot::new(entry.input.clone(), entry.expected.clone());
        }
        DocumentSnapshot::new(self.definition.clone(), tests)
    }
}

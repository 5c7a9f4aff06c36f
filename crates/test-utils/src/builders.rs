#![allow(dead_code)]

use std::path::PathBuf;

use barliman::config::{ConfigFile, DocumentSection, RawConfigFile, TestEntry};
use barliman::document::{DocumentSnapshot, TestSlot};
use barliman::query::{Preamble, QueryBuilder};
use barliman::types::TEST_SLOT_COUNT;

/// Builder for `DocumentSnapshot`.
pub struct DocumentBuilder {
    definition: String,
    tests: [TestSlot; TEST_SLOT_COUNT],
}

impl DocumentBuilder {
    pub fn new(definition: &str) -> Self {
        Self {
            definition: definition.to_string(),
            tests: Default::default(),
        }
    }

    /// Fill slot `index` (zero-based).
    pub fn test(mut self, index: usize, input: &str, expected: &str) -> Self {
        self.tests[index] = TestSlot::new(input, expected);
        self
    }

    pub fn build(self) -> DocumentSnapshot {
        DocumentSnapshot::new(self.definition, self.tests)
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn with_task_timeout_ms(mut self, ms: u64) -> Self {
        self.config.config.task_timeout_ms = ms;
        self
    }

    pub fn with_interpreter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.interpreter.path = Some(path.into());
        self
    }

    pub fn with_definition(mut self, definition: &str) -> Self {
        self.config.document.definition = definition.to_string();
        self
    }

    pub fn with_test(mut self, input: &str, expected: &str) -> Self {
        self.config.document.test.push(TestEntry::new(input, expected));
        self
    }

    pub fn without_tests(mut self) -> Self {
        self.config.document = DocumentSection {
            definition: self.config.document.definition,
            test: Vec::new(),
        };
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Query builder over a stub preamble; scripts are never run in tests.
pub fn stub_query_builder() -> QueryBuilder {
    QueryBuilder::new(&Preamble::new(
        "/stub/mk-vicare.scm",
        "/stub/mk.scm",
        ";; stub interpreter",
    ))
}

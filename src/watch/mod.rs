// src/watch/mod.rs

//! Config-file watching.
//!
//! The headless front end's "editor" is the `[document]` section of the
//! config file: saving it is an edit. This module wires up a cross-platform
//! watcher (`notify`) and turns saves into `Document` mutations. It knows
//! nothing about tasks or scheduling.

pub mod watcher;

pub use watcher::{reload_document, spawn_document_watcher, WatcherHandle};

// src/query/mod.rs

//! Query construction.
//!
//! - [`preamble`] loads the constant head shared by every script.
//! - [`templates`] holds the Scheme fragments.
//! - [`builder`] assembles a script for one `(snapshot, kind)` pair.

pub mod builder;
pub mod preamble;
pub mod templates;

pub use builder::{BuildError, QueryBuilder};
pub use preamble::Preamble;

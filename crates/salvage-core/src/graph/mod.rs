//! Structural views over an inventory's parent/child links.
//!
//! ## Submodules
//!
//! - [`forest`]: Arena index with child, descendant, and depth queries.

pub mod forest;

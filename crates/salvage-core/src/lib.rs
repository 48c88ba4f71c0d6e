//! salvage-core library.
//!
//! Moves the recognizable items of exported game profiles into gifts for a
//! running server, leaving everything else behind in residual snapshots.
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::SalvageError`] with stable `E####` codes.
//! - **Logging**: `tracing` macros; per-profile events carry `profile` and
//!   `step` fields.

pub mod config;
pub mod error;
pub mod gift;
pub mod graph;
pub mod model;
pub mod oracle;
pub mod reconcile;
pub mod run;
pub mod snapshot;

pub use config::RunConfig;
pub use error::{ErrorCode, SalvageError};
pub use model::item::Item;
pub use model::profile::Profile;
pub use reconcile::{ReconcileOptions, Reconciliation, reconcile};
pub use run::{ProfileStatus, RunOptions, RunReport, run};

//! # stdcontent-sync
//!
//! Reconciliation of standard content into a backend.
//!
//! Build a [`Reconciler`] over any [`ContentBackend`] and call
//! [`Reconciler::apply`] with the desired content of one repository, or use
//! [`pipeline::run_local`] to go straight from `repos.json` to a local checkout.

pub mod backend;
pub mod diff;
pub mod engine;
pub mod error;
pub mod executor;
pub mod local;
pub mod pipeline;

pub use backend::ContentBackend;
pub use diff::{render_diff, FileDiff};
pub use engine::{ReconcileOutcome, ReconcilePlan, Reconciler};
pub use error::SyncError;
pub use executor::ParallelQueue;
pub use local::{LocalBackend, WriteResult};
pub use pipeline::{RepoReport, SyncOptions};

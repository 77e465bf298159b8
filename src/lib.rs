//! Mirrors bibliographic catalog records (journals and their issues) from
//! legacy ISIS bases into the SciELO Kernel REST API.
//!
//! The engine is a deterministic batch: raw records are adapted out of
//! their legacy field codes once ([`records`]), mapped to canonical Kernel
//! payloads ([`mapper`]), and converged against the registry with an
//! idempotent fetch-diff-patch-or-create protocol ([`reconcile`]). After
//! all issues are reconciled, each journal's ordered issue list is rebuilt
//! and reconciled too ([`linker`]). Nothing is cached between runs; the
//! Kernel is the only system of record and pre-existing state is never
//! destructively overwritten.

pub mod config;
pub mod error;
pub mod identifier;
pub mod kernel;
pub mod linker;
pub mod mapper;
pub mod pipeline;
pub mod reconcile;
pub mod records;

pub use config::Settings;
pub use error::{RecordError, TransportError};
pub use pipeline::{Counts, SyncReport};
pub use reconcile::ReconcileOutcome;

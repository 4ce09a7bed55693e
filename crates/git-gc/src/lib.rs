//! Garbage collection: reachability-driven pruning, repacking, and
//! deltification for the object store, orchestrated through `GcController`.
//!
//! This crate is the standalone library counterpart of a porcelain `gc`
//! command: it owns no CLI surface, only the orchestration and the
//! phases it sequences. Callers (a CLI, a server housekeeping loop, a
//! test harness) drive it through [`GcController::run`].

mod error;
pub mod deltify;
pub mod lock;
pub mod orchestrator;
pub mod prune;
pub mod repack;

pub use error::GcError;
pub use orchestrator::{GcController, GcOptions, GcStats};
pub use prune::{prune, PrunedObject, DEFAULT_PRUNE_GRACE};
pub use repack::{merge_small_packs, repack_loose, RepackOptions, RepackStats};

//! Reachability and object enumeration: walk commits via `parent` edges,
//! each commit's tree recursively, and tag targets, to produce the full
//! id set behind a set of roots.
//!
//! Revision-history porcelain (`git log` ordering, merge-base, pretty
//! printing, commit-graph acceleration) is a porcelain concern and lives
//! outside the core; this crate keeps only the reachability walk the
//! core's GC and object-listing surfaces depend on.

mod objects;

pub use objects::list_objects;

use git_hash::ObjectId;

/// Errors produced by reachability enumeration.
#[derive(Debug, thiserror::Error)]
pub enum RevWalkError {
    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),

    #[error("object is not a commit: {0}")]
    NotACommit(ObjectId),

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] git_ref::RefError),

    #[error(transparent)]
    Repo(#[from] git_repository::RepoError),

    #[error(transparent)]
    Object(#[from] git_object::ObjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

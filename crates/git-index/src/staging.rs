//! Atomic batch edits over the staging index via `StagingStore`.
//!
//! `Index` already exposes single-entry `add`/`remove`; `StagingStore`
//! wraps it to apply a whole batch as one unit — every edit lands, or
//! (on the first failure) the index is left exactly as it was before
//! the call, matching the "ordered batch, all-or-nothing" contract.

use bstr::{BStr, BString, ByteSlice};
use git_hash::ObjectId;
use git_object::FileMode;

use crate::entry::{IndexEntry, StatData};
use crate::{Index, IndexError, Stage};

/// One edit against the staging index.
#[derive(Debug, Clone)]
pub enum StagingEdit {
    /// Insert or overwrite the stage-0 entry for a path.
    UpdateEntry {
        path: BString,
        mode: FileMode,
        oid: ObjectId,
        stat: StatData,
    },
    /// Remove a single path/stage entry.
    DeleteEntry { path: BString, stage: Stage },
    /// Remove every entry at or under `prefix`, at any stage.
    DeleteTree { prefix: BString },
    /// Toggle CE_VALID (`update-index --assume-unchanged`).
    SetAssumeValid { path: BString, value: bool },
    /// Toggle CE_SKIP_WORKTREE (sparse checkout).
    SetSkipWorktree { path: BString, value: bool },
    /// Toggle CE_INTENT_TO_ADD (`git add -N`).
    SetIntentToAdd { path: BString, value: bool },
    /// Collapse a conflict at `path` down to a single stage-0 entry.
    ResolveConflict {
        path: BString,
        resolution: ConflictResolution,
    },
}

/// How to collapse a 3-way conflict into a clean entry.
#[derive(Debug, Clone)]
pub enum ConflictResolution {
    /// Resolve to an explicit (mode, oid) pair, e.g. externally merged content.
    Use { mode: FileMode, oid: ObjectId },
    /// Resolve to the "ours" side (stage 2).
    TakeOurs,
    /// Resolve to the "theirs" side (stage 3).
    TakeTheirs,
}

/// Applies [`StagingEdit`] batches to an [`Index`] atomically.
pub struct StagingStore<'a> {
    index: &'a mut Index,
}

impl<'a> StagingStore<'a> {
    pub fn new(index: &'a mut Index) -> Self {
        Self { index }
    }

    /// Apply every edit in `batch`, in order, against a scratch copy of
    /// the index. If any edit fails, the original index is left
    /// untouched and the error is returned; otherwise the scratch copy
    /// replaces it.
    pub fn apply(&mut self, batch: Vec<StagingEdit>) -> Result<(), IndexError> {
        let mut scratch = self.index.clone();
        for edit in batch {
            apply_one(&mut scratch, edit)?;
        }
        *self.index = scratch;
        Ok(())
    }
}

fn apply_one(index: &mut Index, edit: StagingEdit) -> Result<(), IndexError> {
    match edit {
        StagingEdit::UpdateEntry {
            path,
            mode,
            oid,
            stat,
        } => {
            index.add(IndexEntry {
                path,
                oid,
                mode,
                stage: Stage::Normal,
                stat,
                flags: Default::default(),
            });
            Ok(())
        }
        StagingEdit::DeleteEntry { path, stage } => {
            index.remove(&path, stage);
            Ok(())
        }
        StagingEdit::DeleteTree { prefix } => {
            index.remove_prefix(&prefix);
            Ok(())
        }
        StagingEdit::SetAssumeValid { path, value } => set_flag(index, &path, value, |f, v| {
            f.assume_valid = v
        }),
        StagingEdit::SetSkipWorktree { path, value } => set_flag(index, &path, value, |f, v| {
            f.skip_worktree = v
        }),
        StagingEdit::SetIntentToAdd { path, value } => set_flag(index, &path, value, |f, v| {
            f.intent_to_add = v
        }),
        StagingEdit::ResolveConflict { path, resolution } => resolve_conflict(index, &path, resolution),
    }
}

fn set_flag(
    index: &mut Index,
    path: &BStr,
    value: bool,
    set: impl FnOnce(&mut crate::EntryFlags, bool),
) -> Result<(), IndexError> {
    let entry = index
        .get_mut(path, Stage::Normal)
        .ok_or_else(|| IndexError::InvalidEntry {
            offset: 0,
            reason: format!("no stage-0 entry for {}", path.to_str_lossy()),
        })?;
    set(&mut entry.flags, value);
    Ok(())
}

fn resolve_conflict(
    index: &mut Index,
    path: &BStr,
    resolution: ConflictResolution,
) -> Result<(), IndexError> {
    let (mode, oid) = match resolution {
        ConflictResolution::Use { mode, oid } => (mode, oid),
        ConflictResolution::TakeOurs => {
            let e = index
                .get(path, Stage::Ours)
                .ok_or_else(|| IndexError::InvalidEntry {
                    offset: 0,
                    reason: format!("no 'ours' stage for {}", path.to_str_lossy()),
                })?;
            (e.mode, e.oid)
        }
        ConflictResolution::TakeTheirs => {
            let e = index
                .get(path, Stage::Theirs)
                .ok_or_else(|| IndexError::InvalidEntry {
                    offset: 0,
                    reason: format!("no 'theirs' stage for {}", path.to_str_lossy()),
                })?;
            (e.mode, e.oid)
        }
    };

    for stage in [Stage::Base, Stage::Ours, Stage::Theirs] {
        index.remove(path, stage);
    }
    index.add(IndexEntry {
        path: path.to_owned(),
        oid,
        mode,
        stage: Stage::Normal,
        stat: StatData::default(),
        flags: Default::default(),
    });
    Ok(())
}

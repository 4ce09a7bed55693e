//! `GcController`: the external-interface entry point for garbage
//! collection, sequencing snapshot → enumerate → reachability (folded
//! into [`crate::prune::prune`]) → prune → repack → deltify, with the
//! repository lock held only around the prune step.

use std::sync::Mutex;
use std::time::Duration;

use git_config::ConfigSet;
use git_repository::Repository;

use crate::lock::GcLock;
use crate::prune::{self, DEFAULT_PRUNE_GRACE};
use crate::repack::{self, RepackOptions};
use crate::GcError;

/// Tunables mirroring the recognized `gc.*`/`pack.*` config keys.
#[derive(Debug, Clone)]
pub struct GcOptions {
    pub prune_grace: Duration,
    pub dry_run: bool,
    /// Override an existing `gc.pid` lock left by a prior run.
    pub force: bool,
    pub delta_candidate_window: usize,
    pub delta_max_chain_depth: usize,
    pub repack_min_packs: usize,
}

impl Default for GcOptions {
    fn default() -> Self {
        Self {
            prune_grace: DEFAULT_PRUNE_GRACE,
            dry_run: false,
            force: false,
            delta_candidate_window: 10,
            delta_max_chain_depth: 50,
            repack_min_packs: 4,
        }
    }
}

impl GcOptions {
    /// Read `gc.pruneGraceSeconds`, `gc.repackMinPacks`,
    /// `gc.deltaCandidateWindow`, and `pack.deltaMaxChainDepth` from
    /// config, falling back to the built-in defaults for anything unset.
    pub fn from_config(config: &ConfigSet) -> Self {
        let defaults = Self::default();
        let prune_grace = config
            .get_int("gc.pruneGraceSeconds")
            .ok()
            .flatten()
            .map(|secs| Duration::from_secs(secs.max(0) as u64))
            .unwrap_or(defaults.prune_grace);
        let repack_min_packs = config
            .get_int("gc.repackMinPacks")
            .ok()
            .flatten()
            .map(|n| n.max(0) as usize)
            .unwrap_or(defaults.repack_min_packs);
        let delta_candidate_window = config
            .get_int("gc.deltaCandidateWindow")
            .ok()
            .flatten()
            .map(|n| n.max(0) as usize)
            .unwrap_or(defaults.delta_candidate_window);
        let delta_max_chain_depth = config
            .get_int("pack.deltaMaxChainDepth")
            .ok()
            .flatten()
            .map(|n| n.max(0) as usize)
            .unwrap_or(defaults.delta_max_chain_depth);

        Self {
            prune_grace,
            repack_min_packs,
            delta_candidate_window,
            delta_max_chain_depth,
            ..defaults
        }
    }

    fn repack_options(&self) -> RepackOptions {
        RepackOptions {
            delete_redundant: true,
            deltify: true,
            delta_window: self.delta_candidate_window,
            max_chain_depth: self.delta_max_chain_depth,
            min_packs_to_merge: self.repack_min_packs,
        }
    }
}

/// Counters from one `run()`, returned to the caller and retained for
/// [`GcController::stats`].
#[derive(Debug, Clone, Default)]
pub struct GcStats {
    pub pruned_objects: usize,
    pub repacked_objects: usize,
    pub deltified_objects: usize,
    pub merged_packs: usize,
}

/// Owns the last run's stats; safe to share across threads (the lock
/// itself serializes concurrent `run()` calls at the prune step, not
/// at this struct).
pub struct GcController {
    last: Mutex<Option<GcStats>>,
}

impl Default for GcController {
    fn default() -> Self {
        Self::new()
    }
}

impl GcController {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    /// Run a full GC pass: prune (under the repository lock), then
    /// repack loose objects and merge small packs (lock-free).
    pub fn run(&self, repo: &Repository, options: &GcOptions) -> Result<GcStats, GcError> {
        let pruned = {
            let _lock = GcLock::acquire(repo.git_dir(), options.force)?;
            prune::prune(repo, options.prune_grace, options.dry_run)?
        };

        let mut stats = GcStats {
            pruned_objects: pruned.len(),
            ..Default::default()
        };

        if !options.dry_run {
            let repack_opts = options.repack_options();
            let loose = repack::repack_loose(repo, &repack_opts)?;
            let merged = repack::merge_small_packs(repo, &repack_opts)?;
            stats.repacked_objects = loose.objects_packed + merged.objects_packed;
            stats.deltified_objects = loose.deltified + merged.deltified;
            stats.merged_packs = merged.deleted_packs;
        }

        *self.last.lock().unwrap() = Some(stats.clone());
        Ok(stats)
    }

    /// Stats from the most recent `run()`, or `None` if none has run yet.
    pub fn stats(&self) -> Option<GcStats> {
        self.last.lock().unwrap().clone()
    }
}

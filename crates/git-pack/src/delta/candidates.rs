//! Candidate base selection for the deltify step.
//!
//! Computing a delta between every pair of objects being packed is
//! quadratic and pointless — most pairs share nothing. A
//! [`CandidateStrategy`] narrows the search to objects plausibly similar
//! to a given target, before `delta::compute::compute_delta` is run on
//! each candidate to see whether it actually helps.

use git_hash::ObjectId;
use git_object::ObjectType;

/// What a strategy needs to know about the set of objects being packed.
pub struct CandidateContext<'a> {
    /// Objects visited so far, in the walk order used to build the pack
    /// (most recent last), alongside their type and byte size.
    pub visited: &'a [(ObjectId, ObjectType, usize)],
    /// Tree path each blob/tree was most recently stored under, if known.
    pub path_history: &'a [(ObjectId, String)],
    /// How many recently visited same-type objects to consider.
    pub window: usize,
}

/// Proposes delta base candidates for a target object.
pub trait CandidateStrategy {
    fn candidates(
        &self,
        target: ObjectId,
        target_type: ObjectType,
        target_size: usize,
        ctx: &CandidateContext<'_>,
    ) -> Vec<ObjectId>;
}

/// Same-type objects visited within a recent window of the walk, newest
/// first. Grounded on `git-revwalk`'s commit-then-tree-then-blob visit
/// order: objects close together in that order tend to be revisions of
/// each other.
pub struct CommitWindowStrategy;

impl CandidateStrategy for CommitWindowStrategy {
    fn candidates(
        &self,
        target: ObjectId,
        target_type: ObjectType,
        _target_size: usize,
        ctx: &CandidateContext<'_>,
    ) -> Vec<ObjectId> {
        ctx.visited
            .iter()
            .rev()
            .filter(|(id, ty, _)| *id != target && *ty == target_type)
            .take(ctx.window)
            .map(|(id, _, _)| *id)
            .collect()
    }
}

/// Same-type objects whose size falls within a band of the target's size.
/// Two objects that differ wildly in size rarely delta well.
pub struct SimilarSizeStrategy {
    pub min_ratio: f64,
    pub max_ratio: f64,
}

impl Default for SimilarSizeStrategy {
    fn default() -> Self {
        Self {
            min_ratio: 0.5,
            max_ratio: 2.0,
        }
    }
}

impl CandidateStrategy for SimilarSizeStrategy {
    fn candidates(
        &self,
        target: ObjectId,
        target_type: ObjectType,
        target_size: usize,
        ctx: &CandidateContext<'_>,
    ) -> Vec<ObjectId> {
        if target_size == 0 {
            return Vec::new();
        }
        ctx.visited
            .iter()
            .filter(|(id, ty, size)| {
                if *id == target || *ty != target_type || *size == 0 {
                    return false;
                }
                let ratio = *size as f64 / target_size as f64;
                ratio >= self.min_ratio && ratio <= self.max_ratio
            })
            .map(|(id, _, _)| *id)
            .collect()
    }
}

/// Objects previously stored under the same tree-entry path as the
/// target. Path history is recorded by the caller (typically the GC
/// deltify step, which knows the tree walk that produced each blob).
pub struct PathAffinityStrategy<'p> {
    pub target_path: &'p str,
}

impl CandidateStrategy for PathAffinityStrategy<'_> {
    fn candidates(
        &self,
        target: ObjectId,
        _target_type: ObjectType,
        _target_size: usize,
        ctx: &CandidateContext<'_>,
    ) -> Vec<ObjectId> {
        ctx.path_history
            .iter()
            .filter(|(id, path)| *id != target && path == self.target_path)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(byte: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        ObjectId::Sha1(bytes)
    }

    #[test]
    fn commit_window_skips_the_target_and_other_types() {
        let visited = vec![
            (oid(1), ObjectType::Blob, 100),
            (oid(2), ObjectType::Tree, 50),
            (oid(3), ObjectType::Blob, 90),
        ];
        let ctx = CandidateContext {
            visited: &visited,
            path_history: &[],
            window: 10,
        };
        let strategy = CommitWindowStrategy;
        let candidates = strategy.candidates(oid(3), ObjectType::Blob, 90, &ctx);
        assert_eq!(candidates, vec![oid(1)]);
    }

    #[test]
    fn similar_size_filters_by_ratio_band() {
        let visited = vec![
            (oid(1), ObjectType::Blob, 1000),
            (oid(2), ObjectType::Blob, 10),
            (oid(3), ObjectType::Blob, 120),
        ];
        let ctx = CandidateContext {
            visited: &visited,
            path_history: &[],
            window: 10,
        };
        let strategy = SimilarSizeStrategy::default();
        let candidates = strategy.candidates(oid(4), ObjectType::Blob, 100, &ctx);
        assert_eq!(candidates, vec![oid(3)]);
    }

    #[test]
    fn path_affinity_matches_same_path_only() {
        let history = vec![
            (oid(1), "src/lib.rs".to_string()),
            (oid(2), "README.md".to_string()),
        ];
        let ctx = CandidateContext {
            visited: &[],
            path_history: &history,
            window: 10,
        };
        let strategy = PathAffinityStrategy {
            target_path: "src/lib.rs",
        };
        let candidates = strategy.candidates(oid(3), ObjectType::Blob, 0, &ctx);
        assert_eq!(candidates, vec![oid(1)]);
    }
}

//! Candidate pair selection and delta computation for the repack step.
//!
//! Drives `git-pack::delta::{candidates, compute, is_worth_keeping}` over
//! a whole set of objects being written into a fresh pack, choosing a
//! delta representation only when it is both within the chain-depth
//! budget and smaller than `base_size * DELTA_KEEP_RATIO`.

use std::collections::HashMap;

use git_hash::ObjectId;
use git_object::ObjectType;
use git_pack::delta::candidates::{CandidateContext, CandidateStrategy, CommitWindowStrategy};
use git_pack::delta::{compute::compute_delta, is_worth_keeping};

/// A chosen on-disk representation for one object in a repack.
pub enum DeltifiedEntry {
    Full {
        oid: ObjectId,
        obj_type: ObjectType,
        data: Vec<u8>,
    },
    Delta {
        oid: ObjectId,
        obj_type: ObjectType,
        base_oid: ObjectId,
        delta: Vec<u8>,
        depth: usize,
    },
}

impl DeltifiedEntry {
    pub fn oid(&self) -> ObjectId {
        match self {
            Self::Full { oid, .. } => *oid,
            Self::Delta { oid, .. } => *oid,
        }
    }
}

/// Walk `objects` in order, proposing a delta base for each from a
/// [`CommitWindowStrategy`] window over the objects already visited, and
/// keep the delta only when it clears the chain-depth and size-ratio
/// policy. Falls back to a full (non-delta) entry otherwise.
pub fn deltify_objects(
    objects: Vec<(ObjectId, ObjectType, Vec<u8>)>,
    window: usize,
    max_chain_depth: usize,
) -> Vec<DeltifiedEntry> {
    let content_by_oid: HashMap<ObjectId, &[u8]> = objects
        .iter()
        .map(|(oid, _, data)| (*oid, data.as_slice()))
        .collect();

    let strategy = CommitWindowStrategy;
    let mut visited: Vec<(ObjectId, ObjectType, usize)> = Vec::with_capacity(objects.len());
    let mut depth_of: HashMap<ObjectId, usize> = HashMap::new();
    let mut out = Vec::with_capacity(objects.len());

    for (oid, obj_type, data) in objects {
        let ctx = CandidateContext {
            visited: &visited,
            path_history: &[],
            window,
        };
        let candidates = strategy.candidates(oid, obj_type, data.len(), &ctx);

        let mut best: Option<(ObjectId, Vec<u8>, usize)> = None;
        for base_oid in candidates {
            let base_depth = *depth_of.get(&base_oid).unwrap_or(&0);
            if base_depth + 1 > max_chain_depth {
                continue;
            }
            let Some(base_data) = content_by_oid.get(&base_oid) else {
                continue;
            };
            let delta = compute_delta(base_data, &data);
            if !is_worth_keeping(delta.len(), base_data.len()) {
                continue;
            }
            let better = match &best {
                None => true,
                Some((_, existing, _)) => delta.len() < existing.len(),
            };
            if better {
                best = Some((base_oid, delta, base_depth + 1));
            }
        }

        visited.push((oid, obj_type, data.len()));

        match best {
            Some((base_oid, delta, depth)) => {
                depth_of.insert(oid, depth);
                out.push(DeltifiedEntry::Delta {
                    oid,
                    obj_type,
                    base_oid,
                    delta,
                    depth,
                });
            }
            None => {
                depth_of.insert(oid, 0);
                out.push(DeltifiedEntry::Full {
                    oid,
                    obj_type,
                    data,
                });
            }
        }
    }

    out
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
    fn near_identical_blob_is_stored_as_a_delta_against_its_predecessor() {
        let base = vec![b'a'; 2000];
        let mut target = base.clone();
        target[1999] = b'b';

        let objects = vec![
            (oid(1), ObjectType::Blob, base),
            (oid(2), ObjectType::Blob, target),
        ];
        let entries = deltify_objects(objects, 10, 50);
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0], DeltifiedEntry::Full { .. }));
        match &entries[1] {
            DeltifiedEntry::Delta { base_oid, depth, .. } => {
                assert_eq!(*base_oid, oid(1));
                assert_eq!(*depth, 1);
            }
            DeltifiedEntry::Full { .. } => panic!("expected a delta entry"),
        }
    }

    #[test]
    fn unrelated_small_objects_are_kept_full() {
        let objects = vec![
            (oid(1), ObjectType::Blob, b"alpha".to_vec()),
            (oid(2), ObjectType::Blob, b"completely different text".to_vec()),
        ];
        let entries = deltify_objects(objects, 10, 50);
        assert!(entries.iter().all(|e| matches!(e, DeltifiedEntry::Full { .. })));
    }

    #[test]
    fn chain_depth_budget_is_respected() {
        // Build a chain of near-identical blobs; max_chain_depth=1 should
        // force every entry after the second to fall back to full storage
        // rather than chaining off a depth-1 delta.
        let mut objects = Vec::new();
        let mut content = vec![b'x'; 500];
        for i in 0..4u8 {
            objects.push((oid(i), ObjectType::Blob, content.clone()));
            content.push(b'y');
        }
        let entries = deltify_objects(objects, 10, 1);
        let delta_count = entries
            .iter()
            .filter(|e| matches!(e, DeltifiedEntry::Delta { depth, .. } if *depth > 1))
            .count();
        assert_eq!(delta_count, 0);
    }
}

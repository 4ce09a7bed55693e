//! Remove loose objects that are both unreachable and old enough to be
//! safe to discard (a concurrent writer might have just created a loose
//! object for something it's about to point a ref at).

use std::collections::HashSet;
use std::fs;
use std::time::{Duration, SystemTime};

use git_hash::ObjectId;
use git_ref::RefStore;
use git_repository::Repository;

use crate::GcError;

/// Default grace window: an unreachable loose object younger than this is
/// left alone. 14 days, matching canonical Git's `2.weeks.ago` default.
pub const DEFAULT_PRUNE_GRACE: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// One object pruning left behind or would have (in dry-run mode).
#[derive(Debug, Clone)]
pub struct PrunedObject {
    pub oid: ObjectId,
}

/// Collect every ref tip plus HEAD as reachability roots.
fn collect_roots(repo: &Repository) -> Result<Vec<ObjectId>, GcError> {
    let mut tips = Vec::new();
    for r in repo.refs().iter(None)? {
        let r = r?;
        tips.push(r.peel_to_oid(repo.refs())?);
    }
    if let Some(head) = repo.head_oid()? {
        tips.push(head);
    }
    Ok(tips)
}

/// Every object reachable from a ref tip or HEAD. Shared with the repack
/// step so a merge can drop packed objects that are no longer reachable
/// without walking the graph twice.
pub(crate) fn reachable_oids(repo: &Repository) -> Result<HashSet<ObjectId>, GcError> {
    let roots = collect_roots(repo)?;
    Ok(git_revwalk::list_objects(repo, &roots, &[])?
        .into_iter()
        .collect())
}

/// Prune unreachable objects older than `grace`. Returns the objects
/// removed (or, in `dry_run` mode, that would have been removed).
///
/// Enumerates the full id set via [`git_odb::ObjectDatabase::iter_all_oids`]
/// (loose, packed, and alternates), so an object that only exists inside a
/// pack is considered here too. A packed-only entry can't be deleted
/// without rewriting the pack it lives in, so this only physically unlinks
/// the loose representation when one exists; a packed-only unreachable
/// object is left for [`crate::repack::merge_small_packs`] to drop the
/// next time those packs are merged.
pub fn prune(repo: &Repository, grace: Duration, dry_run: bool) -> Result<Vec<PrunedObject>, GcError> {
    let reachable = reachable_oids(repo)?;

    let expire_threshold = SystemTime::now() - grace;
    let objects_dir = repo.odb().objects_dir();
    let mut pruned = Vec::new();

    for oid in repo.odb().iter_all_oids()? {
        let oid = oid?;
        if reachable.contains(&oid) {
            continue;
        }

        let path = objects_dir.join(oid.loose_path());
        let Ok(meta) = fs::metadata(&path) else {
            // No loose file: this id is packed-only, handled at repack time.
            continue;
        };
        if let Ok(mtime) = meta.modified() {
            if mtime > expire_threshold {
                continue;
            }
        }

        if !dry_run {
            fs::remove_file(&path)?;
            if let Some(parent) = path.parent() {
                let _ = fs::remove_dir(parent);
            }
        }
        tracing::debug!(oid = %oid.to_hex(), dry_run, "pruning unreachable loose object");
        pruned.push(PrunedObject { oid });
    }

    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_hash::HashAlgorithm;
    use git_object::{Object, ObjectType};

    fn init_repo(dir: &std::path::Path) -> Repository {
        let opts = git_repository::InitOptions {
            bare: true,
            default_branch: Some("main".into()),
            template_dir: None,
            hash_algorithm: HashAlgorithm::Sha1,
        };
        Repository::init_opts(dir, &opts).unwrap()
    }

    #[test]
    fn unreachable_blob_is_pruned_after_grace_period() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());

        let oid = repo
            .odb()
            .write_raw(ObjectType::Blob, b"orphaned")
            .unwrap();
        let path = repo.odb().objects_dir().join(oid.loose_path());
        // Backdate the file well past the grace window.
        let old = std::time::SystemTime::now() - Duration::from_secs(365 * 24 * 60 * 60);
        filetime_touch(&path, old);

        let pruned = prune(&repo, DEFAULT_PRUNE_GRACE, false).unwrap();
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].oid, oid);
        assert!(!path.exists());
    }

    #[test]
    fn recent_unreachable_blob_survives_the_grace_window() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let oid = repo.odb().write_raw(ObjectType::Blob, b"fresh").unwrap();

        let pruned = prune(&repo, DEFAULT_PRUNE_GRACE, false).unwrap();
        assert!(pruned.is_empty());
        assert!(repo.odb().contains(&oid));
    }

    #[test]
    fn reachable_blob_is_never_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let blob_oid = repo.odb().write_raw(ObjectType::Blob, b"kept").unwrap();

        let mut tree = git_object::Tree::new();
        tree.entries.push(git_object::TreeEntry {
            mode: git_object::FileMode::Regular,
            name: "f.txt".into(),
            oid: blob_oid,
        });
        let tree_oid = repo.odb().write(&Object::Tree(tree)).unwrap();

        let sig = git_utils::date::Signature {
            name: "A".into(),
            email: "a@b.com".into(),
            date: git_utils::date::GitDate {
                timestamp: 1_000_000_000,
                tz_offset: 0,
            },
        };
        let commit = git_object::Commit {
            tree: tree_oid,
            parents: vec![],
            author: sig.clone(),
            committer: sig,
            encoding: None,
            gpgsig: None,
            extra_headers: vec![],
            message: "msg\n".into(),
        };
        let commit_oid = repo.odb().write(&Object::Commit(commit)).unwrap();

        let mut txn = git_ref::RefTransaction::new();
        txn.create(
            git_ref::RefName::new("refs/heads/main").unwrap(),
            commit_oid,
            "create",
        );
        repo.refs().commit_transaction(txn).unwrap();

        let path = repo.odb().objects_dir().join(blob_oid.loose_path());
        let old = std::time::SystemTime::now() - Duration::from_secs(365 * 24 * 60 * 60);
        filetime_touch(&path, old);

        let pruned = prune(&repo, DEFAULT_PRUNE_GRACE, false).unwrap();
        assert!(pruned.is_empty());
    }

    fn filetime_touch(path: &std::path::Path, time: SystemTime) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }
}

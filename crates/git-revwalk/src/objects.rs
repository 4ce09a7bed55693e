//! Object listing: enumerate all objects reachable from a set of commits.
//!
//! Used by garbage collection's repack/deltify steps and by any caller
//! needing the full id set behind a ref snapshot.

use std::collections::HashSet;

use git_hash::ObjectId;
use git_object::Object;
use git_repository::Repository;

use crate::RevWalkError;

/// List all objects reachable from the given commits, excluding objects
/// reachable from the excluded set.
///
/// Returns OIDs of all commits, trees, and blobs reachable from `include`
/// but not from `exclude`.
pub fn list_objects(
    repo: &Repository,
    include: &[ObjectId],
    exclude: &[ObjectId],
) -> Result<Vec<ObjectId>, RevWalkError> {
    let mut result = Vec::new();
    let mut seen = HashSet::new();

    // First, collect all objects reachable from excluded commits.
    let mut excluded_objects = HashSet::new();
    for oid in exclude {
        collect_reachable(repo, oid, &mut excluded_objects)?;
    }

    // Now collect all objects reachable from included commits,
    // skipping anything in the excluded set.
    for oid in include {
        collect_reachable_filtered(repo, oid, &mut seen, &excluded_objects, &mut result)?;
    }

    Ok(result)
}

/// Collect all objects reachable from a commit (commits, trees, blobs),
/// ignoring exclusions. Used to build the excluded-object set itself.
fn collect_reachable(
    repo: &Repository,
    start: &ObjectId,
    seen: &mut HashSet<ObjectId>,
) -> Result<(), RevWalkError> {
    let mut stack = vec![*start];

    while let Some(oid) = stack.pop() {
        if !seen.insert(oid) {
            continue;
        }

        let obj = match repo.odb().read(&oid)? {
            Some(obj) => obj,
            None => continue,
        };

        match obj {
            Object::Commit(commit) => {
                stack.push(commit.tree);
                for parent in &commit.parents {
                    stack.push(*parent);
                }
            }
            Object::Tree(tree) => {
                for entry in &tree.entries {
                    stack.push(entry.oid);
                }
            }
            Object::Blob(_) => {}
            Object::Tag(tag) => {
                stack.push(tag.target);
            }
        }
    }

    Ok(())
}

/// Collect reachable objects with exclusion filtering, recording every
/// visited id (commits, trees, blobs, and tag targets) into `result`.
fn collect_reachable_filtered(
    repo: &Repository,
    start: &ObjectId,
    seen: &mut HashSet<ObjectId>,
    excluded: &HashSet<ObjectId>,
    result: &mut Vec<ObjectId>,
) -> Result<(), RevWalkError> {
    let mut stack = vec![*start];

    while let Some(oid) = stack.pop() {
        if !seen.insert(oid) || excluded.contains(&oid) {
            continue;
        }

        let obj = match repo.odb().read(&oid)? {
            Some(obj) => obj,
            None => continue,
        };

        match &obj {
            Object::Commit(commit) => {
                result.push(oid);
                stack.push(commit.tree);
                for parent in &commit.parents {
                    stack.push(*parent);
                }
            }
            Object::Tree(tree) => {
                result.push(oid);
                for entry in &tree.entries {
                    let entry_oid = entry.oid;
                    if excluded.contains(&entry_oid) || seen.contains(&entry_oid) {
                        continue;
                    }
                    stack.push(entry_oid);
                }
            }
            Object::Blob(_) => {
                result.push(oid);
            }
            Object::Tag(tag) => {
                result.push(oid);
                stack.push(tag.target);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_object::{Commit, FileMode, Tree, TreeEntry};

    fn init_repo(dir: &std::path::Path) -> Repository {
        let opts = git_repository::InitOptions {
            bare: true,
            default_branch: Some("main".into()),
            template_dir: None,
            hash_algorithm: git_hash::HashAlgorithm::Sha1,
        };
        Repository::init_opts(dir, &opts).unwrap()
    }

    fn signature() -> git_utils::date::Signature {
        git_utils::date::Signature {
            name: "A".into(),
            email: "a@b.com".into(),
            date: git_utils::date::GitDate {
                timestamp: 1_000_000_000,
                tz_offset: 0,
            },
        }
    }

    #[test]
    fn lists_commit_tree_and_blob_reachable_from_a_single_root() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());

        let blob = repo.odb().write_raw(git_object::ObjectType::Blob, b"hi").unwrap();
        let mut tree = Tree::new();
        tree.entries.push(TreeEntry {
            mode: FileMode::Regular,
            name: "f".into(),
            oid: blob,
        });
        let tree_oid = repo.odb().write(&Object::Tree(tree)).unwrap();
        let commit = Commit {
            tree: tree_oid,
            parents: vec![],
            author: signature(),
            committer: signature(),
            encoding: None,
            gpgsig: None,
            extra_headers: vec![],
            message: "msg\n".into(),
        };
        let commit_oid = repo.odb().write(&Object::Commit(commit)).unwrap();

        let objects = list_objects(&repo, &[commit_oid], &[]).unwrap();
        assert_eq!(objects.len(), 3);
        assert!(objects.contains(&commit_oid));
        assert!(objects.contains(&tree_oid));
        assert!(objects.contains(&blob));
    }

    #[test]
    fn excludes_objects_reachable_only_from_the_excluded_set() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());

        let shared_blob = repo.odb().write_raw(git_object::ObjectType::Blob, b"shared").unwrap();
        let mut base_tree = Tree::new();
        base_tree.entries.push(TreeEntry {
            mode: FileMode::Regular,
            name: "f".into(),
            oid: shared_blob,
        });
        let base_tree_oid = repo.odb().write(&Object::Tree(base_tree)).unwrap();
        let base_commit = Commit {
            tree: base_tree_oid,
            parents: vec![],
            author: signature(),
            committer: signature(),
            encoding: None,
            gpgsig: None,
            extra_headers: vec![],
            message: "base\n".into(),
        };
        let base_oid = repo.odb().write(&Object::Commit(base_commit)).unwrap();

        let new_blob = repo.odb().write_raw(git_object::ObjectType::Blob, b"new").unwrap();
        let mut new_tree = Tree::new();
        new_tree.entries.push(TreeEntry {
            mode: FileMode::Regular,
            name: "f".into(),
            oid: shared_blob,
        });
        new_tree.entries.push(TreeEntry {
            mode: FileMode::Regular,
            name: "g".into(),
            oid: new_blob,
        });
        let new_tree_oid = repo.odb().write(&Object::Tree(new_tree)).unwrap();
        let new_commit = Commit {
            tree: new_tree_oid,
            parents: vec![base_oid],
            author: signature(),
            committer: signature(),
            encoding: None,
            gpgsig: None,
            extra_headers: vec![],
            message: "new\n".into(),
        };
        let new_oid = repo.odb().write(&Object::Commit(new_commit)).unwrap();

        let objects = list_objects(&repo, &[new_oid], &[base_oid]).unwrap();
        assert!(objects.contains(&new_oid));
        assert!(objects.contains(&new_tree_oid));
        assert!(objects.contains(&new_blob));
        assert!(!objects.contains(&base_oid));
        assert!(!objects.contains(&shared_blob));
    }
}

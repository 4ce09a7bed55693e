//! Rewrite loose objects and small packs into a single delta-compressed
//! pack. Pack naming, index construction, and old-pack/loose cleanup
//! follow the same shape as a `repack` porcelain command, generalized
//! into a library function driven by [`RepackOptions`] instead of CLI
//! arguments, with a deltify pass folded in before objects hit the writer.

use std::collections::HashSet;
use std::path::PathBuf;

use git_hash::hasher::Hasher;
use git_hash::{HashAlgorithm, ObjectId};
use git_object::ObjectType;
use git_pack::pack::PackFile;
use git_pack::write::{build_pack_index, PackWriter};
use git_repository::Repository;

use crate::deltify::{deltify_objects, DeltifiedEntry};
use crate::prune::reachable_oids;
use crate::GcError;

/// Tunables for a repack pass.
#[derive(Debug, Clone)]
pub struct RepackOptions {
    /// Remove the source loose files / pack files once the new pack is
    /// safely on disk.
    pub delete_redundant: bool,
    /// Attempt to store objects as deltas against a nearby candidate
    /// instead of always writing full content.
    pub deltify: bool,
    /// Commit-window size passed to the delta candidate strategy
    /// (`gc.deltaCandidateWindow`).
    pub delta_window: usize,
    /// Chain-depth budget (`pack.deltaMaxChainDepth`).
    pub max_chain_depth: usize,
    /// Only merge existing packs once at least this many are present
    /// (`gc.repackMinPacks`).
    pub min_packs_to_merge: usize,
}

impl Default for RepackOptions {
    fn default() -> Self {
        Self {
            delete_redundant: true,
            deltify: true,
            delta_window: 10,
            max_chain_depth: 50,
            min_packs_to_merge: 4,
        }
    }
}

/// Outcome of one repack pass.
#[derive(Debug, Clone, Default)]
pub struct RepackStats {
    pub objects_packed: usize,
    pub deltified: usize,
    pub new_pack: Option<PathBuf>,
    pub deleted_packs: usize,
}

/// Rewrite every loose object into a fresh pack, deleting the loose
/// files once they're safely packed. Reachability isn't checked here — a
/// freshly-written loose object that isn't yet pointed at by a ref (a
/// commit under construction, say) still needs to survive a repack; once
/// packed, it's [`merge_small_packs`] that eventually drops it if it
/// never becomes reachable, and [`crate::prune::prune`] that drops it
/// while it's still loose, once it's past the grace window.
pub fn repack_loose(repo: &Repository, opts: &RepackOptions) -> Result<RepackStats, GcError> {
    let objects_dir = repo.odb().objects_dir().to_path_buf();
    let loose_oids = enumerate_loose(&objects_dir);
    if loose_oids.is_empty() {
        return Ok(RepackStats::default());
    }

    let objects = read_objects(repo, &loose_oids)?;
    let stats = write_pack(repo, objects, opts)?;

    if opts.delete_redundant {
        remove_loose(&objects_dir, &loose_oids);
    }

    Ok(stats)
}

/// If at least `min_packs_to_merge` packs exist, combine every reachable
/// object they contain into one new pack and delete the old ones. An
/// object that is no longer reachable from any ref is dropped here rather
/// than carried into the merged pack — packed storage has no individual
/// file to prune, so a merge is the only point a packed-only unreachable
/// object actually gets collected.
pub fn merge_small_packs(repo: &Repository, opts: &RepackOptions) -> Result<RepackStats, GcError> {
    let pack_dir = repo.odb().objects_dir().join("pack");
    let existing: Vec<PathBuf> = match std::fs::read_dir(&pack_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("pack"))
            .collect(),
        Err(_) => Vec::new(),
    };

    if existing.len() < opts.min_packs_to_merge {
        return Ok(RepackStats::default());
    }

    let reachable = reachable_oids(repo)?;
    let mut oids: Vec<ObjectId> = Vec::new();
    let mut seen = HashSet::new();
    for pack_path in &existing {
        let pack = PackFile::open(pack_path)?;
        for (oid, _offset) in pack.index().iter() {
            if reachable.contains(&oid) && seen.insert(oid) {
                oids.push(oid);
            }
        }
    }

    if oids.is_empty() {
        if opts.delete_redundant {
            for pack_path in &existing {
                let _ = std::fs::remove_file(pack_path);
                let _ = std::fs::remove_file(pack_path.with_extension("idx"));
                let _ = std::fs::remove_file(pack_path.with_extension("bitmap"));
            }
            repo.odb().refresh()?;
            return Ok(RepackStats {
                deleted_packs: existing.len(),
                ..Default::default()
            });
        }
        return Ok(RepackStats::default());
    }

    let objects = read_objects(repo, &oids)?;
    let mut stats = write_pack(repo, objects, opts)?;

    if opts.delete_redundant {
        for pack_path in &existing {
            let _ = std::fs::remove_file(pack_path);
            let _ = std::fs::remove_file(pack_path.with_extension("idx"));
            let _ = std::fs::remove_file(pack_path.with_extension("bitmap"));
        }
        stats.deleted_packs = existing.len();
    }

    Ok(stats)
}

fn read_objects(
    repo: &Repository,
    oids: &[ObjectId],
) -> Result<Vec<(ObjectId, ObjectType, Vec<u8>)>, GcError> {
    let mut out = Vec::with_capacity(oids.len());
    for oid in oids {
        if let Some(obj) = repo.odb().read(oid)? {
            out.push((*oid, obj.object_type(), obj.serialize_content()));
        }
    }
    Ok(out)
}

fn write_pack(
    repo: &Repository,
    objects: Vec<(ObjectId, ObjectType, Vec<u8>)>,
    opts: &RepackOptions,
) -> Result<RepackStats, GcError> {
    let pack_dir = repo.odb().objects_dir().join("pack");
    std::fs::create_dir_all(&pack_dir)?;

    let object_count = objects.len();
    let mut name_hasher = Hasher::new(HashAlgorithm::Sha1);
    for (oid, _, _) in &objects {
        name_hasher.update(oid.as_bytes());
    }
    let pack_name = format!("pack-{}", name_hasher.finalize().map_err(git_pack::PackError::Hash)?.to_hex());

    let pack_path = pack_dir.join(format!("{pack_name}.pack"));
    let idx_path = pack_dir.join(format!("{pack_name}.idx"));

    let entries = if opts.deltify {
        deltify_objects(objects, opts.delta_window, opts.max_chain_depth)
    } else {
        objects
            .into_iter()
            .map(|(oid, obj_type, data)| DeltifiedEntry::Full { oid, obj_type, data })
            .collect()
    };

    let deltified = entries
        .iter()
        .filter(|e| matches!(e, DeltifiedEntry::Delta { .. }))
        .count();

    let mut writer = PackWriter::new(&pack_path)?;
    for entry in entries {
        match entry {
            DeltifiedEntry::Full { obj_type, data, .. } => {
                writer.add_object(obj_type, &data)?;
            }
            DeltifiedEntry::Delta {
                oid,
                base_oid,
                delta,
                ..
            } => {
                writer.add_delta(base_oid, oid, &delta)?;
            }
        }
    }

    let mut index_entries: Vec<(ObjectId, u64, u32)> = writer
        .entries()
        .map(|(oid, off, crc)| (*oid, off, crc))
        .collect();
    let (pack_path, checksum) = writer.finish()?;
    build_pack_index(&idx_path, &mut index_entries, &checksum)?;

    repo.odb().refresh()?;

    Ok(RepackStats {
        objects_packed: object_count,
        deltified,
        new_pack: Some(pack_path),
        deleted_packs: 0,
    })
}

fn enumerate_loose(objects_dir: &std::path::Path) -> Vec<ObjectId> {
    let mut out = Vec::new();
    for fanout in 0..=255u8 {
        let dir = objects_dir.join(format!("{fanout:02x}"));
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.len() != 38 || !name.bytes().all(|b| b.is_ascii_hexdigit()) {
                continue;
            }
            if let Ok(oid) = ObjectId::from_hex(&format!("{fanout:02x}{name}")) {
                out.push(oid);
            }
        }
    }
    out
}

fn remove_loose(objects_dir: &std::path::Path, oids: &[ObjectId]) {
    for oid in oids {
        let path = objects_dir.join(oid.loose_path());
        let _ = std::fs::remove_file(&path);
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir(parent);
        }
    }
}

//! Compute deltas between objects.
//!
//! Implements a simplified version of git's diff-delta algorithm. The
//! algorithm builds a rolling-hash index of every `BLOCK_SIZE`-byte window
//! in the source (not just block-aligned ones, so a match can be found no
//! matter where in the source it starts), then scans the target with the
//! same rolling hash looking for a window whose hash collides with one
//! already in the index. Matching regions become copy instructions;
//! non-matching regions become insert instructions.

use std::collections::HashMap;

use super::{encode_copy, encode_insert, write_varint};

/// Width of the hashed window. Matches shorter than this are never found.
const BLOCK_SIZE: usize = 16;

/// Rolling hash base. Large and odd so the polynomial mixes well across a
/// 16-byte window; the hash lives in `u64` and is allowed to wrap.
const BASE: u64 = 1_000_000_007;

/// Cap on candidate offsets kept per hash bucket, so a source made of a
/// single repeated byte doesn't blow up the index to one entry per byte.
const MAX_CANDIDATES_PER_BUCKET: usize = 16;

/// A window hash that can be advanced one byte at a time in O(1), instead
/// of re-hashing the whole window at every position.
struct RollingHash {
    value: u64,
    /// BASE^(BLOCK_SIZE - 1), used to remove the outgoing byte's contribution.
    high_power: u64,
}

impl RollingHash {
    fn from_window(window: &[u8]) -> Self {
        let mut value: u64 = 0;
        for &b in window {
            value = value.wrapping_mul(BASE).wrapping_add(b as u64);
        }
        let mut high_power: u64 = 1;
        for _ in 0..window.len().saturating_sub(1) {
            high_power = high_power.wrapping_mul(BASE);
        }
        Self { value, high_power }
    }

    /// Slide the window forward by one byte: drop `outgoing`, append `incoming`.
    fn roll(&mut self, outgoing: u8, incoming: u8) {
        self.value = self
            .value
            .wrapping_sub((outgoing as u64).wrapping_mul(self.high_power));
        self.value = self.value.wrapping_mul(BASE).wrapping_add(incoming as u64);
    }
}

/// Compute a delta that transforms `source` into `target`.
///
/// Returns the raw delta byte stream that can be applied with `apply_delta`.
pub fn compute_delta(source: &[u8], target: &[u8]) -> Vec<u8> {
    let mut delta = Vec::new();

    delta.extend_from_slice(&write_varint(source.len()));
    delta.extend_from_slice(&write_varint(target.len()));

    if target.is_empty() {
        return delta;
    }

    let index = build_rolling_index(source);

    let mut tpos = 0;
    let mut pending_insert: Vec<u8> = Vec::new();
    let mut hash = if target.len() >= BLOCK_SIZE {
        Some(RollingHash::from_window(&target[..BLOCK_SIZE]))
    } else {
        None
    };

    while tpos < target.len() {
        let remaining = target.len() - tpos;

        if remaining >= BLOCK_SIZE {
            let h = hash.as_ref().unwrap().value;
            let window = &target[tpos..tpos + BLOCK_SIZE];
            let found = index
                .get(&h)
                .and_then(|offsets| {
                    offsets
                        .iter()
                        .find(|&&src_off| &source[src_off..src_off + BLOCK_SIZE] == window)
                })
                .copied();

            if let Some(src_offset) = found {
                let match_len = extend_match(source, src_offset, target, tpos);
                flush_insert(&mut delta, &mut pending_insert);
                emit_copy(&mut delta, src_offset, match_len);
                tpos += match_len;

                hash = if tpos + BLOCK_SIZE <= target.len() {
                    Some(RollingHash::from_window(&target[tpos..tpos + BLOCK_SIZE]))
                } else {
                    None
                };
                continue;
            }
        }

        pending_insert.push(target[tpos]);
        tpos += 1;

        if let Some(h) = hash.as_mut() {
            if tpos + BLOCK_SIZE <= target.len() {
                h.roll(target[tpos - 1], target[tpos + BLOCK_SIZE - 1]);
            } else {
                hash = None;
            }
        } else if tpos + BLOCK_SIZE <= target.len() {
            hash = Some(RollingHash::from_window(&target[tpos..tpos + BLOCK_SIZE]));
        }

        if pending_insert.len() == 127 {
            flush_insert(&mut delta, &mut pending_insert);
        }
    }

    flush_insert(&mut delta, &mut pending_insert);

    delta
}

/// Index every `BLOCK_SIZE`-byte window of `source` by its rolling hash,
/// keeping the earliest few offsets per bucket.
fn build_rolling_index(source: &[u8]) -> HashMap<u64, Vec<usize>> {
    let mut index: HashMap<u64, Vec<usize>> = HashMap::new();
    if source.len() < BLOCK_SIZE {
        return index;
    }

    let mut hash = RollingHash::from_window(&source[..BLOCK_SIZE]);
    for offset in 0..=source.len() - BLOCK_SIZE {
        if offset > 0 {
            hash.roll(source[offset - 1], source[offset + BLOCK_SIZE - 1]);
        }
        let bucket = index.entry(hash.value).or_default();
        if bucket.len() < MAX_CANDIDATES_PER_BUCKET {
            bucket.push(offset);
        }
    }

    index
}

/// Extend a match between source[src_off..] and target[tgt_off..] as far as possible.
fn extend_match(source: &[u8], src_off: usize, target: &[u8], tgt_off: usize) -> usize {
    let max_len = std::cmp::min(source.len() - src_off, target.len() - tgt_off);
    let mut len = BLOCK_SIZE;
    while len < max_len && source[src_off + len] == target[tgt_off + len] {
        len += 1;
    }
    len
}

/// Flush pending insert bytes as one or more insert instructions.
fn flush_insert(delta: &mut Vec<u8>, pending: &mut Vec<u8>) {
    while !pending.is_empty() {
        let chunk_len = std::cmp::min(pending.len(), 127);
        let chunk: Vec<u8> = pending.drain(..chunk_len).collect();
        delta.extend_from_slice(&encode_insert(&chunk));
    }
}

/// Emit a copy instruction, splitting into multiple if needed (max copy size = 0xffffff).
fn emit_copy(delta: &mut Vec<u8>, offset: usize, mut size: usize) {
    let mut off = offset;
    while size > 0 {
        let chunk = std::cmp::min(size, 0x00ff_ffff); // max 24-bit size
        delta.extend_from_slice(&encode_copy(off as u64, chunk));
        off += chunk;
        size -= chunk;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::apply::apply_delta;

    #[test]
    fn identical_objects() {
        let data = b"Hello, World! This is a test of delta compression.";
        let delta = compute_delta(data, data);
        let result = apply_delta(data, &delta).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn completely_different() {
        let source = b"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let target = b"BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
        let delta = compute_delta(source, target);
        let result = apply_delta(source, &delta).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn empty_target() {
        let source = b"something";
        let target = b"";
        let delta = compute_delta(source, target);
        let result = apply_delta(source, &delta).unwrap();
        assert_eq!(result, target.as_slice());
    }

    #[test]
    fn empty_source() {
        let source = b"";
        let target = b"new content here";
        let delta = compute_delta(source, target);
        let result = apply_delta(source, &delta).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn prepend_data() {
        let source = b"0123456789abcdef0123456789abcdef"; // 32 bytes
        let mut target = b"PREPENDED_".to_vec();
        target.extend_from_slice(source);
        let delta = compute_delta(source, &target);
        let result = apply_delta(source, &delta).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn append_data() {
        let source = b"0123456789abcdef0123456789abcdef"; // 32 bytes
        let mut target = source.to_vec();
        target.extend_from_slice(b"_APPENDED");
        let delta = compute_delta(source, &target);
        let result = apply_delta(source, &delta).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn large_similar_objects() {
        let source: Vec<u8> = (0..4096).map(|i| (i % 256) as u8).collect();
        let mut target = source.clone();
        target[2048] = 0xFF;
        target[2049] = 0xFE;
        target[2050] = 0xFD;

        let delta = compute_delta(&source, &target);
        let result = apply_delta(&source, &delta).unwrap();
        assert_eq!(result, target);
        assert!(delta.len() < target.len());
    }

    #[test]
    fn finds_match_not_aligned_to_block_size() {
        // The reused region starts at an offset that isn't a multiple of
        // BLOCK_SIZE in the source, which a block-aligned index would miss.
        let mut source = vec![0u8; 7];
        source.extend_from_slice(b"this region is reused verbatim across both objects");
        let mut target = vec![9u8; 3];
        target.extend_from_slice(b"this region is reused verbatim across both objects");

        let delta = compute_delta(&source, &target);
        let result = apply_delta(&source, &delta).unwrap();
        assert_eq!(result, target);
        assert!(delta.len() < target.len());
    }

    #[test]
    fn repeated_byte_source_does_not_blow_up_index() {
        let source = vec![b'x'; 10_000];
        let target = vec![b'x'; 10_000];
        let delta = compute_delta(&source, &target);
        let result = apply_delta(&source, &delta).unwrap();
        assert_eq!(result, target);
    }
}

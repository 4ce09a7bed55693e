//! Content-addressed object store, generalized over pluggable raw storage
//! ([`git_store::RawStore`]) and stream-buffering ([`git_tempstore::TempStore`])
//! backends.
//!
//! This is the streaming-ingest layer: it turns an object type plus a byte
//! stream of possibly-unknown length into a hashed, compressed, deduplicated
//! entry in whatever `RawStore` it was built on. `git-loose` remains the
//! production filesystem-specific implementation of the same contract; this
//! crate demonstrates — and can be used to test against — storage backends
//! other than the filesystem (in-memory, for embedding or tests).

mod error;

pub use error::ObjectStoreError;

use std::io::{Cursor, Read};

use flate2::read::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;

use git_hash::hasher::Hasher;
use git_hash::{HashAlgorithm, ObjectId};
use git_object::{header, Object, ObjectType};
use git_store::{Key, RawStore};
use git_tempstore::TempStore;

/// Content-addressed store built from a [`RawStore`] and a [`TempStore`].
pub struct ObjectStore<R, T> {
    raw: R,
    temp: T,
    hash_algo: HashAlgorithm,
    compression_level: Compression,
}

impl<R: RawStore, T: TempStore> ObjectStore<R, T> {
    pub fn new(raw: R, temp: T, hash_algo: HashAlgorithm) -> Self {
        Self {
            raw,
            temp,
            hash_algo,
            compression_level: Compression::default(),
        }
    }

    pub fn set_compression_level(&mut self, level: u32) {
        self.compression_level = Compression::new(level);
    }

    /// Buffer `reader` to learn its size, then store it as `obj_type`.
    pub fn store(
        &self,
        obj_type: ObjectType,
        reader: &mut dyn Read,
    ) -> Result<ObjectId, ObjectStoreError> {
        let handle = self.temp.buffer(reader)?;
        let size = handle.size();
        let mut content = handle.read()?;
        self.store_with_size(obj_type, size, content.as_mut())
    }

    /// Store a stream whose exact length is already known, skipping the
    /// temp-buffering pass. `reader` must yield exactly `size` bytes.
    ///
    /// The header, hash, and zlib compression are all computed in a
    /// single streamed pass over `reader`: bytes are hashed as they are
    /// read and piped straight into a read-side zlib encoder, which is
    /// itself what gets buffered through `self.temp` (in memory or
    /// spilled to disk, per the configured [`TempStore`] strategy).
    /// Neither the raw content nor the compressed output is ever held
    /// resident as one complete buffer by this method; the only
    /// materialized copy is whatever `self.temp` itself buffers.
    pub fn store_with_size(
        &self,
        obj_type: ObjectType,
        size: u64,
        reader: &mut dyn Read,
    ) -> Result<ObjectId, ObjectStoreError> {
        let hdr = header::write_header(obj_type, size as usize);
        let hdr_len = hdr.len() as u64;

        let mut hashing = HashingReader {
            inner: Cursor::new(hdr).chain(reader),
            hasher: Hasher::new(self.hash_algo),
            consumed: 0,
        };
        let handle = {
            let mut compressor = ZlibEncoder::new(&mut hashing, self.compression_level);
            self.temp.buffer(&mut compressor)?
        };

        let content_len = hashing.consumed - hdr_len;
        if content_len != size {
            return Err(ObjectStoreError::SizeMismatch {
                expected: size,
                actual: content_len,
            });
        }
        let oid = hashing.hasher.finalize()?;

        let key = oid_key(&oid);
        if self.raw.has(&key)? {
            tracing::trace!(oid = %oid.to_hex(), "object already present, skipping write");
            handle.dispose();
            return Ok(oid);
        }

        self.raw.store(&key, &mut handle.read()?)?;
        tracing::trace!(oid = %oid.to_hex(), bytes = content_len, "stored object");
        Ok(oid)
    }

    /// Read and fully parse an object. `Ok(None)` if it isn't present.
    ///
    /// A buffered convenience built on top of [`Self::load_stream`]; for
    /// large payloads callers that don't need a decoded [`Object`] should
    /// prefer `load_stream` to avoid materializing the full content.
    pub fn load(&self, oid: &ObjectId) -> Result<Option<Object>, ObjectStoreError> {
        let Some(mut stream) = self.load_stream(oid)? else {
            return Ok(None);
        };

        let obj_type = stream.object_type();
        let mut content = Vec::with_capacity(stream.size());
        stream.read_to_end(&mut content).map_err(|e| ObjectStoreError::Corrupt {
            oid: oid.to_hex(),
            reason: e.to_string(),
        })?;

        Ok(Some(Object::parse_content(obj_type, &content)?))
    }

    /// Open the payload of `oid` as a stream, header already consumed.
    /// `Ok(None)` if the id isn't present.
    ///
    /// This is the raw streaming read path: a zlib [`ZlibDecoder`] over
    /// the [`RawStore`]'s reader, with only the `"<type> <size>\0"`
    /// header peeled off. Content is decompressed lazily as the caller
    /// reads, never buffered whole by this method.
    pub fn load_stream(
        &self,
        oid: &ObjectId,
    ) -> Result<Option<ObjectPayload>, ObjectStoreError> {
        let key = oid_key(oid);
        let Some(reader) = self.raw.load(&key)? else {
            return Ok(None);
        };

        let mut decoder = ZlibDecoder::new(reader);
        let (obj_type, size, leftover) = read_header(&mut decoder, oid)?;
        Ok(Some(ObjectPayload {
            obj_type,
            size,
            leftover: Cursor::new(leftover),
            decoder,
        }))
    }

    /// Read only the type and declared size, without decompressing content.
    pub fn load_header(
        &self,
        oid: &ObjectId,
    ) -> Result<Option<(ObjectType, usize)>, ObjectStoreError> {
        let key = oid_key(oid);
        let Some(reader) = self.raw.load(&key)? else {
            return Ok(None);
        };

        let mut decoder = ZlibDecoder::new(reader);
        let (obj_type, size, _leftover) = read_header(&mut decoder, oid)?;
        Ok(Some((obj_type, size)))
    }

    pub fn has(&self, oid: &ObjectId) -> Result<bool, ObjectStoreError> {
        Ok(self.raw.has(&oid_key(oid))?)
    }

    pub fn raw(&self) -> &R {
        &self.raw
    }
}

/// Wraps a reader, feeding every byte it yields into a [`Hasher`] and
/// counting bytes consumed, while passing them through unchanged.
struct HashingReader<R> {
    inner: R,
    hasher: Hasher,
    consumed: u64,
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
            self.consumed += n as u64;
        }
        Ok(n)
    }
}

/// A streaming view of an object's payload: the header has already been
/// parsed and stripped, and the remaining bytes are inflated lazily.
pub struct ObjectPayload {
    obj_type: ObjectType,
    size: usize,
    leftover: Cursor<Vec<u8>>,
    decoder: ZlibDecoder<Box<dyn Read + Send>>,
}

impl ObjectPayload {
    pub fn object_type(&self) -> ObjectType {
        self.obj_type
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Read for ObjectPayload {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.leftover.read(buf)?;
        if n > 0 {
            return Ok(n);
        }
        self.decoder.read(buf)
    }
}

/// Read the `"<type> <size>\0"` header from a zlib decoder one chunk at a
/// time, stopping as soon as the null terminator is seen, and return
/// whatever payload bytes were already pulled into that chunk alongside
/// it (the stream position can't be rewound, so these must be replayed
/// to the caller ahead of further reads from `decoder`).
fn read_header(
    decoder: &mut ZlibDecoder<Box<dyn Read + Send>>,
    oid: &ObjectId,
) -> Result<(ObjectType, usize, Vec<u8>), ObjectStoreError> {
    let mut buf = [0u8; 64];
    let mut filled = 0;
    loop {
        if filled >= buf.len() {
            return Err(ObjectStoreError::Corrupt {
                oid: oid.to_hex(),
                reason: "header exceeds 64 bytes".into(),
            });
        }
        let n = decoder.read(&mut buf[filled..]).map_err(|e| ObjectStoreError::Corrupt {
            oid: oid.to_hex(),
            reason: e.to_string(),
        })?;
        if n == 0 {
            return Err(ObjectStoreError::Corrupt {
                oid: oid.to_hex(),
                reason: "unexpected EOF before header null terminator".into(),
            });
        }
        filled += n;
        if buf[..filled].contains(&0) {
            break;
        }
    }

    let (obj_type, size, hdr_len) = header::parse_header(&buf[..filled])?;
    Ok((obj_type, size, buf[hdr_len..filled].to_vec()))
}

/// An object id is always a valid store key: its hex form is all-ASCII
/// hexdigit and at least 40 characters long.
fn oid_key(oid: &ObjectId) -> Key {
    Key::new(oid.to_hex()).expect("hex-encoded object id is always a valid store key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_store::MemoryStore;
    use git_tempstore::InMemoryTempStore;

    fn store() -> ObjectStore<MemoryStore, InMemoryTempStore> {
        ObjectStore::new(MemoryStore::new(), InMemoryTempStore, HashAlgorithm::Sha1)
    }

    #[test]
    fn store_then_load_roundtrips_a_blob() {
        let store = store();
        let oid = store
            .store(ObjectType::Blob, &mut Cursor::new(b"hello world".to_vec()))
            .unwrap();

        let loaded = store.load(&oid).unwrap().unwrap();
        match loaded {
            Object::Blob(b) => assert_eq!(b.data, b"hello world"),
            other => panic!("expected blob, got {other:?}"),
        }
    }

    #[test]
    fn store_is_content_addressed_and_idempotent() {
        let store = store();
        let a = store
            .store(ObjectType::Blob, &mut Cursor::new(b"same bytes".to_vec()))
            .unwrap();
        let b = store
            .store(ObjectType::Blob, &mut Cursor::new(b"same bytes".to_vec()))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn load_header_reports_type_and_size_without_full_parse() {
        let store = store();
        let oid = store
            .store(ObjectType::Blob, &mut Cursor::new(vec![0u8; 5000]))
            .unwrap();

        let (ty, size) = store.load_header(&oid).unwrap().unwrap();
        assert_eq!(ty, ObjectType::Blob);
        assert_eq!(size, 5000);
    }

    #[test]
    fn missing_object_loads_as_none() {
        let store = store();
        let oid = ObjectId::from_hex("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap();
        assert!(store.load(&oid).unwrap().is_none());
        assert!(!store.has(&oid).unwrap());
    }

    #[test]
    fn store_with_size_rejects_a_short_stream() {
        let store = store();
        let err = store
            .store_with_size(ObjectType::Blob, 100, &mut Cursor::new(b"too short".to_vec()))
            .unwrap_err();
        assert!(matches!(err, ObjectStoreError::SizeMismatch { .. }));
    }
}

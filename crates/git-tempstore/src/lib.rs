//! Buffer a stream of unknown length, learn its exact size, and replay it
//! as many times as needed.
//!
//! Git requires the byte length of an object's content before the object
//! header (`"<type> <size>\0"`) can be written, but callers often hand us
//! a stream whose length isn't known up front. A temp store closes that
//! gap: it consumes the stream once, reports the exact count, and then
//! lets the caller read the buffered bytes back — typically twice, once
//! to compute the hash and once to write the payload through the raw
//! store.

use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::NamedTempFile;

/// Errors raised while buffering or replaying a stream.
#[derive(Debug, thiserror::Error)]
pub enum TempStoreError {
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A buffered stream: its exact size, and a repeatable reader.
#[derive(Clone)]
pub enum TempHandle {
    Memory(Arc<Vec<u8>>),
    File(Arc<NamedTempFile>, u64),
}

impl TempHandle {
    /// The exact number of bytes buffered.
    pub fn size(&self) -> u64 {
        match self {
            TempHandle::Memory(buf) => buf.len() as u64,
            TempHandle::File(_, size) => *size,
        }
    }

    /// Open a fresh reader over the buffered content. May be called any
    /// number of times; each call starts from the beginning.
    pub fn read(&self) -> Result<Box<dyn Read + Send>, TempStoreError> {
        match self {
            TempHandle::Memory(buf) => Ok(Box::new(Cursor::new(buf.as_ref().clone()))),
            TempHandle::File(tmp, _) => Ok(Box::new(File::open(tmp.path())?)),
        }
    }

    /// Release any backing resources (file-backed handles delete their
    /// temp file once the last clone is dropped; this is also what
    /// happens implicitly if the handle is just dropped).
    pub fn dispose(self) {
        drop(self);
    }
}

/// Strategy for buffering a stream into a `TempHandle`.
pub trait TempStore: Send + Sync {
    fn buffer(&self, reader: &mut dyn Read) -> Result<TempHandle, TempStoreError>;
}

/// Buffers entirely in memory. Appropriate for small objects; unsuitable
/// for content that may not fit in RAM.
#[derive(Default)]
pub struct InMemoryTempStore;

impl TempStore for InMemoryTempStore {
    fn buffer(&self, reader: &mut dyn Read) -> Result<TempHandle, TempStoreError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(TempHandle::Memory(Arc::new(buf)))
    }
}

/// Always spills to a temp file in the given directory, grounded on the
/// same temp-file-then-replay RAII shape as `git_utils::tempfile::TempFile`.
pub struct FileBackedTempStore {
    dir: PathBuf,
}

impl FileBackedTempStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TempStore for FileBackedTempStore {
    fn buffer(&self, reader: &mut dyn Read) -> Result<TempHandle, TempStoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        let size = io::copy(reader, &mut tmp)?;
        tmp.flush()?;
        Ok(TempHandle::File(Arc::new(tmp), size))
    }
}

/// Buffers in memory up to `threshold` bytes, then spills the rest (plus
/// what was already read) to a temp file. Default threshold: 1 MiB.
pub struct HybridTempStore {
    threshold: u64,
    file_store: FileBackedTempStore,
}

impl HybridTempStore {
    pub const DEFAULT_THRESHOLD: u64 = 1024 * 1024;

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_threshold(dir, Self::DEFAULT_THRESHOLD)
    }

    pub fn with_threshold(dir: impl Into<PathBuf>, threshold: u64) -> Self {
        Self {
            threshold,
            file_store: FileBackedTempStore::new(dir),
        }
    }
}

impl TempStore for HybridTempStore {
    fn buffer(&self, reader: &mut dyn Read) -> Result<TempHandle, TempStoreError> {
        let mut head = Vec::new();
        io::Read::take(&mut *reader, self.threshold).read_to_end(&mut head)?;

        if (head.len() as u64) < self.threshold {
            return Ok(TempHandle::Memory(Arc::new(head)));
        }

        std::fs::create_dir_all(&self.file_store.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.file_store.dir)?;
        tmp.write_all(&head)?;
        let tail = io::copy(reader, &mut tmp)?;
        tmp.flush()?;
        let total = head.len() as u64 + tail;
        Ok(TempHandle::File(Arc::new(tmp), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_reports_exact_size_and_replays() {
        let store = InMemoryTempStore;
        let handle = store.buffer(&mut Cursor::new(b"hello world".to_vec())).unwrap();
        assert_eq!(handle.size(), 11);

        let mut first = Vec::new();
        handle.read().unwrap().read_to_end(&mut first).unwrap();
        let mut second = Vec::new();
        handle.read().unwrap().read_to_end(&mut second).unwrap();
        assert_eq!(first, b"hello world");
        assert_eq!(first, second);
    }

    #[test]
    fn file_backed_reports_exact_size_and_replays() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackedTempStore::new(dir.path());
        let payload = vec![7u8; 4096];
        let handle = store.buffer(&mut Cursor::new(payload.clone())).unwrap();
        assert_eq!(handle.size(), 4096);

        let mut first = Vec::new();
        handle.read().unwrap().read_to_end(&mut first).unwrap();
        let mut second = Vec::new();
        handle.read().unwrap().read_to_end(&mut second).unwrap();
        assert_eq!(first, payload);
        assert_eq!(second, payload);
    }

    #[test]
    fn hybrid_stays_in_memory_under_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store = HybridTempStore::with_threshold(dir.path(), 1024);
        let handle = store.buffer(&mut Cursor::new(vec![1u8; 100])).unwrap();
        assert!(matches!(handle, TempHandle::Memory(_)));
        assert_eq!(handle.size(), 100);
    }

    #[test]
    fn hybrid_spills_to_disk_over_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store = HybridTempStore::with_threshold(dir.path(), 1024);
        let payload = vec![2u8; 5000];
        let handle = store.buffer(&mut Cursor::new(payload.clone())).unwrap();
        assert!(matches!(handle, TempHandle::File(..)));
        assert_eq!(handle.size(), 5000);

        let mut out = Vec::new();
        handle.read().unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn empty_stream_buffers_to_zero_size() {
        let store = InMemoryTempStore;
        let handle = store.buffer(&mut Cursor::new(Vec::new())).unwrap();
        assert_eq!(handle.size(), 0);
    }
}

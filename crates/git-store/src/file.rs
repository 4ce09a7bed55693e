//! File-system `RawStore` using the loose-object fan-out layout.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::{Key, RawStore, StoreError};

/// A `RawStore` that lays keys out as `<root>/<first 2 hex>/<remaining hex>`,
/// the same directory scheme Git uses for loose objects. Writes go through
/// a temp file in `root` and an atomic rename, so a concurrent `load` of the
/// same key never observes a partial write.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &Key) -> PathBuf {
        let (dir, name) = key.fanout_parts();
        self.root.join(dir).join(name)
    }

    fn temp_path(&self) -> PathBuf {
        let nonce = std::process::id()
            ^ std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .subsec_nanos();
        self.root.join(format!("tmp_obj_{nonce}"))
    }
}

impl RawStore for FileStore {
    fn store(&self, key: &Key, reader: &mut dyn Read) -> Result<(), StoreError> {
        let final_path = self.path_for(key);
        if final_path.exists() {
            return Ok(());
        }
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.temp_path();
        {
            let mut file = fs::File::create(&tmp_path)?;
            std::io::copy(reader, &mut file)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o444))?;
            }
        }

        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => Ok(()),
            Err(_) if final_path.exists() => {
                // Another writer won the race; same content, so this is a
                // successful no-op rather than an error.
                let _ = fs::remove_file(&tmp_path);
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                Err(StoreError::Io(e))
            }
        }
    }

    fn load(&self, key: &Key) -> Result<Option<Box<dyn Read + Send>>, StoreError> {
        let path = self.path_for(key);
        match fs::File::open(&path) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn has(&self, key: &Key) -> Result<bool, StoreError> {
        Ok(self.path_for(key).exists())
    }

    fn delete(&self, key: &Key) -> Result<bool, StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn keys(&self) -> Result<Box<dyn Iterator<Item = Result<Key, StoreError>>>, StoreError> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        if self.root.is_dir() {
            for entry in fs::read_dir(&self.root)? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.len() == 2
                    && name.bytes().all(|b| b.is_ascii_hexdigit())
                    && entry.file_type()?.is_dir()
                {
                    dirs.push(entry.path());
                }
            }
        }
        dirs.sort();

        let mut results = Vec::new();
        for dir in dirs {
            let prefix = dir.file_name().unwrap().to_string_lossy().to_lowercase();
            let mut names: Vec<String> = Vec::new();
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    let name = entry.file_name().to_string_lossy().to_string();
                    if name.bytes().all(|b| b.is_ascii_hexdigit()) {
                        names.push(name);
                    }
                }
            }
            names.sort();
            for name in names {
                results.push(Key::new(format!("{prefix}{name}")));
            }
        }

        Ok(Box::new(
            results
                .into_iter()
                .map(|r| r.map_err(|e| StoreError::InvalidKey(e.to_string()))),
        ))
    }
}

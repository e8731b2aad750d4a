use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::block::Block;
use crate::error::{LedgerError, LedgerResult};

/// The whole chain stored as one pretty-printed JSON array.
///
/// Every save rewrites the full document through a temporary file in the
/// same directory followed by an atomic rename, so readers see either the
/// previous or the new chain, never a partial write.
#[derive(Clone, Debug)]
pub struct ChainFile {
    path: PathBuf,
}

impl ChainFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the chain. A missing file is an empty chain.
    pub fn load(&self) -> LedgerResult<Vec<Block>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no chain file; starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(LedgerError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| LedgerError::CorruptChain {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Replace the persisted chain with `blocks`.
    pub fn save(&self, blocks: &[Block]) -> LedgerResult<()> {
        write_json_atomic(&self.path, &blocks)?;
        debug!(path = %self.path.display(), blocks = blocks.len(), "chain persisted");
        Ok(())
    }
}

/// Serialize `value` as pretty JSON and write it atomically to `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> LedgerResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| LedgerError::Serialization(e.to_string()))?;
    write_atomic(path, &bytes)
}

/// Write `contents` to a temporary file next to `path`, fsync it, and
/// rename it over `path`. Parent directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> LedgerResult<()> {
    let io_err = |source: io::Error| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use mediguard_crypto::GENESIS_PREV_HASH;
    use mediguard_types::{Payload, Timestamp};

    use super::*;

    fn sample_block(index: u64) -> Block {
        Block {
            index,
            timestamp: Timestamp::now(),
            data: Payload::from_value(serde_json::json!({ "n": index })),
            prev_hash: GENESIS_PREV_HASH.into(),
            merkle_root: None,
            hash: "ab".repeat(32),
            signature: "sig".into(),
        }
    }

    #[test]
    fn missing_file_is_empty_chain() {
        let dir = tempfile::tempdir().unwrap();
        let file = ChainFile::new(dir.path().join("chain.json"));
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let file = ChainFile::new(dir.path().join("chain.json"));
        let blocks = vec![sample_block(1), sample_block(2)];
        file.save(&blocks).unwrap();
        assert_eq!(file.load().unwrap(), blocks);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        fs::write(&path, b"[{\"index\": 1,").unwrap();
        let err = ChainFile::new(&path).load().unwrap_err();
        assert!(matches!(err, LedgerError::CorruptChain { .. }));
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let file = ChainFile::new(dir.path().join("chain.json"));
        file.save(&[sample_block(1)]).unwrap();
        file.save(&[sample_block(1), sample_block(2)]).unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.json");
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
    }
}

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use mediguard_crypto::{ContentHasher, SigningAuthority, GENESIS_PREV_HASH};
use mediguard_types::{Payload, Timestamp};

use crate::block::{Block, BlockContent};
use crate::error::{LedgerError, LedgerResult};
use crate::persist::ChainFile;
use crate::traits::{LedgerReader, LedgerWriter};
use crate::validation::{self, IntegrityReport};

/// Single-writer, append-only signed hash chain.
///
/// All access goes through one mutex scoped to the instance: appends hold it
/// across read, mutate, and persist, and readers take it to get a fully
/// committed view. Construct one per process and share it by `Arc`.
pub struct Ledger {
    authority: Arc<SigningAuthority>,
    file: Option<ChainFile>,
    chain: Mutex<Vec<Block>>,
}

impl Ledger {
    /// Open a persistent ledger, loading the existing chain if the file
    /// exists.
    pub fn open(path: impl AsRef<Path>, authority: Arc<SigningAuthority>) -> LedgerResult<Self> {
        let file = ChainFile::new(path.as_ref());
        let chain = file.load()?;
        info!(path = %file.path().display(), blocks = chain.len(), "ledger opened");
        Ok(Self {
            authority,
            file: Some(file),
            chain: Mutex::new(chain),
        })
    }

    /// A ledger that is never persisted, for tests and embedding.
    pub fn in_memory(authority: Arc<SigningAuthority>) -> Self {
        Self {
            authority,
            file: None,
            chain: Mutex::new(Vec::new()),
        }
    }

    /// Append a block carrying `data` and an optional Merkle root.
    ///
    /// The block is signed and the whole chain persisted before it becomes
    /// visible; if persisting fails the in-memory chain is left unchanged.
    /// A `merkle_root` must be a 64-character hex digest.
    pub fn append(&self, data: Payload, merkle_root: Option<String>) -> LedgerResult<Block> {
        if let Some(root) = merkle_root.as_deref() {
            if !ContentHasher::is_digest(root) {
                return Err(LedgerError::InvalidMerkleRoot(root.to_string()));
            }
        }

        let mut chain = self.lock()?;

        let prev_hash = chain
            .last()
            .map(|b| b.hash.clone())
            .unwrap_or_else(|| GENESIS_PREV_HASH.to_string());
        let index = chain.len() as u64 + 1;
        let timestamp = Timestamp::now();

        let hash = BlockContent {
            index,
            timestamp: &timestamp,
            data: &data,
            prev_hash: &prev_hash,
            merkle_root: merkle_root.as_deref(),
        }
        .hash()?;
        let signature = self.authority.sign(hash.as_bytes());

        let block = Block {
            index,
            timestamp,
            data,
            prev_hash,
            merkle_root,
            hash,
            signature,
        };

        chain.push(block.clone());
        if let Some(file) = &self.file {
            if let Err(e) = file.save(&chain) {
                chain.pop();
                return Err(e);
            }
        }

        debug!(index, hash = %block.short_hash(), "block appended");
        Ok(block)
    }

    /// Validate the whole chain, reporting every problem found.
    pub fn validate(&self) -> LedgerResult<IntegrityReport> {
        let chain = self.lock()?;
        let report = validation::validate_blocks(&chain, &self.authority);
        if report.is_valid {
            debug!(length = report.length, "chain validated");
        } else {
            warn!(
                length = report.length,
                errors = report.errors.len(),
                "chain integrity violations detected"
            );
        }
        Ok(report)
    }

    /// Copy of all blocks.
    pub fn snapshot(&self) -> LedgerResult<Vec<Block>> {
        Ok(self.lock()?.clone())
    }

    /// Block at 1-based `index`.
    pub fn get(&self, index: u64) -> LedgerResult<Option<Block>> {
        let chain = self.lock()?;
        let block = index
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| chain.get(i))
            .cloned();
        Ok(block)
    }

    /// The most recent block.
    pub fn head(&self) -> LedgerResult<Option<Block>> {
        Ok(self.lock()?.last().cloned())
    }

    pub fn len(&self) -> LedgerResult<u64> {
        Ok(self.lock()?.len() as u64)
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Re-read the persisted chain, discarding the in-memory copy. A no-op
    /// for in-memory ledgers.
    pub fn reload(&self) -> LedgerResult<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let mut chain = self.lock()?;
        *chain = file.load()?;
        debug!(blocks = chain.len(), "ledger reloaded");
        Ok(())
    }

    /// The authority that signs this ledger's blocks.
    pub fn authority(&self) -> &Arc<SigningAuthority> {
        &self.authority
    }

    /// Path of the chain file, if persistent.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(ChainFile::path)
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, Vec<Block>>> {
        self.chain.lock().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl LedgerWriter for Ledger {
    fn append(&self, data: Payload, merkle_root: Option<String>) -> LedgerResult<Block> {
        Ledger::append(self, data, merkle_root)
    }
}

impl LedgerReader for Ledger {
    fn get(&self, index: u64) -> LedgerResult<Option<Block>> {
        Ledger::get(self, index)
    }

    fn is_authentic(&self, block: &Block) -> bool {
        validation::verify_block(block, &self.authority)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("path", &self.path())
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::thread;

    use serde_json::{json, Value};

    use super::*;
    use crate::validation::ViolationKind;

    fn authority() -> Arc<SigningAuthority> {
        Arc::new(SigningAuthority::generate())
    }

    fn payload(value: Value) -> Payload {
        Payload::from_value(value)
    }

    #[test]
    fn first_block_uses_sentinel() {
        let ledger = Ledger::in_memory(authority());
        let a = ledger.append(payload(json!({"x": 1})), None).unwrap();
        assert_eq!(a.index, 1);
        assert_eq!(a.prev_hash, "0".repeat(64));
        assert!(a.merkle_root.is_none());
        assert_eq!(a.hash, a.compute_hash().unwrap());
        assert!(ledger.authority().verify(a.hash.as_bytes(), &a.signature));
    }

    #[test]
    fn blocks_link_to_predecessor() {
        let ledger = Ledger::in_memory(authority());
        let a = ledger.append(payload(json!({"x": 1})), None).unwrap();
        let b = ledger
            .append(payload(json!({"y": 2})), Some("ab".repeat(32)))
            .unwrap();
        assert_eq!(b.index, 2);
        assert_eq!(b.prev_hash, a.hash);
        assert_eq!(b.merkle_root.as_deref(), Some("ab".repeat(32).as_str()));
    }

    #[test]
    fn merkle_root_must_be_a_digest() {
        let ledger = Ledger::in_memory(authority());
        let not_hex = "z".repeat(64);
        for root in ["aéééééééé", "abc", not_hex.as_str()] {
            let err = ledger
                .append(payload(json!({})), Some(root.to_string()))
                .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidMerkleRoot(r) if r == root));
        }
        assert!(ledger.is_empty().unwrap());

        let ok = ledger.append(payload(json!({})), Some("AB".repeat(32))).unwrap();
        assert_eq!(ok.merkle_root, Some("AB".repeat(32)));
    }

    #[test]
    fn validate_reports_non_ascii_hash_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        let ledger = Ledger::open(&path, authority()).unwrap();
        ledger.append(payload(json!({"x": 1})), None).unwrap();

        let mut stored: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        stored[0]["hash"] = json!("aéééééééé");
        fs::write(&path, serde_json::to_vec(&stored).unwrap()).unwrap();
        ledger.reload().unwrap();

        let report = ledger.validate().unwrap();
        assert!(!report.is_valid);
        assert!(report
            .errors_for(1)
            .any(|e| e.kind == ViolationKind::HashMismatch));
        assert_eq!(ledger.head().unwrap().unwrap().short_hash(), "aéééééééé");
    }

    #[test]
    fn read_access() {
        let ledger = Ledger::in_memory(authority());
        assert!(ledger.is_empty().unwrap());
        assert!(ledger.head().unwrap().is_none());

        ledger.append(payload(json!(1)), None).unwrap();
        let second = ledger.append(payload(json!(2)), None).unwrap();

        assert_eq!(ledger.len().unwrap(), 2);
        assert_eq!(ledger.head().unwrap(), Some(second.clone()));
        assert_eq!(ledger.get(2).unwrap(), Some(second));
        assert!(ledger.get(0).unwrap().is_none());
        assert!(ledger.get(3).unwrap().is_none());
        assert_eq!(ledger.snapshot().unwrap().len(), 2);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let ledger = Ledger::in_memory(authority());
        ledger.append(payload(json!(1)), None).unwrap();
        let mut snap = ledger.snapshot().unwrap();
        snap[0].data = payload(json!("changed"));
        assert!(ledger.validate().unwrap().is_valid);
    }

    #[test]
    fn end_to_end_tamper_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blockchain.json");
        let ledger = Ledger::open(&path, authority()).unwrap();

        let a = ledger.append(payload(json!({"x": 1})), None).unwrap();
        assert_eq!(a.prev_hash, "0".repeat(64));
        assert_eq!(a.index, 1);
        let b = ledger.append(payload(json!({"x": 2})), None).unwrap();
        assert_eq!(b.prev_hash, a.hash);

        let report = ledger.validate().unwrap();
        assert_eq!(
            report,
            IntegrityReport {
                is_valid: true,
                length: 2,
                errors: vec![]
            }
        );

        // Corrupt B's data directly in the persisted store
        let mut stored: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        stored[1]["data"]["x"] = json!(999);
        fs::write(&path, serde_json::to_vec_pretty(&stored).unwrap()).unwrap();
        ledger.reload().unwrap();

        let report = ledger.validate().unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.length, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, 2);
        assert_eq!(report.errors[0].kind, ViolationKind::HashMismatch);
    }

    #[test]
    fn chain_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        let auth = authority();

        {
            let ledger = Ledger::open(&path, auth.clone()).unwrap();
            ledger.append(payload(json!({"x": 1})), None).unwrap();
            ledger.append(payload(json!({"x": 2})), None).unwrap();
        }

        let reopened = Ledger::open(&path, auth).unwrap();
        assert_eq!(reopened.len().unwrap(), 2);
        assert!(reopened.validate().unwrap().is_valid);
        let c = reopened.append(payload(json!({"x": 3})), None).unwrap();
        assert_eq!(c.index, 3);
    }

    #[test]
    fn different_authority_flags_every_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        {
            let ledger = Ledger::open(&path, authority()).unwrap();
            ledger.append(payload(json!(1)), None).unwrap();
            ledger.append(payload(json!(2)), None).unwrap();
        }
        let report = Ledger::open(&path, authority()).unwrap().validate().unwrap();
        assert!(!report.is_valid);
        assert!(report
            .errors
            .iter()
            .all(|e| e.kind == ViolationKind::InvalidSignature));
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn corrupt_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Ledger::open(&path, authority()),
            Err(LedgerError::CorruptChain { .. })
        ));
    }

    #[test]
    fn failed_persist_leaves_chain_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the chain file should be makes the rename fail
        let path = dir.path().join("chain.json");
        let ledger = Ledger::open(&path, authority()).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), b"x").unwrap();

        assert!(ledger.append(payload(json!(1)), None).is_err());
        assert_eq!(ledger.len().unwrap(), 0);
    }

    #[test]
    fn concurrent_appends_stay_contiguous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        let ledger = Arc::new(Ledger::open(&path, authority()).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for i in 0..5 {
                        ledger.append(payload(json!({"t": t, "i": i})), None).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(ledger.len().unwrap(), 20);
        assert!(ledger.validate().unwrap().is_valid);
        ledger.reload().unwrap();
        let report = ledger.validate().unwrap();
        assert!(report.is_valid);
        assert_eq!(report.length, 20);
    }
}

use serde::{Deserialize, Serialize};

use mediguard_crypto::{ChainFault, HashChainVerifier, SigningAuthority};

use crate::block::Block;

/// Result of chain validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub is_valid: bool,
    /// Total number of blocks, reported whether or not the chain is valid.
    pub length: u64,
    pub errors: Vec<IntegrityError>,
}

impl IntegrityReport {
    fn from_errors(length: u64, errors: Vec<IntegrityError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            length,
            errors,
        }
    }

    /// Errors recorded against a particular block.
    pub fn errors_for(&self, index: u64) -> impl Iterator<Item = &IntegrityError> {
        self.errors.iter().filter(move |e| e.index == index)
    }
}

/// A specific integrity problem detected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityError {
    pub index: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    IndexGap,
    InvalidPrevHash,
    HashMismatch,
    InvalidSignature,
}

impl IntegrityError {
    fn new(index: u64, kind: ViolationKind, detail: &str) -> Self {
        Self {
            index,
            kind,
            description: format!("Block {index}: {detail}"),
        }
    }
}

impl From<ChainFault> for IntegrityError {
    fn from(fault: ChainFault) -> Self {
        match fault {
            ChainFault::IndexGap { found, expected } => Self::new(
                found,
                ViolationKind::IndexGap,
                &format!("expected index {expected}"),
            ),
            ChainFault::InvalidPrevHash { index } => {
                Self::new(index, ViolationKind::InvalidPrevHash, "Invalid prev_hash")
            }
            ChainFault::HashMismatch { index } => {
                Self::new(index, ViolationKind::HashMismatch, "Hash mismatch")
            }
            ChainFault::Unhashable { index, reason } => Self::new(
                index,
                ViolationKind::HashMismatch,
                &format!("content cannot be hashed ({reason})"),
            ),
        }
    }
}

/// Validate a full chain, collecting every problem rather than stopping at
/// the first.
///
/// For each block: index contiguity, `prev_hash` linkage, recomputed content
/// hash, and the signature over the stored hash.
pub fn validate_blocks(blocks: &[Block], authority: &SigningAuthority) -> IntegrityReport {
    let mut errors: Vec<IntegrityError> = HashChainVerifier::check(blocks)
        .into_iter()
        .map(IntegrityError::from)
        .collect();

    for block in blocks {
        if !authority.verify(block.hash.as_bytes(), &block.signature) {
            errors.push(IntegrityError::new(
                block.index,
                ViolationKind::InvalidSignature,
                "Invalid signature",
            ));
        }
    }

    // Per-block order, as a single walk would produce it
    errors.sort_by_key(|e| e.index);
    IntegrityReport::from_errors(blocks.len() as u64, errors)
}

/// Check a single block in isolation: its stored hash matches its content
/// and its signature verifies. Linkage is not checked.
pub fn verify_block(block: &Block, authority: &SigningAuthority) -> bool {
    matches!(block.compute_hash(), Ok(h) if h == block.hash)
        && authority.verify(block.hash.as_bytes(), &block.signature)
}

#[cfg(test)]
mod tests {
    use mediguard_crypto::GENESIS_PREV_HASH;
    use mediguard_types::{Payload, Timestamp};
    use serde_json::json;

    use super::*;

    fn chain(authority: &SigningAuthority, n: u64) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();
        for index in 1..=n {
            let prev_hash = blocks
                .last()
                .map(|b| b.hash.clone())
                .unwrap_or_else(|| GENESIS_PREV_HASH.to_string());
            let mut block = Block {
                index,
                timestamp: Timestamp::now(),
                data: Payload::from_value(json!({ "n": index })),
                prev_hash,
                merkle_root: None,
                hash: String::new(),
                signature: String::new(),
            };
            block.hash = block.compute_hash().unwrap();
            block.signature = authority.sign(block.hash.as_bytes());
            blocks.push(block);
        }
        blocks
    }

    #[test]
    fn valid_chain_passes() {
        let authority = SigningAuthority::generate();
        let report = validate_blocks(&chain(&authority, 4), &authority);
        assert!(report.is_valid);
        assert_eq!(report.length, 4);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn empty_chain_is_valid() {
        let authority = SigningAuthority::generate();
        let report = validate_blocks(&[], &authority);
        assert!(report.is_valid);
        assert_eq!(report.length, 0);
    }

    #[test]
    fn broken_link_names_the_block() {
        let authority = SigningAuthority::generate();
        let mut blocks = chain(&authority, 3);
        // Re-hash and re-sign so only the linkage is wrong
        blocks[2].prev_hash = "1".repeat(64);
        blocks[2].hash = blocks[2].compute_hash().unwrap();
        blocks[2].signature = authority.sign(blocks[2].hash.as_bytes());

        let report = validate_blocks(&blocks, &authority);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, 3);
        assert_eq!(report.errors[0].kind, ViolationKind::InvalidPrevHash);
        assert_eq!(report.errors[0].description, "Block 3: Invalid prev_hash");
    }

    #[test]
    fn foreign_signature_is_reported() {
        let authority = SigningAuthority::generate();
        let other = SigningAuthority::generate();
        let mut blocks = chain(&authority, 2);
        blocks[0].signature = other.sign(blocks[0].hash.as_bytes());

        let report = validate_blocks(&blocks, &authority);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ViolationKind::InvalidSignature);
        assert_eq!(report.errors[0].index, 1);
    }

    #[test]
    fn report_all_not_fail_fast() {
        let authority = SigningAuthority::generate();
        let mut blocks = chain(&authority, 4);
        blocks[0].data = Payload::from_value(json!("tampered"));
        blocks[3].signature = "garbage".into();

        let report = validate_blocks(&blocks, &authority);
        assert!(!report.is_valid);
        assert_eq!(report.errors_for(1).count(), 1);
        assert_eq!(report.errors_for(4).count(), 1);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn verify_block_checks_hash_and_signature() {
        let authority = SigningAuthority::generate();
        let mut blocks = chain(&authority, 1);
        assert!(verify_block(&blocks[0], &authority));
        blocks[0].merkle_root = Some("00".repeat(32));
        assert!(!verify_block(&blocks[0], &authority));
    }
}

//! Cryptographic primitives for the MediGuard ledger.
//!
//! Provides SHA-256 content hashing over a canonical JSON encoding, binary
//! Merkle trees with directional inclusion proofs, Ed25519 signing with PEM
//! key persistence, HMAC-SHA256 integrity tokens, and report-all hash chain
//! checking.
//!
//! All crypto operations wrap established libraries.

pub mod canonical;
pub mod chain;
pub mod hasher;
pub mod keystore;
pub mod merkle;
pub mod signer;
pub mod token;

pub use canonical::{canonical_json, CanonicalError};
pub use chain::{ChainFault, ChainLink, HashChainVerifier, GENESIS_PREV_HASH};
pub use hasher::ContentHasher;
pub use keystore::{KeyPaths, KeyStoreError};
pub use merkle::{
    proof_from_levels, verify_proof, Direction, MerkleError, MerkleProof, MerkleTree, ProofStep,
};
pub use signer::{SignatureError, SigningAuthority, VerifyingKey};
pub use token::{constant_time_eq, HmacKey};
pub use secrecy::SecretString;

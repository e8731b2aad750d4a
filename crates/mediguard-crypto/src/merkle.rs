use serde::{Deserialize, Serialize};

use crate::hasher::ContentHasher;

/// Side a sibling occupies when recombining with the current node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

/// One step of an inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    /// Sibling node hash at this level.
    pub hash: String,
    /// Which side the sibling sits on.
    pub direction: Direction,
}

/// Errors from Merkle tree operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree from zero leaves")]
    EmptyTree,

    #[error("leaf index {index} out of bounds for {leaf_count} leaves")]
    IndexOutOfBounds { index: usize, leaf_count: usize },
}

/// Binary Merkle tree over an ordered list of leaf strings.
///
/// Leaves are used as given: the caller decides whether they are raw content
/// or pre-hashed digests, and must make the same choice when verifying.
/// Parent nodes are `hex(SHA256(left + right))` over the two child strings
/// with no separator. An odd node at the end of a level is paired with
/// itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    /// Level 0 = leaves, last level = `[root]`.
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    /// Build a tree from leaves. Zero leaves is an error; a single leaf is
    /// its own root.
    pub fn build(leaves: Vec<String>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTree);
        }

        let mut levels = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let next: Vec<String> = current
                .chunks(2)
                .map(|pair| {
                    if pair.len() == 2 {
                        hash_pair(&pair[0], &pair[1])
                    } else {
                        // Odd node: hash with itself
                        hash_pair(&pair[0], &pair[0])
                    }
                })
                .collect();
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Convenience constructor from string slices.
    pub fn from_strs(leaves: &[&str]) -> Result<Self, MerkleError> {
        Self::build(leaves.iter().map(|s| s.to_string()).collect())
    }

    /// The root hash.
    pub fn root(&self) -> &str {
        &self.levels[self.levels.len() - 1][0]
    }

    /// All levels, leaves first.
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// Original leaves.
    pub fn leaves(&self) -> &[String] {
        &self.levels[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        proof_from_levels(&self.levels, index)
    }
}

/// Build an inclusion proof directly from a tree's levels.
pub fn proof_from_levels(levels: &[Vec<String>], index: usize) -> Result<MerkleProof, MerkleError> {
    let leaf_count = levels.first().map(Vec::len).unwrap_or(0);
    if index >= leaf_count {
        return Err(MerkleError::IndexOutOfBounds { index, leaf_count });
    }

    let mut steps = Vec::with_capacity(levels.len().saturating_sub(1));
    let mut idx = index;

    for level in &levels[..levels.len() - 1] {
        let is_left = idx % 2 == 0;
        let sibling_idx = if is_left { idx + 1 } else { idx - 1 };
        let step = if sibling_idx < level.len() {
            ProofStep {
                hash: level[sibling_idx].clone(),
                direction: if is_left {
                    Direction::Right
                } else {
                    Direction::Left
                },
            }
        } else {
            // Duplicated odd node: self is the left operand
            ProofStep {
                hash: level[idx].clone(),
                direction: Direction::Right,
            }
        };
        steps.push(step);
        idx /= 2;
    }

    Ok(MerkleProof(steps))
}

/// Merkle inclusion proof: sibling steps ordered from the leaf level up.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerkleProof(pub Vec<ProofStep>);

impl MerkleProof {
    /// Replay the steps from `leaf` and compare the result to `root`.
    pub fn verify(&self, leaf: &str, root: &str) -> bool {
        let mut current = leaf.to_string();
        for step in &self.0 {
            current = match step.direction {
                Direction::Right => hash_pair(&current, &step.hash),
                Direction::Left => hash_pair(&step.hash, &current),
            };
        }
        current == root
    }

    pub fn steps(&self) -> &[ProofStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Verify that `leaf` is committed under `root` by `proof`.
pub fn verify_proof(leaf: &str, proof: &MerkleProof, root: &str) -> bool {
    proof.verify(leaf, root)
}

fn hash_pair(left: &str, right: &str) -> String {
    let mut combined = String::with_capacity(left.len() + right.len());
    combined.push_str(left);
    combined.push_str(right);
    ContentHasher::hash(combined.as_bytes())
}

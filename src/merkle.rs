//! Merkle allowlist over user identifiers.
//!
//! Leaves are `keccak256(user_id)`. Each parent is the Keccak-256 of its two
//! children in ascending byte order, so a proof is just the list of siblings
//! and Solidity's `MerkleProof.verify` accepts it unchanged. An unpaired node
//! at the end of a level is promoted as is.

use crate::types::UserId;
use crate::utils::keccak256;
use anyhow::Result;
use std::fmt;

/// A Merkle proof for leaf inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf: [u8; 32],
    pub root: [u8; 32],
    pub siblings: Vec<[u8; 32]>,
    pub index: usize,
}

/// A sorted-pair Keccak Merkle tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    pub root: [u8; 32],
    pub leaves: Vec<[u8; 32]>,
}

pub(crate) fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(low);
    data[32..].copy_from_slice(high);
    keccak256(&data)
}

fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            _ => pair[0],
        })
        .collect()
}

/// Leaf for a user id.
#[must_use]
pub fn leaf_for(id: &UserId) -> [u8; 32] {
    keccak256(id.as_bytes())
}

/// Folds `proof` into `leaf` and compares with `root`.
#[must_use]
pub fn verify_sorted_proof(leaf: [u8; 32], proof: &[[u8; 32]], root: [u8; 32]) -> bool {
    proof
        .iter()
        .fold(leaf, |current, sibling| hash_pair(&current, sibling))
        == root
}

impl MerkleTree {
    /// Builds the tree over already-hashed leaves.
    ///
    /// # Errors
    /// Returns an error when `leaves` is empty.
    pub fn new(leaves: Vec<[u8; 32]>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(anyhow::anyhow!(
                "Cannot build a Merkle tree without leaves"
            ));
        }

        let mut level = leaves.clone();
        while level.len() > 1 {
            level = next_level(&level);
        }

        Ok(MerkleTree {
            root: level[0],
            leaves,
        })
    }

    pub fn from_user_ids(ids: &[UserId]) -> Result<Self> {
        Self::new(ids.iter().map(leaf_for).collect())
    }

    /// Generate a Merkle proof for a leaf at the given index.
    ///
    /// Returns `None` for an out-of-range index.
    pub fn generate_proof(&self, leaf_index: usize) -> Option<MerkleProof> {
        if leaf_index >= self.leaves.len() {
            return None;
        }

        let mut siblings = Vec::new();
        let mut level = self.leaves.clone();
        let mut index = leaf_index;

        while level.len() > 1 {
            let sibling_index = index ^ 1;
            if sibling_index < level.len() {
                siblings.push(level[sibling_index]);
            }
            level = next_level(&level);
            index /= 2;
        }

        Some(MerkleProof {
            leaf: self.leaves[leaf_index],
            root: self.root,
            siblings,
            index: leaf_index,
        })
    }

    /// Proof for the first leaf belonging to `id`, if it is in the tree.
    pub fn proof_for_user(&self, id: &UserId) -> Option<MerkleProof> {
        let leaf = leaf_for(id);
        let index = self.leaves.iter().position(|candidate| *candidate == leaf)?;
        self.generate_proof(index)
    }

    /// Verify a Merkle proof against this tree's root.
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        proof.root == self.root && verify_sorted_proof(proof.leaf, &proof.siblings, self.root)
    }

    #[must_use]
    pub fn root_hex(&self) -> String {
        format!("0x{}", hex::encode(self.root))
    }
}

impl MerkleProof {
    /// Siblings as `0x`-prefixed hex, the `bytes32[]` a contract expects.
    #[must_use]
    pub fn siblings_hex(&self) -> Vec<String> {
        self.siblings
            .iter()
            .map(|sibling| format!("0x{}", hex::encode(sibling)))
            .collect()
    }
}

impl fmt::Display for MerkleProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MerkleProof:\n  Leaf: 0x{}\n  Root: 0x{}\n  Index: {}\n  Siblings: {}",
            hex::encode(self.leaf),
            hex::encode(self.root),
            self.index,
            self.siblings.len()
        )
    }
}

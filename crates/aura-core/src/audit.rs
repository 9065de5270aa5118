// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

//! Append-only Merkle audit chain.
//!
//! Hashing follows RFC 6962: `leaf_hash(d) = SHA256(0x00 || d)`,
//! `node_hash(l, r) = SHA256(0x01 || l || r)`, and the tree over n > 1
//! leaves splits at the largest power of two strictly less than n. An
//! unpaired subtree is carried up unhashed, never paired with itself. The
//! root of the empty chain is `SHA256("")`.
//!
//! The chain is backed by a single append-only file of length-prefixed
//! records; leaf hashes and byte offsets are rebuilt on open. A leaf covers
//! the pair (event_hash, result_hash), so a verifier holding a certificate
//! can recompute it without the raw record bytes.

use crate::canonical::{canonical_json, sha256};
use crate::error::{AuraError, AuraResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub type Hash32 = [u8; 32];

pub fn leaf_hash(data: &[u8]) -> Hash32 {
    let mut buf = Vec::with_capacity(1 + data.len());
    buf.push(0u8);
    buf.extend_from_slice(data);
    sha256(&buf)
}

pub fn node_hash(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut buf = [0u8; 65];
    buf[0] = 1;
    buf[1..33].copy_from_slice(left);
    buf[33..65].copy_from_slice(right);
    sha256(&buf)
}

/// Leaf over a committed record: `leaf_hash(event_hash || result_hash)`.
pub fn record_leaf_hash(event_hash: &Hash32, result_hash: &Hash32) -> Hash32 {
    let mut material = [0u8; 64];
    material[..32].copy_from_slice(event_hash);
    material[32..].copy_from_slice(result_hash);
    leaf_hash(&material)
}

/// Marker result hash for administrative records that carry no score.
pub fn empty_result_hash() -> Hash32 {
    sha256(b"")
}

fn largest_power_of_two_less_than(n: usize) -> usize {
    debug_assert!(n > 1);
    1usize << (usize::BITS - 1 - (n - 1).leading_zeros())
}

pub fn merkle_root(leaves: &[Hash32]) -> Hash32 {
    match leaves.len() {
        0 => sha256(b""),
        1 => leaves[0],
        n => {
            let k = largest_power_of_two_less_than(n);
            let left = merkle_root(&leaves[..k]);
            let right = merkle_root(&leaves[k..]);
            node_hash(&left, &right)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Hash32,
    pub side: Side,
}

/// Inclusion proof: sibling path ordered leaf to root, each step tagged with
/// the side the sibling occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: u64,
    pub tree_size: u64,
    pub path: Vec<ProofStep>,
}

fn inclusion_path(leaves: &[Hash32], leaf_index: usize) -> Vec<ProofStep> {
    if leaves.len() <= 1 {
        return Vec::new();
    }
    let k = largest_power_of_two_less_than(leaves.len());
    if leaf_index < k {
        let mut p = inclusion_path(&leaves[..k], leaf_index);
        p.push(ProofStep {
            sibling: merkle_root(&leaves[k..]),
            side: Side::Right,
        });
        p
    } else {
        let mut p = inclusion_path(&leaves[k..], leaf_index - k);
        p.push(ProofStep {
            sibling: merkle_root(&leaves[..k]),
            side: Side::Left,
        });
        p
    }
}

pub fn inclusion_proof_at(
    leaves: &[Hash32],
    leaf_index: usize,
    tree_size: usize,
) -> AuraResult<MerkleProof> {
    if tree_size == 0 || tree_size > leaves.len() || leaf_index >= tree_size {
        return Err(AuraError::IndexOutOfRange {
            index: leaf_index as u64,
            tree_size: tree_size as u64,
        });
    }
    Ok(MerkleProof {
        leaf_index: leaf_index as u64,
        tree_size: tree_size as u64,
        path: inclusion_path(&leaves[..tree_size], leaf_index),
    })
}

/// Pure verification: folds the tagged sibling path from the leaf up and
/// compares the result with the claimed root. Needs none of the chain's
/// internals; tampered input yields `false`, never an error.
pub fn verify_inclusion_proof(leaf: &Hash32, proof: &MerkleProof, root: &Hash32) -> bool {
    if proof.tree_size == 0 || proof.leaf_index >= proof.tree_size {
        return false;
    }
    let mut acc = *leaf;
    for step in &proof.path {
        acc = match step.side {
            Side::Left => node_hash(&step.sibling, &acc),
            Side::Right => node_hash(&acc, &step.sibling),
        };
    }
    &acc == root
}

/// One durable record in the chain: the two digests that form the leaf plus
/// an opaque payload kept for audit replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainRecord {
    pub schema: String,
    pub event_hash: String,
    pub result_hash: String,
    pub entry: Value,
}

pub const CHAIN_RECORD_SCHEMA: &str = "aura.v1.chain_record";

impl ChainRecord {
    pub fn new(event_hash: &Hash32, result_hash: &Hash32, entry: Value) -> Self {
        Self {
            schema: CHAIN_RECORD_SCHEMA.to_string(),
            event_hash: hex::encode(event_hash),
            result_hash: hex::encode(result_hash),
            entry,
        }
    }

    fn leaf(&self) -> AuraResult<Hash32> {
        let eh = decode_hash(&self.event_hash)?;
        let rh = decode_hash(&self.result_hash)?;
        Ok(record_leaf_hash(&eh, &rh))
    }
}

fn decode_hash(hex_digest: &str) -> AuraResult<Hash32> {
    let bytes = hex::decode(hex_digest)
        .map_err(|_| AuraError::InvalidArgument("digest is not valid hex"))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| AuraError::InvalidArgument("digest must be 32 bytes"))
}

#[derive(Debug, Clone, Copy)]
pub struct AppendReceipt {
    pub leaf_index: u64,
    pub leaf_hash: Hash32,
    pub root: Hash32,
}

/// File-backed append-only chain. `append` is the only mutating operation;
/// existing leaves are never renumbered or rehashed.
#[derive(Debug)]
pub struct AuditChain {
    path: PathBuf,
    file: File,
    leaves: Vec<Hash32>,
    offsets: Vec<u64>,
}

impl AuditChain {
    pub fn open_or_create(path: impl AsRef<Path>) -> AuraResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let mut leaves = Vec::new();
        let mut offsets = Vec::new();
        let mut pos = 0u64;
        let mut reader = BufReader::new(OpenOptions::new().read(true).open(&path)?);
        loop {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let len = u32::from_le_bytes(len_bytes) as usize;
            let mut data = vec![0u8; len];
            reader.read_exact(&mut data)?;
            let record: ChainRecord = serde_json::from_slice(&data)?;
            leaves.push(record.leaf()?);
            offsets.push(pos);
            pos = pos.saturating_add(4 + len as u64);
        }
        Ok(Self {
            path,
            file,
            leaves,
            offsets,
        })
    }

    /// Appends a record and returns its committed index, leaf hash, and the
    /// extended root. Either the record is fully durable and indexed, or the
    /// error leaves the in-memory tree untouched.
    pub fn append(
        &mut self,
        event_hash: &Hash32,
        result_hash: &Hash32,
        entry: Value,
    ) -> AuraResult<AppendReceipt> {
        let record = ChainRecord::new(event_hash, result_hash, entry);
        let data = canonical_json(&record)?;
        let len = u32::try_from(data.len())
            .map_err(|_| AuraError::InvalidArgument("chain record exceeds u32 length"))?;
        let start = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&data)?;
        self.file.flush()?;
        let leaf = record_leaf_hash(event_hash, result_hash);
        let leaf_index = self.leaves.len() as u64;
        self.offsets.push(start);
        self.leaves.push(leaf);
        Ok(AppendReceipt {
            leaf_index,
            leaf_hash: leaf,
            root: self.root_hash(),
        })
    }

    pub fn tree_size(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn root_hash(&self) -> Hash32 {
        merkle_root(&self.leaves)
    }

    /// Root over the first `tree_size` leaves only; the root at any size is
    /// a pure function of that leaf prefix.
    pub fn root_at_size(&self, tree_size: u64) -> AuraResult<Hash32> {
        if tree_size > self.tree_size() {
            return Err(AuraError::IndexOutOfRange {
                index: tree_size,
                tree_size: self.tree_size(),
            });
        }
        Ok(merkle_root(&self.leaves[..tree_size as usize]))
    }

    pub fn root_hex(&self) -> String {
        hex::encode(self.root_hash())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn inclusion_proof(&self, leaf_index: u64) -> AuraResult<MerkleProof> {
        inclusion_proof_at(&self.leaves, leaf_index as usize, self.leaves.len())
    }

    pub fn inclusion_proof_at_size(
        &self,
        leaf_index: u64,
        tree_size: u64,
    ) -> AuraResult<MerkleProof> {
        inclusion_proof_at(&self.leaves, leaf_index as usize, tree_size as usize)
    }

    pub fn leaf_hash_at(&self, leaf_index: u64) -> AuraResult<Hash32> {
        self.leaves
            .get(leaf_index as usize)
            .copied()
            .ok_or(AuraError::IndexOutOfRange {
                index: leaf_index,
                tree_size: self.tree_size(),
            })
    }

    pub fn read_record(&self, leaf_index: u64) -> AuraResult<ChainRecord> {
        let start = *self
            .offsets
            .get(leaf_index as usize)
            .ok_or(AuraError::IndexOutOfRange {
                index: leaf_index,
                tree_size: self.tree_size(),
            })?;
        let mut f = OpenOptions::new().read(true).open(&self.path)?;
        f.seek(SeekFrom::Start(start))?;
        let mut len_bytes = [0u8; 4];
        f.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        let mut data = vec![0u8; len];
        f.read_exact(&mut data)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

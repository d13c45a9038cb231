//! # Merkle Mountain Range (MMR)
//!
//! The append-only accumulator behind every ledger `merkle_root`. Each
//! ledger entry contributes one leaf; the root after appending entry `i`
//! commits to entries `0..=i` and nothing else.
//!
//! ## Algorithm
//!
//! Domain-separated SHA-256:
//! - Leaf: `SHA256(0x00 || leaf_digest)`.
//! - Node: `SHA256(0x01 || left || right)`.
//!
//! Peaks are kept as a stack of perfect subtrees and merged whenever two
//! neighbours have equal height. The root bags peaks right-to-left:
//! `bag = peaks[-1]; for p in rev(peaks[..-1]): bag = node(p, bag)`.
//!
//! Hashes are held as raw 32-byte digests, so `append` cannot fail.

use concord_core::{ContentDigest, DigestAlgorithm};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors building MMR proofs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MmrError {
    #[error("leaf index {index} out of range for an MMR of {size} leaves")]
    LeafOutOfRange { index: usize, size: usize },
}

fn sha256_parts(parts: &[&[u8]]) -> ContentDigest {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    ContentDigest::new(DigestAlgorithm::Sha256, hasher.finalize().into())
}

/// `SHA256(0x00 || leaf)`.
pub fn leaf_hash(leaf: &ContentDigest) -> ContentDigest {
    sha256_parts(&[&[0x00], leaf.as_bytes()])
}

/// `SHA256(0x01 || left || right)`.
pub fn node_hash(left: &ContentDigest, right: &ContentDigest) -> ContentDigest {
    sha256_parts(&[&[0x01], left.as_bytes(), right.as_bytes()])
}

/// Root of a perfect subtree of `2^height` leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peak {
    pub height: u32,
    pub hash: ContentDigest,
}

fn bag_peaks(peaks: &[Peak]) -> Option<ContentDigest> {
    let (last, rest) = peaks.split_last()?;
    Some(rest.iter().rev().fold(last.hash, |bag, p| node_hash(&p.hash, &bag)))
}

/// `(height, leaf_count)` of each peak, left to right, for `size` leaves.
fn peak_plan(size: usize) -> Vec<(u32, usize)> {
    let mut out = Vec::new();
    let mut n = size;
    while n > 0 {
        let h = usize::BITS - n.leading_zeros() - 1;
        let cnt = 1usize << h;
        out.push((h, cnt));
        n -= cnt;
    }
    out
}

/// `(peak_index, first_leaf_of_peak, peak_height)` for a leaf.
fn locate_leaf(size: usize, leaf_index: usize) -> Option<(usize, usize, u32)> {
    let mut start = 0usize;
    for (i, (h, cnt)) in peak_plan(size).into_iter().enumerate() {
        if leaf_index < start + cnt {
            return Some((i, start, h));
        }
        start += cnt;
    }
    None
}

/// Which side of the running hash a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub side: Side,
    pub hash: ContentDigest,
}

/// Proof that `leaf` is the `leaf_index`-th leaf of an MMR whose bagged
/// root is `root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub size: usize,
    pub root: ContentDigest,
    pub leaf_index: usize,
    /// The digest that was appended (before leaf hashing).
    pub leaf: ContentDigest,
    pub peak_index: usize,
    pub path: Vec<PathStep>,
    pub peaks: Vec<Peak>,
}

/// Check an inclusion proof for internal consistency against its own
/// `root`. Callers compare `proof.root` with a root they trust.
///
/// Malformed proofs yield `false`, never an error.
pub fn verify_inclusion_proof(proof: &InclusionProof) -> bool {
    if proof.leaf_index >= proof.size {
        return false;
    }
    let Some((peak_index, start, height)) = locate_leaf(proof.size, proof.leaf_index) else {
        return false;
    };
    if peak_index != proof.peak_index || proof.path.len() != height as usize {
        return false;
    }
    let plan = peak_plan(proof.size);
    if plan.len() != proof.peaks.len()
        || plan.iter().zip(&proof.peaks).any(|((h, _), p)| *h != p.height)
    {
        return false;
    }

    let mut pos = proof.leaf_index - start;
    let mut cur = leaf_hash(&proof.leaf);
    for step in &proof.path {
        let expected = if pos & 1 == 1 { Side::Left } else { Side::Right };
        if step.side != expected {
            return false;
        }
        cur = match step.side {
            Side::Left => node_hash(&step.hash, &cur),
            Side::Right => node_hash(&cur, &step.hash),
        };
        pos >>= 1;
    }

    let mut peaks = proof.peaks.clone();
    peaks[peak_index].hash = cur;
    bag_peaks(&peaks) == Some(proof.root)
}

/// Incremental MMR over 32-byte leaf digests.
#[derive(Debug, Clone, Default)]
pub struct MerkleMountainRange {
    peaks: Vec<Peak>,
    leaves: Vec<ContentDigest>,
    leaf_hashes: Vec<ContentDigest>,
}

impl MerkleMountainRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// Bagged root, or `None` for an empty range.
    pub fn root(&self) -> Option<ContentDigest> {
        bag_peaks(&self.peaks)
    }

    /// Append a leaf digest and return its leaf hash.
    pub fn append(&mut self, leaf: &ContentDigest) -> ContentDigest {
        let lh = leaf_hash(leaf);
        self.leaves.push(*leaf);
        self.leaf_hashes.push(lh);

        let mut cur = Peak { height: 0, hash: lh };
        while let Some(top) = self.peaks.last() {
            if top.height != cur.height {
                break;
            }
            let left = top.hash;
            self.peaks.pop();
            cur = Peak { height: cur.height + 1, hash: node_hash(&left, &cur.hash) };
        }
        self.peaks.push(cur);
        lh
    }

    /// Root that results from appending `leaf`, without mutating.
    pub fn root_with(&self, leaf: &ContentDigest) -> ContentDigest {
        let mut peaks = self.peaks.clone();
        let mut cur = Peak { height: 0, hash: leaf_hash(leaf) };
        while let Some(top) = peaks.last() {
            if top.height != cur.height {
                break;
            }
            let left = top.hash;
            peaks.pop();
            cur = Peak { height: cur.height + 1, hash: node_hash(&left, &cur.hash) };
        }
        let hash = cur.hash;
        peaks.push(cur);
        // Non-empty after the push.
        bag_peaks(&peaks).unwrap_or(hash)
    }

    /// Build an inclusion proof for `leaf_index` against the current root.
    pub fn inclusion_proof(&self, leaf_index: usize) -> Result<InclusionProof, MmrError> {
        let size = self.leaves.len();
        let out_of_range = MmrError::LeafOutOfRange { index: leaf_index, size };
        let (peak_index, start, height) = locate_leaf(size, leaf_index).ok_or(out_of_range.clone())?;
        let root = self.root().ok_or(out_of_range)?;

        let mut level: Vec<ContentDigest> =
            self.leaf_hashes[start..start + (1usize << height)].to_vec();
        let mut pos = leaf_index - start;
        let mut path = Vec::with_capacity(height as usize);
        while level.len() > 1 {
            let sibling = pos ^ 1;
            path.push(PathStep {
                side: if sibling < pos { Side::Left } else { Side::Right },
                hash: level[sibling],
            });
            level = level.chunks(2).map(|pair| node_hash(&pair[0], &pair[1])).collect();
            pos /= 2;
        }

        Ok(InclusionProof {
            size,
            root,
            leaf_index,
            leaf: self.leaves[leaf_index],
            peak_index,
            path,
            peaks: self.peaks.clone(),
        })
    }
}

//! Proof-carrying Merkle tree over ordered, opaque 64-hex-char leaves.
//!
//! Odd levels duplicate the last node rather than promoting it unchanged —
//! this is load-bearing for wire compatibility with other implementations of
//! the same ticket format, not a stylistic choice.

use serde::{Deserialize, Serialize};

use crate::crypto::sha256_hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub leaf: String,
    pub siblings: Vec<String>,
    pub flags: Vec<Flag>,
}

impl Proof {
    /// Recomputes the accumulator from `self.leaf` through `self.siblings`
    /// and compares it to `root`.
    pub fn verify(&self, root: &str) -> bool {
        if self.siblings.len() != self.flags.len() {
            return false;
        }
        let mut acc = self.leaf.clone();
        for (sib, flag) in self.siblings.iter().zip(self.flags.iter()) {
            acc = match flag {
                Flag::Left => combine(&acc, sib),
                Flag::Right => combine(sib, &acc),
            };
        }
        acc == root
    }
}

fn combine(left: &str, right: &str) -> String {
    sha256_hex(&format!("{left}{right}"))
}

/// Reduces one Merkle level to the next, duplicating a trailing odd leaf.
fn reduce_level(level: &[String]) -> Vec<String> {
    let mut padded = level.to_vec();
    if padded.len() % 2 == 1 {
        padded.push(padded.last().unwrap().clone());
    }
    padded
        .chunks_exact(2)
        .map(|pair| combine(&pair[0], &pair[1]))
        .collect()
}

/// Computes the Merkle root over `leaves`. Empty input yields `""`.
pub fn merkle_root(leaves: &[String]) -> String {
    if leaves.is_empty() {
        return String::new();
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = reduce_level(&level);
    }
    level.into_iter().next().unwrap_or_default()
}

/// Builds one inclusion proof per leaf index, in leaf order.
pub fn build_proofs(leaves: &[String]) -> Vec<Proof> {
    if leaves.is_empty() {
        return Vec::new();
    }
    if leaves.len() == 1 {
        return vec![Proof {
            leaf: leaves[0].clone(),
            siblings: Vec::new(),
            flags: Vec::new(),
        }];
    }

    let mut siblings: Vec<Vec<String>> = vec![Vec::new(); leaves.len()];
    let mut flags: Vec<Vec<Flag>> = vec![Vec::new(); leaves.len()];

    // `groups[i]` holds the set of original leaf indices whose root-ward
    // path currently passes through accumulator position `i`.
    let mut level = leaves.to_vec();
    let mut groups: Vec<Vec<usize>> = (0..leaves.len()).map(|i| vec![i]).collect();

    while level.len() > 1 {
        let mut padded_level = level.clone();
        let mut padded_groups = groups.clone();
        let mut is_duplicate = vec![false; padded_level.len()];
        if padded_level.len() % 2 == 1 {
            padded_level.push(level.last().unwrap().clone());
            padded_groups.push(groups.last().unwrap().clone());
            is_duplicate.push(true);
        }

        let mut next_level = Vec::with_capacity(padded_level.len() / 2);
        let mut next_groups = Vec::with_capacity(next_level.capacity());

        let mut i = 0;
        while i < padded_level.len() {
            let left = &padded_level[i];
            let right = &padded_level[i + 1];
            let left_group = &padded_groups[i];
            let right_group = &padded_groups[i + 1];
            // Odd-leaf duplication: `right` is a synthetic copy of `left`,
            // so every leaf under it gets exactly one (sibling, flag) entry
            // for this level, not two.
            let self_paired = is_duplicate[i + 1];

            for &leaf_idx in left_group {
                siblings[leaf_idx].push(right.clone());
                flags[leaf_idx].push(Flag::Left);
            }
            if !self_paired {
                for &leaf_idx in right_group {
                    siblings[leaf_idx].push(left.clone());
                    flags[leaf_idx].push(Flag::Right);
                }
            }

            next_level.push(combine(left, right));
            let mut merged_group = left_group.clone();
            if !self_paired {
                merged_group.extend(right_group.iter().copied());
            }
            next_groups.push(merged_group);

            i += 2;
        }

        level = next_level;
        groups = next_groups;
    }

    leaves
        .iter()
        .enumerate()
        .map(|(i, leaf)| Proof {
            leaf: leaf.clone(),
            siblings: siblings[i].clone(),
            flags: flags[i].clone(),
        })
        .collect()
}

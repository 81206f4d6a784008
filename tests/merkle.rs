//! Black-box fixtures straight from the Merkle engine's worked example:
//! four leaves, odd-leaf duplication, and determinism across repeated runs.

use symbi_ticket::crypto::sha256_hex;
use symbi_ticket::merkle::{build_proofs, merkle_root};

fn hex(s: &str) -> String {
    sha256_hex(s)
}

#[test]
fn four_leaf_happy_path_matches_the_worked_example() {
    let leaves = vec![hex("a"), hex("b"), hex("c"), hex("d")];
    let expected = sha256_hex(&format!(
        "{}{}",
        sha256_hex(&format!("{}{}", leaves[0], leaves[1])),
        sha256_hex(&format!("{}{}", leaves[2], leaves[3]))
    ));
    assert_eq!(merkle_root(&leaves), expected);

    let proofs = build_proofs(&leaves);
    assert_eq!(proofs.len(), 4);
    for proof in &proofs {
        assert!(proof.verify(&merkle_root(&leaves)));
    }
}

#[test]
fn three_leaf_root_duplicates_the_trailing_leaf() {
    let leaves = vec![hex("a"), hex("b"), hex("c")];
    let expected = sha256_hex(&format!(
        "{}{}",
        sha256_hex(&format!("{}{}", leaves[0], leaves[1])),
        sha256_hex(&format!("{}{}", leaves[2], leaves[2]))
    ));
    assert_eq!(merkle_root(&leaves), expected);
}

#[test]
fn merkle_root_is_deterministic_across_repeated_calls() {
    let leaves = vec![hex("a"), hex("b"), hex("c"), hex("d"), hex("e")];
    assert_eq!(merkle_root(&leaves), merkle_root(&leaves));
    assert_eq!(build_proofs(&leaves), build_proofs(&leaves));
}

#[test]
fn mutating_a_sibling_or_flipping_a_flag_fails_verification() {
    let leaves = vec![hex("a"), hex("b"), hex("c"), hex("d")];
    let root = merkle_root(&leaves);

    let mut tampered_sibling = build_proofs(&leaves);
    tampered_sibling[0].siblings[0] = hex("z");
    assert!(!tampered_sibling[0].verify(&root));

    let mut tampered_flag = build_proofs(&leaves);
    tampered_flag[1].flags[0] = match tampered_flag[1].flags[0] {
        symbi_ticket::merkle::Flag::Left => symbi_ticket::merkle::Flag::Right,
        symbi_ticket::merkle::Flag::Right => symbi_ticket::merkle::Flag::Left,
    };
    assert!(!tampered_flag[1].verify(&root));
}

#[test]
fn reordering_leaves_changes_the_root() {
    let original = vec![hex("a"), hex("b"), hex("c"), hex("d")];
    let mut reordered = original.clone();
    reordered.swap(1, 2);
    assert_ne!(merkle_root(&original), merkle_root(&reordered));
}

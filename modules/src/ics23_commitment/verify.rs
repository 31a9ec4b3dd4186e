//! Stateless verification of ICS-23 existence and non-existence proofs.
//!
//! The hashing, the spec conformance checks (leaf and inner op shapes, IAVL prefixes, depth
//! bounds) and the neighbour checks of non-existence proofs are done by the `ics23` crate.
//! On top of it this module rejects compressed proofs, non-SHA-256 hash ops and proofs deeper
//! than [`MAX_PROOF_DEPTH`], and reports a typed reason for every failure.

use ics23::commitment_proof::Proof;
use ics23::{
    batch_entry, calculate_existence_root, CommitmentProof, ExistenceProof, HashOp,
    HostFunctionsManager, NonExistenceProof, ProofSpec,
};

use crate::ics23_commitment::error::{Error, Kind};

/// Hard cap on the number of inner operations in a proof, regardless of the spec's own
/// `max_depth`.
pub const MAX_PROOF_DEPTH: usize = 128;

/// One claim of a batch: `value` is `Some` for membership and `None` for non-membership.
#[derive(Clone, Debug)]
pub struct BatchItem {
    pub proof: CommitmentProof,
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
}

/// Verifies that `key` maps to `value` under `root`.
///
/// The proof may be a single existence proof or a batch containing one for `key`.
pub fn verify_membership(
    spec: &ProofSpec,
    root: &[u8],
    proof: &CommitmentProof,
    key: &[u8],
    value: &[u8],
) -> Result<(), Error> {
    let existence = existence_proof_for(proof, key)?;
    verify_existence(spec, root, existence, key, value)
}

/// Verifies that `key` is absent under `root`.
pub fn verify_non_membership(
    spec: &ProofSpec,
    root: &[u8],
    proof: &CommitmentProof,
    key: &[u8],
) -> Result<(), Error> {
    let non_existence = non_existence_proof_for(proof, key)?;
    verify_non_existence(spec, root, non_existence, key)
}

/// Verifies independent claims against the same root. One failing item does not affect the
/// outcome of the others.
pub fn verify_batch(spec: &ProofSpec, root: &[u8], items: &[BatchItem]) -> Vec<bool> {
    items
        .iter()
        .map(|item| {
            let outcome = match &item.value {
                Some(value) => verify_membership(spec, root, &item.proof, &item.key, value),
                None => verify_non_membership(spec, root, &item.proof, &item.key),
            };
            outcome.is_ok()
        })
        .collect()
}

fn existence_proof_for<'a>(
    proof: &'a CommitmentProof,
    key: &[u8],
) -> Result<&'a ExistenceProof, Error> {
    match &proof.proof {
        None => Err(Kind::EmptyProof.into()),
        Some(Proof::Exist(existence)) => Ok(existence),
        Some(Proof::Batch(batch)) => batch
            .entries
            .iter()
            .find_map(|entry| match &entry.proof {
                Some(batch_entry::Proof::Exist(existence)) if existence.key == key => {
                    Some(existence)
                }
                _ => None,
            })
            .ok_or_else(|| Kind::KeyMismatch.into()),
        Some(Proof::Nonexist(_)) => {
            Err(Kind::malformed("expected an existence proof, found a non-existence proof").into())
        }
        Some(Proof::Compressed(_)) => {
            Err(Kind::malformed("compressed batch proofs are not supported").into())
        }
    }
}

fn non_existence_proof_for<'a>(
    proof: &'a CommitmentProof,
    key: &[u8],
) -> Result<&'a NonExistenceProof, Error> {
    match &proof.proof {
        None => Err(Kind::EmptyProof.into()),
        Some(Proof::Nonexist(non_existence)) => Ok(non_existence),
        Some(Proof::Batch(batch)) => batch
            .entries
            .iter()
            .find_map(|entry| match &entry.proof {
                Some(batch_entry::Proof::Nonexist(non_existence)) if non_existence.key == key => {
                    Some(non_existence)
                }
                _ => None,
            })
            .ok_or_else(|| Kind::KeyMismatch.into()),
        Some(Proof::Exist(_)) => {
            Err(Kind::malformed("expected a non-existence proof, found an existence proof").into())
        }
        Some(Proof::Compressed(_)) => {
            Err(Kind::malformed("compressed batch proofs are not supported").into())
        }
    }
}

/// Checks an existence proof for `key -> value` against `root`.
pub fn verify_existence(
    spec: &ProofSpec,
    root: &[u8],
    proof: &ExistenceProof,
    key: &[u8],
    value: &[u8],
) -> Result<(), Error> {
    if root.is_empty() {
        return Err(Kind::EmptyCommitmentRoot.into());
    }
    if proof.key != key {
        return Err(Kind::KeyMismatch.into());
    }
    if proof.value != value {
        return Err(Kind::ValueMismatch.into());
    }

    let calculated = existence_root(spec, proof)?;
    if calculated != root {
        return Err(Kind::RootMismatch.into());
    }

    Ok(())
}

/// Checks that `key` is absent under `root`: every neighbour present must exist under
/// `root`, bracket `key` strictly, and the neighbours must be adjacent leaves.
pub fn verify_non_existence(
    spec: &ProofSpec,
    root: &[u8],
    proof: &NonExistenceProof,
    key: &[u8],
) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Kind::malformed("non-existence proof for an empty key").into());
    }
    if proof.key != key {
        return Err(Kind::KeyMismatch.into());
    }

    for neighbour in proof.left.iter().chain(proof.right.iter()) {
        verify_existence(spec, root, neighbour, &neighbour.key, &neighbour.value)?;
    }

    match (&proof.left, &proof.right) {
        (None, None) => {
            return Err(Kind::malformed("non-existence proof without neighbours").into())
        }
        (Some(left), Some(right)) if left.key == right.key => {
            return Err(Kind::malformed("duplicate boundary keys").into())
        }
        _ => {}
    }

    // With prehashed keys the order is only known to the hashing side; leave it to `ics23`.
    if !spec.prehash_key_before_comparison {
        let below = proof.left.as_ref().map_or(true, |left| left.key.as_slice() < key);
        let above = proof.right.as_ref().map_or(true, |right| right.key.as_slice() > key);
        if !below || !above {
            return Err(Kind::KeyOutOfRange.into());
        }
    }

    let claim = CommitmentProof {
        proof: Some(Proof::Nonexist(proof.clone())),
    };
    if !ics23::verify_non_membership::<HostFunctionsManager>(&claim, spec, &root.to_vec(), key) {
        return Err(Kind::malformed("left and right proofs are not adjacent leaves").into());
    }

    Ok(())
}

/// Validates the proof against the spec and recomputes the root it commits to.
pub fn existence_root(spec: &ProofSpec, proof: &ExistenceProof) -> Result<Vec<u8>, Error> {
    check_structure(proof)?;

    let root = calculate_existence_root::<HostFunctionsManager>(proof)
        .map_err(|e| Kind::malformed(e.to_string()))?;

    // Verifying the proof against its own root leaves only the spec conformance to check.
    let claim = CommitmentProof {
        proof: Some(Proof::Exist(proof.clone())),
    };
    if !ics23::verify_membership::<HostFunctionsManager>(&claim, spec, &root, &proof.key, &proof.value)
    {
        return Err(Kind::malformed("proof does not conform to the proof spec").into());
    }

    Ok(root)
}

/// Checks `ics23` leaves to the caller: a bounded path of SHA-256 operations that are never
/// empty.
fn check_structure(proof: &ExistenceProof) -> Result<(), Error> {
    if proof.key.is_empty() {
        return Err(Kind::malformed("existence proof for an empty key").into());
    }

    let leaf = proof
        .leaf
        .as_ref()
        .ok_or_else(|| Kind::malformed("existence proof must have a leaf op"))?;
    if leaf.hash != HashOp::Sha256 as i32 {
        return Err(Kind::malformed(format!("unexpected leaf hash op {}", leaf.hash)).into());
    }
    if leaf.prefix.is_empty() {
        return Err(Kind::malformed("empty leaf prefix").into());
    }

    if proof.path.len() > MAX_PROOF_DEPTH {
        return Err(Kind::malformed(format!(
            "proof depth {} exceeds the hard limit of {}",
            proof.path.len(),
            MAX_PROOF_DEPTH
        ))
        .into());
    }
    for step in &proof.path {
        if step.hash != HashOp::Sha256 as i32 {
            return Err(Kind::malformed(format!("unexpected inner hash op {}", step.hash)).into());
        }
        if step.prefix.is_empty() && step.suffix.is_empty() {
            return Err(Kind::malformed("empty inner op").into());
        }
    }

    Ok(())
}

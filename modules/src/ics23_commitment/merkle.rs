use std::convert::TryFrom;

use ics23::CommitmentProof;

use crate::ics02_client::height::Height;
use crate::ics23_commitment::commitment::{CommitmentPrefix, CommitmentProofBytes, CommitmentRoot};
use crate::ics23_commitment::error::{Error, Kind};
use crate::ics23_commitment::multistore::{self, MultiStoreProof, StoreInfo, StoreName};
use crate::ics23_commitment::specs::ProofSpecs;
use crate::proto::RawMerkleProof;

/// A chain of ICS-23 proofs, innermost first, as carried by IBC messages.
#[derive(Clone, Debug, PartialEq)]
pub struct MerkleProof {
    pub proofs: Vec<CommitmentProof>,
    pub store_infos: Vec<StoreInfo>,
}

impl TryFrom<RawMerkleProof> for MerkleProof {
    type Error = Error;

    fn try_from(raw: RawMerkleProof) -> Result<Self, Self::Error> {
        if raw.proofs.is_empty() {
            return Err(Kind::EmptyProof.into());
        }
        if raw.proofs.len() > 2 {
            return Err(Kind::malformed(format!(
                "expected at most a store proof and a multi-store proof, got {} proofs",
                raw.proofs.len()
            ))
            .into());
        }

        Ok(MerkleProof {
            proofs: raw.proofs,
            store_infos: raw.store_infos.into_iter().map(StoreInfo::from).collect(),
        })
    }
}

impl TryFrom<&CommitmentProofBytes> for MerkleProof {
    type Error = Error;

    fn try_from(bytes: &CommitmentProofBytes) -> Result<Self, Self::Error> {
        MerkleProof::try_from(RawMerkleProof::try_from(bytes)?)
    }
}

impl From<MerkleProof> for RawMerkleProof {
    fn from(proof: MerkleProof) -> Self {
        RawMerkleProof {
            proofs: proof.proofs,
            store_infos: proof.store_infos.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<MerkleProof> for CommitmentProofBytes {
    fn from(proof: MerkleProof) -> Self {
        RawMerkleProof::from(proof).into()
    }
}

/// Verifies that `key` maps to `value` in the store named by `prefix`, under the application
/// hash `root` of the counterparty at `height`.
pub fn verify_membership(
    specs: &ProofSpecs,
    root: &CommitmentRoot,
    prefix: &CommitmentPrefix,
    proof: &CommitmentProofBytes,
    height: Height,
    key: &[u8],
    value: &[u8],
) -> Result<(), Error> {
    let proof = multistore_proof(prefix, proof, height)?;
    multistore::verify_membership(specs, root.as_bytes(), &proof, key, value)
}

/// Verifies that `key` is absent from the store named by `prefix`.
pub fn verify_non_membership(
    specs: &ProofSpecs,
    root: &CommitmentRoot,
    prefix: &CommitmentPrefix,
    proof: &CommitmentProofBytes,
    height: Height,
    key: &[u8],
) -> Result<(), Error> {
    let proof = multistore_proof(prefix, proof, height)?;
    multistore::verify_non_membership(specs, root.as_bytes(), &proof, key)
}

fn multistore_proof(
    prefix: &CommitmentPrefix,
    proof: &CommitmentProofBytes,
    height: Height,
) -> Result<MultiStoreProof, Error> {
    let store = StoreName::try_from(prefix)?;
    MultiStoreProof::new(store, height, MerkleProof::try_from(proof)?)
}

use crate::ics02_client::height::Height;
use crate::ics23_commitment::commitment::CommitmentProofBytes;

/// Structure comprising a proof of an object on the counterparty chain together with the
/// height at which it was taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proofs {
    object_proof: CommitmentProofBytes,
    /// Height of the counterparty block whose application hash the proof is rooted in.
    height: Height,
}

impl Proofs {
    pub fn new(object_proof: CommitmentProofBytes, height: Height) -> Result<Self, String> {
        if height.is_zero() {
            return Err("Proofs height cannot be zero".to_string());
        }

        Ok(Self {
            object_proof,
            height,
        })
    }

    /// Getter for the object_proof field.
    pub fn object_proof(&self) -> &CommitmentProofBytes {
        &self.object_proof
    }

    /// Getter for the height field.
    pub fn height(&self) -> Height {
        self.height
    }
}

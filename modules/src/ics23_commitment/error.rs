use anomaly::{BoxError, Context};
use thiserror::Error;

pub type Error = anomaly::Error<Kind>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Kind {
    #[error("empty commitment proof")]
    EmptyProof,

    #[error("malformed proof: {0}")]
    ProofMalformed(String),

    #[error("calculated root does not match the trusted commitment root")]
    RootMismatch,

    #[error("key is outside the range bracketed by the non-existence proof")]
    KeyOutOfRange,

    #[error("proof is about a different key")]
    KeyMismatch,

    #[error("proof is about a different value")]
    ValueMismatch,

    #[error("empty commitment root")]
    EmptyCommitmentRoot,

    #[error("invalid raw merkle proof")]
    InvalidRawMerkleProof,

    #[error("store `{0}` is not on the allow-list of committed module stores")]
    StoreNotAllowed(String),

    #[error("store `{0}` is not part of the committed store infos")]
    StoreNotFound(String),

    #[error("invalid store infos: {0}")]
    InvalidStoreInfos(String),
}

impl Kind {
    pub fn context(self, source: impl Into<BoxError>) -> Context<Self> {
        Context::new(self, Some(source.into()))
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Kind::ProofMalformed(reason.into())
    }
}

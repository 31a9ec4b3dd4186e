use anomaly::{BoxError, Context};
use thiserror::Error;

use crate::ics02_client::height::Height;

pub type Error = anomaly::Error<Kind>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Kind {
    #[error("invalid trust threshold: {0}")]
    InvalidTrustThreshold(String),

    #[error("invalid trusting period: {0}")]
    InvalidTrustingPeriod(String),

    #[error("invalid unbonding period: {0}")]
    InvalidUnbondingPeriod(String),

    #[error("invalid max clock drift: zero")]
    InvalidMaxClockDrift,

    #[error("invalid latest height: {0}")]
    InvalidLatestHeight(Height),

    #[error("invalid raw client state: {0}")]
    InvalidRawClientState(String),

    #[error("invalid raw consensus state: {0}")]
    InvalidRawConsensusState(String),

    #[error("invalid raw header: {0}")]
    InvalidRawHeader(String),

    #[error("invalid raw misbehaviour: {0}")]
    InvalidRawMisbehaviour(String),

    #[error("header height {header} is not above the latest client height {latest}")]
    LowHeaderHeight { header: Height, latest: Height },

    #[error("header chain id `{header}` does not match the client chain id `{client}`")]
    ChainIdMismatch { header: String, client: String },

    #[error("header time is outside the trusting window of the trusted consensus state")]
    ExpiredHeader,

    #[error("header time is too far in the future for the host clock")]
    HeaderFromFuture,

    #[error("validator set hash mismatch: {0}")]
    ValidatorSetHashMismatch(String),

    #[error("commit does not match the header: {0}")]
    InvalidCommit(String),

    #[error("invalid signature from validator {0}")]
    InvalidSignature(String),

    #[error("insufficient voting power: signed {signed} of {total} ({threshold})")]
    InsufficientVotingPower {
        signed: u64,
        total: u64,
        threshold: String,
    },

    #[error("the client is frozen")]
    ClientFrozen,

    #[error("the client has expired")]
    ClientExpired,

    #[error("invalid misbehaviour: {0}")]
    InvalidMisbehaviour(String),

    #[error("failed to verify a counterparty proof")]
    ProofVerificationFailure,

    #[error("invalid validator public key")]
    InvalidPublicKey,
}

impl Kind {
    pub fn context(self, source: impl Into<BoxError>) -> Context<Self> {
        Context::new(self, Some(source.into()))
    }
}

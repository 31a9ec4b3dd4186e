use anomaly::{BoxError, Context};
use thiserror::Error;

use crate::ics02_client::height::Height;
use crate::ics24_host::identifier::{ClientId, ConnectionId};

pub type Error = anomaly::Error<Kind>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Kind {
    #[error("connection state unknown: {0}")]
    InvalidState(i32),

    #[error("connection exists (was initialized) already: {0}")]
    ConnectionExistsAlready(ConnectionId),

    #[error("connection end for identifier {0} is in the wrong state for this step")]
    ConnectionMismatch(ConnectionId),

    #[error("connection end for identifier {0} was never initialized")]
    UninitializedConnection(ConnectionId),

    #[error("identifier error")]
    IdentifierError,

    #[error("invalid version")]
    InvalidVersion,

    #[error("empty supported versions")]
    EmptyVersions,

    #[error("no common version")]
    NoCommonVersion,

    #[error("version mismatch: {0}")]
    VersionMismatch(String),

    #[error("missing counterparty")]
    MissingCounterparty,

    #[error("missing counterparty prefix")]
    MissingCounterpartyPrefix,

    #[error("invalid counterparty: {0}")]
    InvalidCounterparty(String),

    #[error("the client id does not match any client state: {0}")]
    MissingClient(ClientId),

    #[error("the client is frozen: {0}")]
    FrozenClient(ClientId),

    #[error("the client is not active: {0}")]
    InactiveClient(ClientId),

    #[error("the consensus state at height {1} for client id {0} could not be retrieved")]
    MissingClientConsensusState(ClientId, Height),

    #[error("invalid connection proof")]
    InvalidProof,
}

impl Kind {
    pub fn context(self, source: impl Into<BoxError>) -> Context<Self> {
        Context::new(self, Some(source.into()))
    }
}

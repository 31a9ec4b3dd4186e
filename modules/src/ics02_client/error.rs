use anomaly::{BoxError, Context};
use thiserror::Error;

use crate::ics02_client::height::Height;
use crate::ics07_tendermint::error::Kind as LightClientKind;
use crate::ics24_host::identifier::ClientId;

pub type Error = anomaly::Error<Kind>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Kind {
    #[error("unknown client type: {0}")]
    UnknownClientType(String),

    #[error("client already exists: {0}")]
    ClientAlreadyExists(ClientId),

    #[error("client not found: {0}")]
    ClientNotFound(ClientId),

    #[error("client is frozen: {0}")]
    ClientFrozen(ClientId),

    #[error("client has expired: {0}")]
    ClientExpired(ClientId),

    #[error("consensus state not found for client {0} at height {1}")]
    ConsensusStateNotFound(ClientId, Height),

    #[error("the client identifier counter overflowed")]
    ClientIdentifierOverflow,

    #[error("invalid client state")]
    InvalidClientState,

    #[error("header verification failed")]
    HeaderVerificationFailure,

    #[error("misbehaviour evidence rejected")]
    MisbehaviourRejected,

    #[error("header at height {0} is not newer than the latest height {1}")]
    LowHeaderHeight(Height, Height),

    #[error("invalid raw client message")]
    InvalidRawMessage,

    #[error("light client rejected the message: {0}")]
    LightClient(LightClientKind),

    #[error("invalid height")]
    InvalidHeight,

    #[error("height cannot end up zero or negative")]
    InvalidHeightResult,
}

impl Kind {
    pub fn context(self, source: impl Into<BoxError>) -> Context<Self> {
        Context::new(self, Some(source.into()))
    }

    /// Wraps a light client failure, keeping its kind inspectable.
    pub fn light_client(e: crate::ics07_tendermint::error::Error) -> Error {
        match e.kind().clone() {
            LightClientKind::LowHeaderHeight { header, latest } => {
                Kind::LowHeaderHeight(header, latest).context(e).into()
            }
            kind => Kind::LightClient(kind).context(e).into(),
        }
    }
}

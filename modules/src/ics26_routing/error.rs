use anomaly::{BoxError, Context};
use thiserror::Error;

use crate::ics02_client::error::{Error as ClientError, Kind as ClientKind};
use crate::ics03_connection::error::{Error as ConnectionError, Kind as ConnectionKind};
use crate::ics04_channel::error::{Error as ChannelError, Kind as ChannelKind};
use crate::ics24_host::identifier::PortId;

pub type Error = anomaly::Error<Kind>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Kind {
    #[error("ICS02 client error: {0}")]
    Client(ClientKind),

    #[error("ICS03 connection error: {0}")]
    Connection(ConnectionKind),

    #[error("ICS04 channel error: {0}")]
    Channel(ChannelKind),

    #[error("proof verification failed")]
    ProofVerification,

    #[error("no module is bound to port {0}")]
    UnboundPort(PortId),

    #[error("port {0} is already bound to a module")]
    PortAlreadyBound(PortId),

    #[error("application module rejected the packet callback")]
    ModuleError,

    #[error("stored record at {0} could not be decoded")]
    CorruptedRecord(String),

    #[error("handler returned an unexpected result for {0}")]
    UnexpectedResult(&'static str),
}

impl Kind {
    pub fn context(self, source: impl Into<BoxError>) -> Context<Self> {
        Context::new(self, Some(source.into()))
    }

    pub fn client(e: ClientError) -> Error {
        Kind::Client(e.kind().clone()).context(e).into()
    }

    /// Proof failures surface as `ProofVerification` regardless of the handshake step.
    pub fn connection(e: ConnectionError) -> Error {
        match e.kind().clone() {
            ConnectionKind::InvalidProof => Kind::ProofVerification.context(e).into(),
            kind => Kind::Connection(kind).context(e).into(),
        }
    }

    pub fn channel(e: ChannelError) -> Error {
        match e.kind().clone() {
            ChannelKind::InvalidProof => Kind::ProofVerification.context(e).into(),
            kind => Kind::Channel(kind).context(e).into(),
        }
    }
}

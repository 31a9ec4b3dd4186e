use anomaly::{BoxError, Context};
use thiserror::Error;

use crate::ics02_client::height::Height;
use crate::ics04_channel::channel::State;
use crate::ics04_channel::packet::Sequence;
use crate::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};
use crate::timestamp::Timestamp;

pub type Error = anomaly::Error<Kind>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Kind {
    #[error("channel state unknown: {0}")]
    UnknownState(i32),

    #[error("channel order type unknown: {0}")]
    UnknownOrderType(i32),

    #[error("identifier error")]
    IdentifierError,

    #[error("invalid counterparty: {0}")]
    InvalidCounterparty(String),

    #[error("single connection hop expected, got {0}")]
    InvalidConnectionHopsLength(usize),

    #[error("connection {0} does not exist")]
    MissingConnection(ConnectionId),

    #[error("connection {0} is not open")]
    ConnectionNotOpen(ConnectionId),

    #[error("ordering {0} is not supported by the version negotiated on connection {1}")]
    UnsupportedOrdering(String, ConnectionId),

    #[error("port {0} is not bound to a module")]
    PortNotBound(PortId),

    #[error("channel exists (was initialized) already: {0}")]
    ChannelExistsAlready(ChannelId),

    #[error("channel {1} on port {0} does not exist")]
    ChannelNotFound(PortId, ChannelId),

    #[error("channel {0} is in state {1}, which is wrong for this step")]
    InvalidChannelState(ChannelId, State),

    #[error("channel {0} is closed")]
    ChannelClosed(ChannelId),

    #[error("the client id does not match any client state: {0}")]
    MissingClient(ClientId),

    #[error("the client is frozen: {0}")]
    FrozenClient(ClientId),

    #[error("the client is not active: {0}")]
    InactiveClient(ClientId),

    #[error("the consensus state at height {1} for client id {0} could not be retrieved")]
    MissingClientConsensusState(ClientId, Height),

    #[error("invalid proof")]
    InvalidProof,

    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("packet counterparty {0}/{1} does not match the channel counterparty")]
    InvalidPacketCounterparty(PortId, ChannelId),

    #[error("packet sequence {given} does not match the expected sequence {expected}")]
    InvalidPacketSequence { given: Sequence, expected: Sequence },

    #[error("no next sequence record for channel {1} on port {0}")]
    MissingNextSequence(PortId, ChannelId),

    #[error("packet timeout height {timeout} already reached at height {height}")]
    LowPacketHeight { height: Height, timeout: Height },

    #[error("packet timeout timestamp {timeout} already reached at {timestamp}")]
    LowPacketTimestamp {
        timestamp: Timestamp,
        timeout: Timestamp,
    },

    #[error("packet {0} has not timed out at the proof height")]
    PacketTimeoutNotReached(Sequence),

    #[error("packet {0} was already received")]
    PacketAlreadyReceived(Sequence),

    #[error("no commitment stored for packet {0}")]
    PacketCommitmentNotFound(Sequence),

    #[error("the stored commitment for packet {0} does not match the packet")]
    IncorrectPacketCommitment(Sequence),

    #[error("acknowledgement for packet {0} already written")]
    AcknowledgementExists(Sequence),

    #[error("empty acknowledgement")]
    EmptyAcknowledgement,
}

impl Kind {
    pub fn context(self, source: impl Into<BoxError>) -> Context<Self> {
        Context::new(self, Some(source.into()))
    }
}

//! Message definitions for the channel handshake and packet datagrams.

use crate::ics04_channel::channel::{Counterparty, Order};
use crate::ics04_channel::packet::{Packet, Sequence};
use crate::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
use crate::proofs::Proofs;

/// Enumeration of all possible messages that the ICS4 handshake protocol processes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelMsg {
    ChannelOpenInit(MsgChannelOpenInit),
    ChannelOpenTry(Box<MsgChannelOpenTry>),
    ChannelOpenAck(Box<MsgChannelOpenAck>),
    ChannelOpenConfirm(MsgChannelOpenConfirm),
}

/// Messages relayed for a packet already committed on its source chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PacketMsg {
    RecvPacket(MsgRecvPacket),
    AckPacket(MsgAcknowledgement),
    TimeoutPacket(MsgTimeout),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgChannelOpenInit {
    pub port_id: PortId,
    pub ordering: Order,
    pub counterparty_port_id: PortId,
    pub connection_hops: Vec<ConnectionId>,
    pub version: String,
}

/// Answers an Init on the counterparty. `counterparty_version` is the version the counterparty
/// end was initialized with; `version` is the one this end adopts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgChannelOpenTry {
    pub port_id: PortId,
    pub ordering: Order,
    pub counterparty: Counterparty,
    pub connection_hops: Vec<ConnectionId>,
    pub version: String,
    pub counterparty_version: String,
    pub proofs: Proofs,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgChannelOpenAck {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub counterparty_channel_id: ChannelId,
    pub counterparty_version: String,
    pub proofs: Proofs,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgChannelOpenConfirm {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub proofs: Proofs,
}

/// Delivers `packet` to its destination, proving the source chain committed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgRecvPacket {
    pub packet: Packet,
    pub proofs: Proofs,
}

/// Returns the destination's acknowledgement for `packet` to the source chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgAcknowledgement {
    pub packet: Packet,
    pub acknowledgement: Vec<u8>,
    pub proofs: Proofs,
}

/// Proves to the source chain that `packet` was not received before its timeout.
/// `next_sequence_recv` is only consulted on ordered channels, where the proof is of the
/// destination's next receive sequence; on unordered channels the proof is of receipt absence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgTimeout {
    pub packet: Packet,
    pub next_sequence_recv: Sequence,
    pub proofs: Proofs,
}

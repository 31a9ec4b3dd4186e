//! This module implements the processing logic for ICS4 (channel) messages.

use crate::handler::HandlerOutput;
use crate::ics04_channel::channel::ChannelEnd;
use crate::ics04_channel::context::ChannelReader;
use crate::ics04_channel::error::Error;
use crate::ics04_channel::msgs::{ChannelMsg, PacketMsg};
use crate::ics04_channel::packet::Sequence;
use crate::ics24_host::identifier::{ChannelId, PortId};

pub mod acknowledgement;
pub mod chan_open_ack;
pub mod chan_open_confirm;
pub mod chan_open_init;
pub mod chan_open_try;
pub mod recv_packet;
pub mod send_packet;
pub mod timeout;
pub mod verify;
pub mod write_acknowledgement;

/// Defines the possible states of a channel identifier in a `ChannelResult`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelIdState {
    /// Specifies that the channel handshake handler allocated a new channel identifier. This
    /// happens during the processing of either the `MsgChannelOpenInit` or `MsgChannelOpenTry`.
    Generated,

    /// Specifies that the handler reused a previously-allocated channel identifier.
    Reused,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelResult {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub channel_id_state: ChannelIdState,
    pub channel_end: ChannelEnd,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendPacketResult {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub seq: Sequence,
    /// The next send sequence after this packet.
    pub seq_number: Sequence,
    pub commitment: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecvPacketResult {
    Ordered {
        port_id: PortId,
        channel_id: ChannelId,
        next_seq_recv: Sequence,
    },
    Unordered {
        port_id: PortId,
        channel_id: ChannelId,
        sequence: Sequence,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteAckPacketResult {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub seq: Sequence,
    pub ack_commitment: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AckPacketResult {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub seq: Sequence,
    /// The next acknowledgement sequence, on ordered channels only.
    pub seq_number: Option<Sequence>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeoutPacketResult {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub seq: Sequence,
    /// The closed channel end, when the timeout closes an ordered channel.
    pub channel: Option<ChannelEnd>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PacketResult {
    Send(SendPacketResult),
    Recv(RecvPacketResult),
    WriteAck(WriteAckPacketResult),
    Ack(AckPacketResult),
    Timeout(TimeoutPacketResult),
}

/// General entry point for processing any type of message related to the ICS4 channel open
/// handshake protocol.
pub fn channel_dispatch<Ctx>(ctx: &Ctx, msg: ChannelMsg) -> Result<HandlerOutput<ChannelResult>, Error>
where
    Ctx: ChannelReader,
{
    Ok(match msg {
        ChannelMsg::ChannelOpenInit(msg) => chan_open_init::process(ctx, msg)?,
        ChannelMsg::ChannelOpenTry(msg) => chan_open_try::process(ctx, *msg)?,
        ChannelMsg::ChannelOpenAck(msg) => chan_open_ack::process(ctx, *msg)?,
        ChannelMsg::ChannelOpenConfirm(msg) => chan_open_confirm::process(ctx, msg)?,
    })
}

/// Dispatcher for processing any type of message related to the ICS4 packet protocols.
pub fn packet_dispatch<Ctx>(ctx: &Ctx, msg: PacketMsg) -> Result<HandlerOutput<PacketResult>, Error>
where
    Ctx: ChannelReader,
{
    Ok(match msg {
        PacketMsg::RecvPacket(msg) => recv_packet::process(ctx, msg)?,
        PacketMsg::AckPacket(msg) => acknowledgement::process(ctx, msg)?,
        PacketMsg::TimeoutPacket(msg) => timeout::process(ctx, msg)?,
    })
}

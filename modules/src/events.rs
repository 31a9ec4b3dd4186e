//! Events emitted by the IBC handlers. The host records each event together with the height of
//! the block that produced it; relayers consume them to drive handshakes and packets.

use serde_derive::{Deserialize, Serialize};

use crate::ics02_client::client_type::ClientType;
use crate::ics02_client::height::Height;
use crate::ics04_channel::packet::Packet;
use crate::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAttributes {
    pub client_id: ClientId,
    pub client_type: ClientType,
    pub consensus_height: Height,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionAttributes {
    pub connection_id: ConnectionId,
    pub client_id: ClientId,
    pub counterparty_connection_id: Option<ConnectionId>,
    pub counterparty_client_id: ClientId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAttributes {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub connection_id: ConnectionId,
    pub counterparty_port_id: PortId,
    pub counterparty_channel_id: Option<ChannelId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketAttributes {
    pub packet: Packet,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAckAttributes {
    pub packet: Packet,
    pub ack: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IBCEvent {
    CreateClient(ClientAttributes),
    UpdateClient(ClientAttributes),
    ClientMisbehavior(ClientAttributes),
    OpenInitConnection(ConnectionAttributes),
    OpenTryConnection(ConnectionAttributes),
    OpenAckConnection(ConnectionAttributes),
    OpenConfirmConnection(ConnectionAttributes),
    OpenInitChannel(ChannelAttributes),
    OpenTryChannel(ChannelAttributes),
    OpenAckChannel(ChannelAttributes),
    OpenConfirmChannel(ChannelAttributes),
    CloseChannel(ChannelAttributes),
    SendPacketChannel(PacketAttributes),
    ReceivePacketChannel(PacketAttributes),
    WriteAcknowledgementChannel(WriteAckAttributes),
    AcknowledgePacketChannel(PacketAttributes),
    TimeoutPacketChannel(PacketAttributes),
}

impl IBCEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            IBCEvent::CreateClient(_) => "create_client",
            IBCEvent::UpdateClient(_) => "update_client",
            IBCEvent::ClientMisbehavior(_) => "client_misbehaviour",
            IBCEvent::OpenInitConnection(_) => "connection_open_init",
            IBCEvent::OpenTryConnection(_) => "connection_open_try",
            IBCEvent::OpenAckConnection(_) => "connection_open_ack",
            IBCEvent::OpenConfirmConnection(_) => "connection_open_confirm",
            IBCEvent::OpenInitChannel(_) => "channel_open_init",
            IBCEvent::OpenTryChannel(_) => "channel_open_try",
            IBCEvent::OpenAckChannel(_) => "channel_open_ack",
            IBCEvent::OpenConfirmChannel(_) => "channel_open_confirm",
            IBCEvent::CloseChannel(_) => "channel_close",
            IBCEvent::SendPacketChannel(_) => "send_packet",
            IBCEvent::ReceivePacketChannel(_) => "recv_packet",
            IBCEvent::WriteAcknowledgementChannel(_) => "write_acknowledgement",
            IBCEvent::AcknowledgePacketChannel(_) => "acknowledge_packet",
            IBCEvent::TimeoutPacketChannel(_) => "timeout_packet",
        }
    }

    /// The packet an event is about, for the packet lifecycle events.
    pub fn packet(&self) -> Option<&Packet> {
        match self {
            IBCEvent::SendPacketChannel(attrs)
            | IBCEvent::ReceivePacketChannel(attrs)
            | IBCEvent::AcknowledgePacketChannel(attrs)
            | IBCEvent::TimeoutPacketChannel(attrs) => Some(&attrs.packet),
            IBCEvent::WriteAcknowledgementChannel(attrs) => Some(&attrs.packet),
            _ => None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

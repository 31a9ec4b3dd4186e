use crate::ics02_client::msgs::ClientMsg;
use crate::ics03_connection::msgs::ConnectionMsg;
use crate::ics04_channel::msgs::{ChannelMsg, PacketMsg};

/// Enumeration of all messages that the local ICS26 module is capable of routing.
#[derive(Clone, Debug)]
pub enum Ics26Envelope {
    Ics2Msg(ClientMsg),
    Ics3Msg(ConnectionMsg),
    Ics4Msg(ChannelMsg),
    Ics4PacketMsg(PacketMsg),
}

impl Ics26Envelope {
    /// Short name of the carried message, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Ics26Envelope::Ics2Msg(ClientMsg::CreateClient(_)) => "create_client",
            Ics26Envelope::Ics2Msg(ClientMsg::UpdateClient(_)) => "update_client",
            Ics26Envelope::Ics2Msg(ClientMsg::SubmitMisbehaviour(_)) => "submit_misbehaviour",
            Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenInit(_)) => "conn_open_init",
            Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenTry(_)) => "conn_open_try",
            Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenAck(_)) => "conn_open_ack",
            Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenConfirm(_)) => "conn_open_confirm",
            Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenInit(_)) => "chan_open_init",
            Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenTry(_)) => "chan_open_try",
            Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenAck(_)) => "chan_open_ack",
            Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenConfirm(_)) => "chan_open_confirm",
            Ics26Envelope::Ics4PacketMsg(PacketMsg::RecvPacket(_)) => "recv_packet",
            Ics26Envelope::Ics4PacketMsg(PacketMsg::AckPacket(_)) => "acknowledge_packet",
            Ics26Envelope::Ics4PacketMsg(PacketMsg::TimeoutPacket(_)) => "timeout_packet",
        }
    }
}

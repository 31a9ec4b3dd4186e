//! ICS4 (channel) context. The two traits `ChannelReader` and `ChannelKeeper` define the interface
//! that any host chain must implement to be able to process any `ChannelMsg` or `PacketMsg`.

use crate::ics02_client::height::Height;
use crate::ics03_connection::connection::ConnectionEnd;
use crate::ics04_channel::channel::ChannelEnd;
use crate::ics04_channel::error::Error;
use crate::ics04_channel::handler::{
    ChannelIdState, ChannelResult, PacketResult, RecvPacketResult,
};
use crate::ics04_channel::packet::Sequence;
use crate::ics07_tendermint::client_state::ClientState;
use crate::ics07_tendermint::consensus_state::ConsensusState;
use crate::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};
use crate::timestamp::Timestamp;

/// A context supplying all the necessary read-only dependencies for processing any `ChannelMsg`.
pub trait ChannelReader {
    /// Returns the ChannelEnd for the given `port_id` and `chan_id`.
    fn channel_end(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<ChannelEnd>;

    /// Returns the ConnectionEnd for the given identifier `conn_id`.
    fn connection_end(&self, connection_id: &ConnectionId) -> Option<ConnectionEnd>;

    /// Returns the ClientState for the given identifier `client_id`. Necessary dependency towards
    /// proof verification.
    fn client_state(&self, client_id: &ClientId) -> Option<ClientState>;

    fn client_consensus_state(&self, client_id: &ClientId, height: Height)
        -> Option<ConsensusState>;

    /// Whether a module is bound to `port_id`.
    fn port_bound(&self, port_id: &PortId) -> bool;

    fn get_next_sequence_send(&self, port_id: &PortId, channel_id: &ChannelId)
        -> Option<Sequence>;

    fn get_next_sequence_recv(&self, port_id: &PortId, channel_id: &ChannelId)
        -> Option<Sequence>;

    fn get_next_sequence_ack(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<Sequence>;

    fn get_packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
    ) -> Option<Vec<u8>>;

    fn get_packet_receipt(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
    ) -> bool;

    fn get_packet_acknowledgement(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
    ) -> Option<Vec<u8>>;

    /// Returns the current height of the local chain.
    fn host_height(&self) -> Height;

    /// Returns the current timestamp of the local chain.
    fn host_timestamp(&self) -> Timestamp;

    /// Returns a counter on the number of channel ids have been created thus far.
    fn channel_counter(&self) -> u64;
}

/// A context supplying all the necessary write-only dependencies (i.e., storage functionalities)
/// for processing any `ChannelMsg` or `PacketMsg`.
pub trait ChannelKeeper {
    fn store_channel_result(&self, result: ChannelResult) -> Result<(), Error> {
        let port_id = &result.port_id;
        let channel_id = &result.channel_id;

        // A new channel starts every sequence at 1.
        if result.channel_id_state == ChannelIdState::Generated {
            self.increase_channel_counter();
            self.store_next_sequence_send(port_id, channel_id, 1.into())?;
            self.store_next_sequence_recv(port_id, channel_id, 1.into())?;
            self.store_next_sequence_ack(port_id, channel_id, 1.into())?;
        }

        self.store_channel(port_id, channel_id, &result.channel_end)
    }

    fn store_packet_result(&self, general_result: PacketResult) -> Result<(), Error> {
        match general_result {
            PacketResult::Send(res) => {
                self.store_next_sequence_send(&res.port_id, &res.channel_id, res.seq_number)?;
                self.store_packet_commitment(
                    &res.port_id,
                    &res.channel_id,
                    res.seq,
                    res.commitment,
                )?;
            }
            PacketResult::Recv(res) => match res {
                RecvPacketResult::Ordered {
                    port_id,
                    channel_id,
                    next_seq_recv,
                } => self.store_next_sequence_recv(&port_id, &channel_id, next_seq_recv)?,
                RecvPacketResult::Unordered {
                    port_id,
                    channel_id,
                    sequence,
                } => self.store_packet_receipt(&port_id, &channel_id, sequence)?,
            },
            PacketResult::WriteAck(res) => {
                self.store_packet_acknowledgement(
                    &res.port_id,
                    &res.channel_id,
                    res.seq,
                    res.ack_commitment,
                )?;
            }
            PacketResult::Ack(res) => {
                self.delete_packet_commitment(&res.port_id, &res.channel_id, res.seq)?;
                if let Some(next_seq_ack) = res.seq_number {
                    self.store_next_sequence_ack(&res.port_id, &res.channel_id, next_seq_ack)?;
                }
            }
            PacketResult::Timeout(res) => {
                self.delete_packet_commitment(&res.port_id, &res.channel_id, res.seq)?;
                if let Some(channel_end) = res.channel {
                    self.store_channel(&res.port_id, &res.channel_id, &channel_end)?;
                }
            }
        }
        Ok(())
    }

    fn store_channel(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        channel_end: &ChannelEnd,
    ) -> Result<(), Error>;

    fn store_next_sequence_send(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), Error>;

    fn store_next_sequence_recv(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), Error>;

    fn store_next_sequence_ack(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), Error>;

    fn store_packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
        commitment: Vec<u8>,
    ) -> Result<(), Error>;

    fn delete_packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), Error>;

    fn store_packet_receipt(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), Error>;

    fn store_packet_acknowledgement(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
        ack_commitment: Vec<u8>,
    ) -> Result<(), Error>;

    /// Called upon channel identifier creation (Init or Try message processing).
    /// Increases the counter which keeps track of how many channels have been created.
    fn increase_channel_counter(&self);
}

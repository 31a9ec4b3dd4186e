//! `MockContext` is the IBC host over an in-memory store, with builders to seed its state.

use std::sync::{Arc, Mutex, PoisonError};

use anomaly::BoxError;

use crate::ics02_client::height::Height;
use crate::ics03_connection::connection::ConnectionEnd;
use crate::ics04_channel::channel::ChannelEnd;
use crate::ics04_channel::packet::{Packet, Sequence};
use crate::ics23_commitment::commitment::CommitmentPrefix;
use crate::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};
use crate::ics24_host::path::Path;
use crate::ics26_routing::context::Module;
use crate::ics26_routing::host::{IbcHost, IBC_STORE};
use crate::mock::host::{
    block_time, mock_chain_id, mock_client_state, mock_consensus_state, MockChainHost,
};
use crate::store::MemStore;

/// The acknowledgement `MockModule` writes for every packet it receives.
pub const MOCK_ACK: &[u8] = b"{\"result\":\"AQ==\"}";

pub type MockContext = IbcHost<MemStore>;

impl Default for MockContext {
    /// A host at height 100 with no clients, connections, channels or bound ports.
    fn default() -> Self {
        let store = MemStore::new(Height::new(0, 100), block_time(100));
        store.mount(IBC_STORE);
        IbcHost::new(store, CommitmentPrefix::from(IBC_STORE.as_bytes().to_vec()))
    }
}

impl MockContext {
    pub fn with_host_height(self, height: Height) -> Self {
        self.store()
            .set_host(height, block_time(height.revision_height));
        self
    }

    /// Installs a client of the mock chain at `height`, or moves an existing one there while
    /// keeping its older consensus states.
    pub fn with_client(self, client_id: &ClientId, height: Height) -> Self {
        self.write_client_state(client_id, mock_client_state(mock_chain_id(), height));
        self.write_consensus_state(
            client_id,
            height,
            mock_consensus_state(height.revision_height, vec![0; 32]),
        );
        self
    }

    /// Installs a client tracking `counterparty`, trusting every block it committed.
    pub fn with_counterparty_client(self, client_id: &ClientId, counterparty: &MockChainHost) -> Self {
        self.write_client_state(client_id, counterparty.client_state());
        for height in counterparty.committed_heights() {
            if let Some(consensus_state) = counterparty.consensus_state(height) {
                self.write_consensus_state(client_id, height, consensus_state);
            }
        }
        self
    }

    pub fn with_connection(self, connection_id: ConnectionId, connection_end: ConnectionEnd) -> Self {
        self.write_connection(&connection_id, &connection_end);
        self
    }

    pub fn with_channel(self, port_id: PortId, channel_id: ChannelId, channel_end: ChannelEnd) -> Self {
        self.write_channel(&port_id, &channel_id, &channel_end);
        self
    }

    /// Binds a `MockModule` to `port_id`.
    pub fn with_port_capability(self, port_id: PortId) -> Self {
        self.bind_port(port_id, Arc::new(MockModule::default()))
            .expect("port is bound once per context");
        self
    }

    pub fn with_send_sequence(self, port_id: PortId, channel_id: ChannelId, seq: Sequence) -> Self {
        self.write_sequence(&Path::SeqSends(port_id, channel_id), seq);
        self
    }

    pub fn with_recv_sequence(self, port_id: PortId, channel_id: ChannelId, seq: Sequence) -> Self {
        self.write_sequence(&Path::SeqRecvs(port_id, channel_id), seq);
        self
    }

    pub fn with_ack_sequence(self, port_id: PortId, channel_id: ChannelId, seq: Sequence) -> Self {
        self.write_sequence(&Path::SeqAcks(port_id, channel_id), seq);
        self
    }

    pub fn with_packet_commitment(
        self,
        port_id: PortId,
        channel_id: ChannelId,
        seq: Sequence,
        data: Vec<u8>,
    ) -> Self {
        self.write_packet_commitment(&port_id, &channel_id, seq, data);
        self
    }
}

/// An application that acknowledges every packet with `MOCK_ACK` and remembers the callbacks
/// it received.
#[derive(Debug, Default)]
pub struct MockModule {
    received: Mutex<Vec<Packet>>,
    acknowledged: Mutex<Vec<(Packet, Vec<u8>)>>,
    timed_out: Mutex<Vec<Packet>>,
}

impl MockModule {
    pub fn received(&self) -> Vec<Packet> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn acknowledged(&self) -> Vec<(Packet, Vec<u8>)> {
        self.acknowledged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn timed_out(&self) -> Vec<Packet> {
        self.timed_out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Module for MockModule {
    fn on_recv_packet(&self, packet: &Packet) -> Result<Vec<u8>, BoxError> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(packet.clone());
        Ok(MOCK_ACK.to_vec())
    }

    fn on_acknowledgement_packet(&self, packet: &Packet, acknowledgement: &[u8]) -> Result<(), BoxError> {
        self.acknowledged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((packet.clone(), acknowledgement.to_vec()));
        Ok(())
    }

    fn on_timeout_packet(&self, packet: &Packet) -> Result<(), BoxError> {
        self.timed_out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(packet.clone());
        Ok(())
    }
}

//! Fixtures shared by the relayer's tests: two mock chains, clients between them, and a
//! connection and channel opened through the relayer's own handshake drivers.

use std::sync::Arc;
use std::time::Duration;

use ibc::ics02_client::height::Height;
use ibc::ics04_channel::channel::Order;
use ibc::ics04_channel::packet::{Packet, Sequence};
use ibc::ics24_host::identifier::{ChainId, ChannelId, ConnectionId, PortId};

use crate::chain::mock::{mock_chain_config, MockChain};
use crate::chain::Chain;
use crate::channel::{ChannelHandshake, ChannelSide};
use crate::config::RelayConfig;
use crate::connection::ConnectionHandshake;
use crate::foreign_client::ForeignClient;

pub const VERSION: &str = "ics20-1";

/// Backoff short enough for tests, with room for a few injected faults.
pub fn quick_config() -> RelayConfig {
    RelayConfig {
        max_retries: 4,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
        poll_interval: Duration::from_millis(5),
        ..RelayConfig::default()
    }
}

pub fn two_chains() -> (Arc<MockChain>, Arc<MockChain>) {
    (
        Arc::new(MockChain::new(ChainId::new("chain-a".to_string(), 0))),
        Arc::new(MockChain::new(ChainId::new("chain-b".to_string(), 0))),
    )
}

/// A client on `a` tracking `b`, and one on `b` tracking `a`.
pub async fn client_pair(a: &Arc<MockChain>, b: &Arc<MockChain>) -> (ForeignClient, ForeignClient) {
    let a_client = ForeignClient::create(a.clone(), b.clone(), &mock_chain_config(b.id().clone()))
        .await
        .expect("client on chain a");
    let b_client = ForeignClient::create(b.clone(), a.clone(), &mock_chain_config(a.id().clone()))
        .await
        .expect("client on chain b");
    (a_client, b_client)
}

pub async fn open_connection(a_client: &ForeignClient, b_client: &ForeignClient) -> (ConnectionId, ConnectionId) {
    ConnectionHandshake::new(
        a_client.clone(),
        b_client.clone(),
        Duration::from_secs(0),
        quick_config(),
    )
    .expect("clients track each other")
    .open()
    .await
    .expect("connection handshake")
}

/// Two chains joined by an open channel between their transfer ports.
pub struct Link {
    pub a: Arc<MockChain>,
    pub b: Arc<MockChain>,
    pub a_client: ForeignClient,
    pub b_client: ForeignClient,
    pub a_conn: ConnectionId,
    pub b_conn: ConnectionId,
    pub a_chan: ChannelId,
    pub b_chan: ChannelId,
}

impl Link {
    /// A packet from A to B carrying `payload-{sequence}`, timing out at a height B will not
    /// reach during a test.
    pub fn packet(&self, sequence: u64) -> Packet {
        Packet {
            sequence: Sequence::from(sequence),
            source_port: PortId::transfer(),
            source_channel: self.a_chan.clone(),
            destination_port: PortId::transfer(),
            destination_channel: self.b_chan.clone(),
            data: format!("payload-{}", sequence).into_bytes(),
            timeout_height: Height::new(0, 100_000),
            ..Default::default()
        }
    }
}

pub async fn linked(ordering: Order) -> Link {
    let (a, b) = two_chains();
    let (a_client, b_client) = client_pair(&a, &b).await;
    let (a_conn, b_conn) = open_connection(&a_client, &b_client).await;

    let (a_chan, b_chan) = ChannelHandshake::new(
        ChannelSide {
            client: a_client.clone(),
            connection_id: a_conn.clone(),
            port_id: PortId::transfer(),
        },
        ChannelSide {
            client: b_client.clone(),
            connection_id: b_conn.clone(),
            port_id: PortId::transfer(),
        },
        ordering,
        VERSION.to_string(),
        quick_config(),
    )
    .open()
    .await
    .expect("channel handshake");

    Link {
        a,
        b,
        a_client,
        b_client,
        a_conn,
        b_conn,
        a_chan,
        b_chan,
    }
}

//! The relayer's view of a chain: submit messages, query state with proofs, follow blocks and
//! read the events they produced.

use async_trait::async_trait;

use ibc::events::IBCEvent;
use ibc::ics02_client::height::Height;
use ibc::ics03_connection::connection::ConnectionEnd;
use ibc::ics04_channel::channel::ChannelEnd;
use ibc::ics07_tendermint::client_state::ClientState;
use ibc::ics07_tendermint::header::Header;
use ibc::ics23_commitment::commitment::{CommitmentPrefix, CommitmentProofBytes};
use ibc::ics24_host::identifier::{ChainId, ChannelId, ClientId, ConnectionId, PortId};
use ibc::ics24_host::path::Path;
use ibc::ics26_routing::msgs::Ics26Envelope;
use ibc::timestamp::Timestamp;

use crate::error::Error;

#[cfg(any(test, feature = "mocks"))]
pub mod mock;

/// Height and time of the latest committed block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChainStatus {
    pub height: Height,
    pub timestamp: Timestamp,
}

#[async_trait]
pub trait Chain: Send + Sync {
    fn id(&self) -> &ChainId;

    fn commitment_prefix(&self) -> CommitmentPrefix;

    /// Submits one message. On success the message is committed and the events it produced
    /// are returned.
    async fn submit(&self, msg: Ics26Envelope) -> Result<Vec<IBCEvent>, Error>;

    async fn status(&self) -> Result<ChainStatus, Error>;

    async fn latest_height(&self) -> Result<Height, Error> {
        Ok(self.status().await?.height)
    }

    /// Raw value of `path` in the block at `height`, `None` if unset.
    async fn query(&self, path: &Path, height: Height) -> Result<Option<Vec<u8>>, Error>;

    /// Proof of `path` against the app hash of the block at `height`: a membership proof if
    /// the path is set, a non-membership proof otherwise.
    async fn query_proof(&self, path: &Path, height: Height) -> Result<CommitmentProofBytes, Error>;

    /// Events produced at `height` or later, oldest first.
    async fn events_since(&self, height: Height) -> Result<Vec<(Height, IBCEvent)>, Error>;

    /// The header of the block at `target`, for a client that trusts the block at `trusted`.
    async fn header(&self, target: Height, trusted: Height) -> Result<Header, Error>;

    async fn query_client_state(&self, client_id: &ClientId) -> Result<Option<ClientState>, Error>;

    async fn query_connection(&self, connection_id: &ConnectionId) -> Result<Option<ConnectionEnd>, Error>;

    async fn query_channel(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelEnd>, Error>;
}

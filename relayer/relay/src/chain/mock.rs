//! A [`Chain`] backed by an in-process [`MockChainHost`]. Every accepted message is committed
//! in a block of its own. Faults can be injected to exercise the relayer's retry paths.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use ibc::events::IBCEvent;
use ibc::ics02_client::height::Height;
use ibc::ics03_connection::connection::ConnectionEnd;
use ibc::ics04_channel::channel::ChannelEnd;
use ibc::ics04_channel::packet::Packet;
use ibc::ics07_tendermint::client_state::ClientState;
use ibc::ics07_tendermint::header::Header;
use ibc::ics23_commitment::commitment::{CommitmentPrefix, CommitmentProofBytes};
use ibc::ics24_host::identifier::{ChainId, ChannelId, ClientId, ConnectionId, PortId};
use ibc::ics24_host::path::Path;
use ibc::ics26_routing::error::Kind as RoutingKind;
use ibc::ics26_routing::msgs::Ics26Envelope;
use ibc::mock::host::{block_time, MockChainHost};

use crate::chain::{Chain, ChainStatus};
use crate::config::ChainConfig;
use crate::error::{Error, Kind};

/// Light client parameters for a mock chain. Mock chains only advance when something is
/// committed, so two of them drift apart by many block times; the clock drift allows for it.
pub fn mock_chain_config(id: ChainId) -> ChainConfig {
    ChainConfig {
        clock_drift: Duration::from_secs(3600),
        ..ChainConfig::new(id)
    }
}

#[derive(Debug, Default)]
struct Faults {
    /// Submissions still to fail as if the node were down.
    unavailable: u32,
    /// Proof queries still to answer with a proof from the block before the one requested.
    stale_proofs: u32,
}

pub struct MockChain {
    id: ChainId,
    prefix: CommitmentPrefix,
    host: Mutex<MockChainHost>,
    faults: Mutex<Faults>,
}

impl MockChain {
    pub fn new(id: ChainId) -> Self {
        let host = MockChainHost::new(id.clone());
        Self {
            id,
            prefix: host.prefix(),
            host: Mutex::new(host),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Direct access to the underlying host, e.g. to inspect the application bound to the
    /// transfer port.
    pub fn host(&self) -> MutexGuard<'_, MockChainHost> {
        self.host.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Commits `packet` on behalf of the transfer application, in a block of its own.
    pub fn send_packet(&self, packet: Packet) -> Result<(), Error> {
        let mut host = self.host();
        host.ibc()
            .send_packet(packet)
            .map_err(|e| Kind::Rejected(self.id.clone(), "send_packet").context(e))?;
        host.commit_block();
        Ok(())
    }

    /// Commits `n` empty blocks.
    pub fn produce_blocks(&self, n: u64) -> Height {
        let mut host = self.host();
        for _ in 0..n {
            host.commit_block();
        }
        host.latest_height()
    }

    /// Makes the next `n` submissions fail with [`Kind::Unavailable`].
    pub fn fail_next_submits(&self, n: u32) {
        self.faults().unavailable = n;
    }

    /// Makes the next `n` proof queries answer from the block before the requested one.
    pub fn serve_stale_proofs(&self, n: u32) {
        self.faults().stale_proofs = n;
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_fault(&self, pick: impl FnOnce(&mut Faults) -> &mut u32) -> bool {
        let mut faults = self.faults();
        let remaining = pick(&mut faults);
        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        true
    }

    fn unavailable(&self) -> Error {
        Kind::Unavailable(self.id.clone()).into()
    }
}

#[async_trait]
impl Chain for MockChain {
    fn id(&self) -> &ChainId {
        &self.id
    }

    fn commitment_prefix(&self) -> CommitmentPrefix {
        self.prefix.clone()
    }

    async fn submit(&self, msg: Ics26Envelope) -> Result<Vec<IBCEvent>, Error> {
        let name = msg.name();
        if self.take_fault(|f| &mut f.unavailable) {
            debug!("{}: dropping {} (injected fault)", self.id, name);
            return Err(self.unavailable());
        }

        let mut host = self.host();
        let events = host.ibc().deliver(msg).map_err(|e| {
            let kind = match e.kind() {
                RoutingKind::ProofVerification => Kind::VerificationFailed(self.id.clone()),
                _ => Kind::Rejected(self.id.clone(), name),
            };
            Error::from(kind.context(e))
        })?;
        let height = host.commit_block();
        debug!("{}: {} committed at {}", self.id, name, height);

        Ok(events)
    }

    async fn status(&self) -> Result<ChainStatus, Error> {
        let height = self.host().latest_height();
        Ok(ChainStatus {
            height,
            timestamp: block_time(height.revision_height),
        })
    }

    async fn query(&self, path: &Path, height: Height) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.host().query(path, height))
    }

    async fn query_proof(&self, path: &Path, height: Height) -> Result<CommitmentProofBytes, Error> {
        let at = if self.take_fault(|f| &mut f.stale_proofs) {
            height.decrement().unwrap_or(height)
        } else {
            height
        };

        self.host()
            .proof(path, at)
            .ok_or_else(|| Kind::MissingProof(self.id.clone(), path.to_string(), height).into())
    }

    async fn events_since(&self, height: Height) -> Result<Vec<(Height, IBCEvent)>, Error> {
        Ok(self.host().ibc().events_since(height))
    }

    async fn header(&self, target: Height, trusted: Height) -> Result<Header, Error> {
        self.host().header(target, trusted).ok_or_else(|| {
            Kind::Query(self.id.clone())
                .context(format!("no header at {} on top of {}", target, trusted))
                .into()
        })
    }

    async fn query_client_state(&self, client_id: &ClientId) -> Result<Option<ClientState>, Error> {
        Ok(self.host().ibc().get_client_state(client_id))
    }

    async fn query_connection(&self, connection_id: &ConnectionId) -> Result<Option<ConnectionEnd>, Error> {
        Ok(self.host().ibc().get_connection(connection_id))
    }

    async fn query_channel(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelEnd>, Error> {
        Ok(self.host().ibc().get_channel(port_id, channel_id))
    }
}

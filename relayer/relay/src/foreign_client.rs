//! A light client hosted on one chain that tracks another, and the operations the relayer
//! performs on it.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use ibc::events::IBCEvent;
use ibc::ics02_client::height::Height;
use ibc::ics02_client::msgs::{ClientMsg, MsgCreateClient, MsgUpdateClient};
use ibc::ics07_tendermint::client_state::ClientState;
use ibc::ics07_tendermint::consensus_state::ConsensusState;
use ibc::ics24_host::identifier::ClientId;
use ibc::ics24_host::path::Path;
use ibc::ics26_routing::msgs::Ics26Envelope;
use ibc::proofs::Proofs;

use crate::chain::Chain;
use crate::config::ChainConfig;
use crate::error::{Error, Kind};

#[derive(Clone)]
pub struct ForeignClient {
    /// The chain the client lives on.
    host: Arc<dyn Chain>,
    /// The chain the client follows.
    tracked: Arc<dyn Chain>,
    id: ClientId,
    /// Held while an update is read and submitted. The host rejects headers at or below the
    /// client's latest height, so two updates racing from the same trusted height would fail.
    update_lock: Arc<Mutex<()>>,
}

impl ForeignClient {
    pub fn new(host: Arc<dyn Chain>, tracked: Arc<dyn Chain>, id: ClientId) -> Self {
        Self {
            host,
            tracked,
            id,
            update_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Creates a client on `host` trusting the latest block of `tracked`, with the light client
    /// parameters configured for `tracked`.
    pub async fn create(
        host: Arc<dyn Chain>,
        tracked: Arc<dyn Chain>,
        tracked_config: &ChainConfig,
    ) -> Result<Self, Error> {
        let height = tracked.latest_height().await?;
        let header = tracked.header(height, height).await?;

        let client_state = ClientState::new(
            tracked.id().clone(),
            tracked_config.trust_threshold,
            tracked_config.trusting_period,
            tracked_config.unbonding_period,
            tracked_config.clock_drift,
            height,
        )
        .map_err(|e| Kind::Config.context(e))?;

        let events = host
            .submit(Ics26Envelope::Ics2Msg(ClientMsg::CreateClient(MsgCreateClient {
                client_state,
                consensus_state: ConsensusState::from(&header),
            })))
            .await?;

        let id = events
            .into_iter()
            .find_map(|e| match e {
                IBCEvent::CreateClient(attrs) => Some(attrs.client_id),
                _ => None,
            })
            .ok_or_else(|| Kind::ClientUpdate(format!("no client created on {}", host.id())))?;

        info!(
            "created client {} on {} tracking {} at {}",
            id,
            host.id(),
            tracked.id(),
            height
        );
        Ok(Self::new(host, tracked, id))
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    pub fn host(&self) -> &Arc<dyn Chain> {
        &self.host
    }

    pub fn tracked(&self) -> &Arc<dyn Chain> {
        &self.tracked
    }

    /// The latest height the client has verified. Fails if the client is missing or frozen.
    pub async fn latest_height(&self) -> Result<Height, Error> {
        let client_state = self
            .host
            .query_client_state(&self.id)
            .await?
            .ok_or_else(|| Kind::ClientUpdate(format!("{} not found on {}", self.id, self.host.id())))?;

        if client_state.is_frozen() {
            return Err(Kind::ClientUpdate(format!("{} is frozen", self)).into());
        }
        Ok(client_state.latest_height())
    }

    /// Makes sure the client holds a consensus state at `target` or later. Returns the
    /// client's latest height afterwards.
    pub async fn update_to(&self, target: Height) -> Result<Height, Error> {
        let _guard = self.update_lock.lock().await;

        let trusted = self.latest_height().await?;
        if trusted >= target {
            return Ok(trusted);
        }

        let header = self.tracked.header(target, trusted).await?;
        self.host
            .submit(Ics26Envelope::Ics2Msg(ClientMsg::UpdateClient(MsgUpdateClient {
                client_id: self.id.clone(),
                header,
            })))
            .await?;

        debug!("updated {} from {} to {}", self, trusted, target);
        Ok(target)
    }

    /// Brings the client up to the latest block of the tracked chain.
    pub async fn refresh(&self) -> Result<Height, Error> {
        let target = self.tracked.latest_height().await?;
        self.update_to(target).await
    }

    /// Proves `path` on the tracked chain, at a block this client holds a consensus state
    /// for: the tracked chain's latest block, or a later one the client already reached.
    pub async fn prove(&self, path: &Path) -> Result<Proofs, Error> {
        let target = self.tracked.latest_height().await?;
        let height = self.update_to(target).await?;
        let proof = self.tracked.query_proof(path, height).await?;

        Proofs::new(proof, height).map_err(|e| {
            Kind::MissingProof(self.tracked.id().clone(), path.to_string(), height)
                .context(e)
                .into()
        })
    }
}

impl fmt::Display for ForeignClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}->{}", self.id, self.host.id(), self.tracked.id())
    }
}

impl fmt::Debug for ForeignClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForeignClient({})", self)
    }
}

//! Wires the relayer together: one event monitor per chain, one packet worker per configured
//! path, and a router per chain fanning event batches out to the workers that need them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error_span, info, warn, Instrument};

use ibc::ics03_connection::connection::State as ConnectionState;
use ibc::ics04_channel::channel::State as ChannelState;
use ibc::ics24_host::identifier::{ChainId, ChannelId, ClientId, PortId};

use crate::chain::Chain;
use crate::config::{Config, PathConfig};
use crate::error::{Error, Kind};
use crate::event_monitor::{EventBatch, EventMonitor};
use crate::foreign_client::ForeignClient;
use crate::tracker::PacketTracker;
use crate::worker::{PacketWorker, RelayPath, WorkerCmd};

/// Queue depth between monitors, routers and workers.
const QUEUE_SIZE: usize = 64;

pub struct Supervisor {
    config: Config,
    chains: HashMap<ChainId, Arc<dyn Chain>>,
}

impl Supervisor {
    /// Checks the configuration and that every chain a path mentions has a handle.
    pub fn new(config: Config, chains: Vec<Arc<dyn Chain>>) -> Result<Self, Error> {
        config.validate()?;

        let chains: HashMap<ChainId, Arc<dyn Chain>> =
            chains.into_iter().map(|c| (c.id().clone(), c)).collect();
        for path in &config.paths {
            for id in &[&path.a_chain, &path.b_chain] {
                if !chains.contains_key(*id) {
                    return Err(Kind::UnknownChain((*id).clone()).into());
                }
            }
        }

        Ok(Self { config, chains })
    }

    fn chain(&self, id: &ChainId) -> Result<Arc<dyn Chain>, Error> {
        self.chains
            .get(id)
            .cloned()
            .ok_or_else(|| Kind::UnknownChain(id.clone()).into())
    }

    /// Resolves every path to its channel ends and clients, then starts the monitors, routers
    /// and workers. Only events committed after this call are relayed.
    pub async fn spawn(self) -> Result<SupervisorHandle, Error> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();
        let mut workers = Vec::new();
        let mut trackers = HashMap::new();
        let mut subscribers: HashMap<ChainId, Vec<mpsc::Sender<WorkerCmd>>> = HashMap::new();

        for path in &self.config.paths {
            let (a_to_b, b_to_a) = self.resolve(path).await?;

            trackers.insert(
                (path.a_chain.clone(), path.a_port.clone(), path.a_channel.clone()),
                a_to_b.tracker(),
            );
            trackers.insert(
                (path.b_chain.clone(), path.b_port.clone(), path.b_channel.clone()),
                b_to_a.tracker(),
            );

            let (cmd_tx, cmd_rx) = mpsc::channel(QUEUE_SIZE);
            for id in &[&path.a_chain, &path.b_chain] {
                subscribers
                    .entry((*id).clone())
                    .or_default()
                    .push(cmd_tx.clone());
            }
            workers.push(cmd_tx);

            let span = error_span!(
                "packet",
                a_chain = %path.a_chain,
                a_port = %path.a_port,
                a_channel = %path.a_channel,
                b_chain = %path.b_chain
            );
            let worker = PacketWorker::new(a_to_b, b_to_a, cmd_rx);
            tasks.push(tokio::spawn(worker.run().instrument(span)));
        }

        for (chain_id, senders) in subscribers {
            let chain = self.chain(&chain_id)?;
            let start = chain.latest_height().await?.increment();

            let (batch_tx, batch_rx) = mpsc::channel(QUEUE_SIZE);
            let monitor = EventMonitor::new(
                chain,
                start,
                batch_tx,
                shutdown_rx.clone(),
                &self.config.relay,
            );
            tasks.push(tokio::spawn(
                monitor
                    .run()
                    .instrument(error_span!("monitor", chain = %chain_id)),
            ));
            tasks.push(tokio::spawn(
                route(batch_rx, senders).instrument(error_span!("router", chain = %chain_id)),
            ));
        }

        info!(
            "relaying {} paths over {} chains",
            self.config.paths.len(),
            self.chains.len()
        );

        Ok(SupervisorHandle {
            trackers,
            workers,
            shutdown: shutdown_tx,
            tasks,
        })
    }

    /// Builds both directions of `path`, after checking that the configured channel ends are
    /// open and point at each other.
    async fn resolve(&self, path: &PathConfig) -> Result<(RelayPath, RelayPath), Error> {
        let a = self.chain(&path.a_chain)?;
        let b = self.chain(&path.b_chain)?;

        let a_client = client_of(&a, &path.a_port, &path.a_channel, &path.b_channel).await?;
        let b_client = client_of(&b, &path.b_port, &path.b_channel, &path.a_channel).await?;

        let a_end = ForeignClient::new(a.clone(), b.clone(), a_client);
        let b_end = ForeignClient::new(b, a, b_client);

        let a_to_b = RelayPath::new(
            a_end.clone(),
            b_end.clone(),
            path.a_port.clone(),
            path.a_channel.clone(),
            path.b_port.clone(),
            path.b_channel.clone(),
            path.ordering,
            self.config.relay.clone(),
        )?;
        let b_to_a = RelayPath::new(
            b_end,
            a_end,
            path.b_port.clone(),
            path.b_channel.clone(),
            path.a_port.clone(),
            path.a_channel.clone(),
            path.ordering,
            self.config.relay.clone(),
        )?;

        Ok((a_to_b, b_to_a))
    }
}

/// The client behind an open channel end on `chain`, whose counterparty must be
/// `counterparty_channel`.
async fn client_of(
    chain: &Arc<dyn Chain>,
    port_id: &PortId,
    channel_id: &ChannelId,
    counterparty_channel: &ChannelId,
) -> Result<ClientId, Error> {
    let invalid = |reason: String| -> Error {
        Kind::Config
            .context(format!("{}/{} on {}: {}", port_id, channel_id, chain.id(), reason))
            .into()
    };

    let channel = chain
        .query_channel(port_id, channel_id)
        .await?
        .ok_or_else(|| invalid("no such channel".to_string()))?;
    if channel.state() != ChannelState::Open {
        return Err(invalid(format!("channel is {}", channel.state().as_string())));
    }
    if channel.counterparty().channel_id() != Some(counterparty_channel) {
        return Err(invalid(format!(
            "counterparty is not {}",
            counterparty_channel
        )));
    }

    let connection_id = channel
        .connection_hops()
        .first()
        .ok_or_else(|| invalid("no connection hops".to_string()))?;
    let connection = chain
        .query_connection(connection_id)
        .await?
        .ok_or_else(|| invalid(format!("connection {} not found", connection_id)))?;
    if connection.state() != ConnectionState::Open {
        return Err(invalid(format!("connection {} is not open", connection_id)));
    }

    Ok(connection.client_id().clone())
}

/// Forwards each batch to every worker subscribed to the chain. Workers that went away are
/// dropped.
async fn route(mut rx: mpsc::Receiver<EventBatch>, mut senders: Vec<mpsc::Sender<WorkerCmd>>) {
    while let Some(batch) = rx.recv().await {
        let mut closed = Vec::new();
        for (i, tx) in senders.iter().enumerate() {
            if tx.send(WorkerCmd::Events(batch.clone())).await.is_err() {
                closed.push(i);
            }
        }
        for i in closed.into_iter().rev() {
            debug!("dropping a worker that stopped listening");
            senders.remove(i);
        }
    }
}

/// Controls a running relayer.
pub struct SupervisorHandle {
    /// Keyed by the sending end of each direction.
    trackers: HashMap<(ChainId, PortId, ChannelId), Arc<Mutex<PacketTracker>>>,
    workers: Vec<mpsc::Sender<WorkerCmd>>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SupervisorHandle {
    /// The tracker of packets sent from `port_id/channel_id` on `chain_id`.
    pub fn tracker(
        &self,
        chain_id: &ChainId,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Option<Arc<Mutex<PacketTracker>>> {
        self.trackers
            .get(&(chain_id.clone(), port_id.clone(), channel_id.clone()))
            .cloned()
    }

    /// Stops the monitors, lets the workers finish the batches they already have, and waits
    /// for every task to end.
    pub async fn shutdown(self) {
        if self.shutdown.send(true).is_err() {
            debug!("monitors already stopped");
        }
        for worker in &self.workers {
            if worker.send(WorkerCmd::Shutdown).await.is_err() {
                debug!("worker already stopped");
            }
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("relayer task ended abnormally: {}", e);
            }
        }
        info!("relayer stopped");
    }
}

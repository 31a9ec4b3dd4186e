//! Follows one chain's committed blocks and forwards the IBC events they produced.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use ibc::events::IBCEvent;
use ibc::ics02_client::height::Height;
use ibc::ics24_host::identifier::ChainId;

use crate::chain::Chain;
use crate::config::RelayConfig;
use crate::error::{Error, Kind};

/// Events produced by one block of a chain. A block with many events may be split over
/// several batches of the same height.
#[derive(Clone, Debug)]
pub struct EventBatch {
    pub chain_id: ChainId,
    pub height: Height,
    pub events: Vec<IBCEvent>,
}

pub struct EventMonitor {
    chain: Arc<dyn Chain>,
    /// The first height not yet forwarded.
    cursor: Height,
    tx: mpsc::Sender<EventBatch>,
    shutdown: watch::Receiver<bool>,
    poll_interval: Duration,
    batch_size: usize,
}

impl EventMonitor {
    pub fn new(
        chain: Arc<dyn Chain>,
        start: Height,
        tx: mpsc::Sender<EventBatch>,
        shutdown: watch::Receiver<bool>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            chain,
            cursor: start,
            tx,
            shutdown,
            poll_interval: config.poll_interval,
            batch_size: config.event_batch_size.max(1),
        }
    }

    pub fn cursor(&self) -> Height {
        self.cursor
    }

    /// Forwards the events of every block committed since the last poll and returns the
    /// number of batches sent.
    pub async fn poll(&mut self) -> Result<usize, Error> {
        let latest = self.chain.latest_height().await?;
        if latest < self.cursor {
            return Ok(0);
        }

        let events = self.chain.events_since(self.cursor).await?;
        let mut sent = 0;
        for batch in batches(self.chain.id(), events, latest, self.batch_size) {
            debug!(
                "{}: {} events at {}",
                batch.chain_id,
                batch.events.len(),
                batch.height
            );
            self.tx.send(batch).await.map_err(|_| Kind::ChannelClosed)?;
            sent += 1;
        }

        self.cursor = latest.increment();
        Ok(sent)
    }

    /// Polls until shutdown is signalled or nobody listens for batches anymore.
    pub async fn run(mut self) {
        info!("monitoring {} from {}", self.chain.id(), self.cursor);

        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    match self.poll().await {
                        Ok(_) => {}
                        Err(e) if e.kind() == &Kind::ChannelClosed => break,
                        Err(e) => warn!("polling {} failed: {}", self.chain.id(), e),
                    }
                }
            }
        }

        info!("stopped monitoring {} at {}", self.chain.id(), self.cursor);
    }
}

/// Groups `events` by height, leaving out anything above `latest`, in chunks of at most
/// `batch_size`.
fn batches(
    chain_id: &ChainId,
    events: Vec<(Height, IBCEvent)>,
    latest: Height,
    batch_size: usize,
) -> Vec<EventBatch> {
    let mut batches: Vec<EventBatch> = Vec::new();

    for (height, event) in events.into_iter().filter(|(h, _)| *h <= latest) {
        match batches.last_mut() {
            Some(last) if last.height == height && last.events.len() < batch_size => {
                last.events.push(event)
            }
            _ => batches.push(EventBatch {
                chain_id: chain_id.clone(),
                height,
                events: vec![event],
            }),
        }
    }

    batches
}

#[cfg(test)]
mod tests {
    use tokio::sync::{mpsc, watch};

    use ibc::events::{ClientAttributes, IBCEvent};
    use ibc::ics02_client::client_type::ClientType;
    use ibc::ics02_client::height::Height;
    use ibc::ics04_channel::channel::Order;
    use ibc::ics24_host::identifier::{ChainId, ClientId};

    use super::{batches, EventMonitor};
    use crate::chain::Chain;
    use crate::testing::{linked, quick_config};

    #[tokio::test]
    async fn forwards_each_block_once() {
        let link = linked(Order::Unordered).await;
        let (tx, mut rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let start = link.a.latest_height().await.unwrap().increment();
        let mut monitor = EventMonitor::new(link.a.clone(), start, tx, shutdown_rx, &quick_config());

        assert_eq!(monitor.poll().await.unwrap(), 0);

        link.a.send_packet(link.packet(1)).unwrap();
        link.a.send_packet(link.packet(2)).unwrap();
        assert_eq!(monitor.poll().await.unwrap(), 2);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(first.height < second.height);
        assert_eq!(&first.chain_id, link.a.id());
        assert!(matches!(first.events[0], IBCEvent::SendPacketChannel(_)));

        // Nothing new: nothing sent, the cursor stays past the last block.
        assert_eq!(monitor.poll().await.unwrap(), 0);
        assert_eq!(monitor.cursor(), link.a.latest_height().await.unwrap().increment());
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let link = linked(Order::Unordered).await;
        let (tx, _rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let monitor = EventMonitor::new(link.b.clone(), Height::zero(), tx, shutdown_rx, &quick_config());
        let handle = tokio::spawn(monitor.run());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn large_blocks_are_split() {
        let chain_id = ChainId::new("chain-a".to_string(), 0);
        let event = |h: u64| {
            let attributes = ClientAttributes {
                client_id: ClientId::new(ClientType::Tendermint, 0).unwrap(),
                client_type: ClientType::Tendermint,
                consensus_height: Height::new(0, h),
            };
            (Height::new(0, h), IBCEvent::UpdateClient(attributes))
        };
        let events = vec![event(3), event(3), event(3), event(4), event(9)];

        let out = batches(&chain_id, events, Height::new(0, 5), 2);
        let shape: Vec<(u64, usize)> = out
            .iter()
            .map(|b| (b.height.revision_height, b.events.len()))
            .collect();
        assert_eq!(shape, vec![(3, 2), (3, 1), (4, 1)]);
    }
}

//! Packet relaying for one channel path.
//!
//! A [`RelayPath`] moves the packets of one direction, from the chain that sent them to the
//! chain that receives them, and brings acknowledgements and timeouts back. A
//! [`PacketWorker`] owns both directions of a channel and feeds them the event batches of
//! the two chains.

use std::collections::BTreeMap;
use std::convert::TryInto;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

use ibc::events::IBCEvent;
use ibc::ics02_client::height::Height;
use ibc::ics04_channel::channel::Order;
use ibc::ics04_channel::msgs::{MsgAcknowledgement, MsgRecvPacket, MsgTimeout, PacketMsg};
use ibc::ics04_channel::packet::{Packet, Sequence};
use ibc::ics24_host::identifier::{ChannelId, PortId};
use ibc::ics24_host::path::Path;
use ibc::ics26_routing::msgs::Ics26Envelope;

use crate::chain::Chain;
use crate::config::RelayConfig;
use crate::error::{Error, Kind};
use crate::event_monitor::EventBatch;
use crate::foreign_client::ForeignClient;
use crate::tracker::{PacketKey, PacketState, PacketTracker};
use crate::util::retry::backoff;

#[derive(Clone, Debug)]
pub enum WorkerCmd {
    Events(EventBatch),
    Shutdown,
}

enum Delivery {
    /// Received; carries the acknowledgement if the destination wrote it right away.
    Received(Option<Vec<u8>>),
    TimedOut,
}

/// Packets of an ordered channel waiting for their turn.
#[derive(Debug, Default)]
struct OrderedSlot {
    /// The destination's next receive sequence, once known.
    next: Option<Sequence>,
    buffered: BTreeMap<Sequence, Packet>,
    /// The sequence the channel gave up on. Nothing after it can be received.
    stalled: Option<Sequence>,
}

pub struct RelayPath {
    /// Lives on the source chain and tracks the destination.
    src_client: ForeignClient,
    /// Lives on the destination chain and tracks the source.
    dst_client: ForeignClient,
    src_port: PortId,
    src_channel: ChannelId,
    dst_port: PortId,
    dst_channel: ChannelId,
    ordering: Order,
    tracker: Arc<Mutex<PacketTracker>>,
    slot: AsyncMutex<OrderedSlot>,
    config: RelayConfig,
}

impl RelayPath {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        src_client: ForeignClient,
        dst_client: ForeignClient,
        src_port: PortId,
        src_channel: ChannelId,
        dst_port: PortId,
        dst_channel: ChannelId,
        ordering: Order,
        config: RelayConfig,
    ) -> Result<Self, Error> {
        if src_client.host().id() != dst_client.tracked().id()
            || dst_client.host().id() != src_client.tracked().id()
        {
            return Err(Kind::Config
                .context(format!(
                    "clients {} and {} do not join the same two chains",
                    src_client, dst_client
                ))
                .into());
        }

        Ok(Self {
            src_client,
            dst_client,
            src_port,
            src_channel,
            dst_port,
            dst_channel,
            ordering,
            tracker: Arc::new(Mutex::new(PacketTracker::new())),
            slot: AsyncMutex::new(OrderedSlot::default()),
            config,
        })
    }

    pub fn src_chain(&self) -> &Arc<dyn Chain> {
        self.src_client.host()
    }

    pub fn dst_chain(&self) -> &Arc<dyn Chain> {
        self.dst_client.host()
    }

    pub fn tracker(&self) -> Arc<Mutex<PacketTracker>> {
        self.tracker.clone()
    }

    fn with_tracker<T>(&self, f: impl FnOnce(&mut PacketTracker) -> T) -> T {
        let mut tracker: MutexGuard<'_, PacketTracker> =
            self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut tracker)
    }

    fn is_ours(&self, packet: &Packet) -> bool {
        packet.source_port == self.src_port
            && packet.source_channel == self.src_channel
            && packet.destination_port == self.dst_port
            && packet.destination_channel == self.dst_channel
    }

    /// Handles events of the source chain: relays newly sent packets and settles packets the
    /// source reports acknowledged or timed out.
    pub async fn handle_src_events(&self, events: &[IBCEvent]) {
        let mut fresh = Vec::new();

        for event in events {
            match event {
                IBCEvent::SendPacketChannel(attrs) if self.is_ours(&attrs.packet) => {
                    if self.with_tracker(|t| t.observe(&attrs.packet)) {
                        fresh.push(attrs.packet.clone());
                    } else {
                        debug!("[{}] {} already tracked", self, attrs.packet.sequence);
                    }
                }
                IBCEvent::AcknowledgePacketChannel(attrs) if self.is_ours(&attrs.packet) => {
                    self.settle(&attrs.packet, PacketState::Acknowledged)
                }
                IBCEvent::TimeoutPacketChannel(attrs) if self.is_ours(&attrs.packet) => {
                    self.settle(&attrs.packet, PacketState::TimedOut)
                }
                _ => {}
            }
        }

        self.relay(fresh).await;
    }

    /// Handles events of the destination chain: acknowledgements written for packets that
    /// were received without one are sent back to the source.
    pub async fn handle_dst_events(&self, events: &[IBCEvent]) {
        for event in events {
            if let IBCEvent::WriteAcknowledgementChannel(attrs) = event {
                if !self.is_ours(&attrs.packet) {
                    continue;
                }
                let key = PacketKey::of(&attrs.packet);
                if self.with_tracker(|t| t.state(&key)) == Some(PacketState::Relayed) {
                    self.acknowledge_or_fail(&attrs.packet, attrs.ack.clone()).await;
                }
            }
        }
    }

    fn settle(&self, packet: &Packet, outcome: PacketState) {
        let key = PacketKey::of(packet);
        if self.with_tracker(|t| t.complete(&key, outcome)) {
            info!("[{}] {} settled on the source as {}", self, packet.sequence, outcome);
        }
    }

    /// Relays freshly detected packets: all at once on an unordered channel, one at a time in
    /// sequence order on an ordered one.
    pub async fn relay(&self, packets: Vec<Packet>) {
        if packets.is_empty() {
            return;
        }

        match self.ordering {
            Order::Ordered => self.relay_ordered(packets).await,
            _ => {
                join_all(packets.into_iter().map(|p| self.relay_packet(p))).await;
            }
        }
    }

    async fn relay_ordered(&self, packets: Vec<Packet>) {
        let mut slot = self.slot.lock().await;
        for packet in packets {
            slot.buffered.insert(packet.sequence, packet);
        }

        if let Some(at) = slot.stalled {
            self.fail_behind(&mut slot, at);
            return;
        }

        let mut next = match slot.next {
            Some(next) => next,
            None => match self.dst_next_sequence_recv().await {
                Ok(next) => next,
                Err(e) => {
                    warn!("[{}] cannot read the next receive sequence: {}", self, e);
                    return;
                }
            },
        };

        while let Some(packet) = slot.buffered.remove(&next) {
            if self.relay_packet(packet).await == PacketState::Failed {
                error!("[{}] ordered channel stalled at sequence {}", self, next);
                slot.stalled = Some(next);
                slot.next = Some(next);
                self.fail_behind(&mut slot, next);
                return;
            }
            next = next.increment();
        }
        slot.next = Some(next);

        if !slot.buffered.is_empty() {
            debug!(
                "[{}] {} packets wait behind sequence {}",
                self,
                slot.buffered.len(),
                next
            );
        }
    }

    /// Fails every buffered packet of an ordered channel stalled at `at`.
    fn fail_behind(&self, slot: &mut OrderedSlot, at: Sequence) {
        for (sequence, packet) in std::mem::take(&mut slot.buffered) {
            if self.with_tracker(|t| t.complete(&PacketKey::of(&packet), PacketState::Failed)) {
                error!(
                    "[{}] {} cannot be received: ordered channel stalled at sequence {}",
                    self, sequence, at
                );
            }
        }
    }

    /// Takes one packet as far through its lifecycle as it can go and returns where it ended.
    /// Errors abandon the packet.
    async fn relay_packet(&self, packet: Packet) -> PacketState {
        let key = PacketKey::of(&packet);
        match self.drive(&key, &packet).await {
            Ok(state) => state,
            Err(e) => {
                error!("[{}] giving up on {}: {}", self, packet, e);
                self.with_tracker(|t| t.complete(&key, PacketState::Failed));
                PacketState::Failed
            }
        }
    }

    async fn drive(&self, key: &PacketKey, packet: &Packet) -> Result<PacketState, Error> {
        self.with_tracker(|t| t.transition(key, PacketState::AwaitingProof))?;

        match self.receive(packet).await? {
            Delivery::TimedOut => {
                self.with_tracker(|t| t.transition(key, PacketState::TimedOut))?;
                info!("[{}] {} timed out", self, packet.sequence);
                Ok(PacketState::TimedOut)
            }
            Delivery::Received(ack) => {
                self.with_tracker(|t| t.transition(key, PacketState::Relayed))?;
                debug!("[{}] {} received", self, packet.sequence);
                match ack {
                    Some(ack) => self.acknowledge(packet, ack).await,
                    None => Ok(PacketState::Relayed),
                }
            }
        }
    }

    /// Delivers the packet to the destination, unless it timed out there, in which case the
    /// timeout is proven to the source instead. The timeout is checked before every attempt.
    async fn receive(&self, packet: &Packet) -> Result<Delivery, Error> {
        self.with_recovery("recv_packet", &self.dst_client, move || async move {
            if self.timed_out_on_dst(packet).await? {
                self.with_recovery("timeout_packet", &self.src_client, || self.submit_timeout(packet))
                    .await?;
                return Ok(Delivery::TimedOut);
            }
            self.submit_recv(packet).await.map(Delivery::Received)
        })
        .await
    }

    async fn acknowledge(&self, packet: &Packet, ack: Vec<u8>) -> Result<PacketState, Error> {
        let key = PacketKey::of(packet);
        self.with_tracker(|t| t.record_ack(&key, ack.clone()))?;

        self.with_recovery("acknowledge_packet", &self.src_client, || self.submit_ack(packet, &ack))
            .await?;

        self.with_tracker(|t| t.transition(&key, PacketState::Acknowledged))?;
        info!("[{}] {} acknowledged", self, packet.sequence);
        Ok(PacketState::Acknowledged)
    }

    async fn acknowledge_or_fail(&self, packet: &Packet, ack: Vec<u8>) {
        if let Err(e) = self.acknowledge(packet, ack).await {
            error!("[{}] giving up on the acknowledgement of {}: {}", self, packet, e);
            self.with_tracker(|t| t.complete(&PacketKey::of(packet), PacketState::Failed));
        }
    }

    /// Runs `op` with bounded backoff on transient failures. The first time the chain rejects
    /// a proof, `client` is brought up to date and `op` gets one more try; a second rejection
    /// is final.
    async fn with_recovery<T, F, Fut>(&self, what: &str, client: &ForeignClient, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut delays = backoff(&self.config);
        let mut attempts = 1;
        let mut refreshed = false;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.kind().is_verification_failure() && !refreshed => {
                    warn!("[{}] {} proof rejected, refreshing {}: {}", self, what, client, e);
                    refreshed = true;
                    client.refresh().await?;
                }
                Err(e) if e.kind().is_transient() => match delays.next() {
                    Some(delay) => {
                        warn!(
                            "[{}] {} failed on attempt {}: {}, retrying in {:?}",
                            self, what, attempts, e, delay
                        );
                        tokio::time::sleep(delay).await;
                        attempts += 1;
                    }
                    None => return Err(Kind::MaxRetry(attempts).context(e).into()),
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn timed_out_on_dst(&self, packet: &Packet) -> Result<bool, Error> {
        let status = self.dst_chain().status().await?;
        Ok(packet.timed_out(status.height, status.timestamp))
    }

    async fn submit_recv(&self, packet: &Packet) -> Result<Option<Vec<u8>>, Error> {
        let proofs = self
            .dst_client
            .prove(&Path::Commitments {
                port_id: packet.source_port.clone(),
                channel_id: packet.source_channel.clone(),
                sequence: packet.sequence,
            })
            .await?;

        let events = self
            .dst_chain()
            .submit(Ics26Envelope::Ics4PacketMsg(PacketMsg::RecvPacket(MsgRecvPacket {
                packet: packet.clone(),
                proofs,
            })))
            .await?;

        Ok(events.into_iter().find_map(|e| match e {
            IBCEvent::WriteAcknowledgementChannel(attrs) if attrs.packet.sequence == packet.sequence => {
                Some(attrs.ack)
            }
            _ => None,
        }))
    }

    async fn submit_ack(&self, packet: &Packet, ack: &[u8]) -> Result<(), Error> {
        let proofs = self
            .src_client
            .prove(&Path::Acks {
                port_id: packet.destination_port.clone(),
                channel_id: packet.destination_channel.clone(),
                sequence: packet.sequence,
            })
            .await?;

        self.src_chain()
            .submit(Ics26Envelope::Ics4PacketMsg(PacketMsg::AckPacket(MsgAcknowledgement {
                packet: packet.clone(),
                acknowledgement: ack.to_vec(),
                proofs,
            })))
            .await?;
        Ok(())
    }

    /// Proves to the source that the destination never received `packet`: by the absence of
    /// a receipt on an unordered channel, by the next receive sequence on an ordered one.
    async fn submit_timeout(&self, packet: &Packet) -> Result<(), Error> {
        let (proofs, next_sequence_recv) = match self.ordering {
            Order::Ordered => {
                let proofs = self
                    .src_client
                    .prove(&Path::SeqRecvs(self.dst_port.clone(), self.dst_channel.clone()))
                    .await?;
                let next = self.next_sequence_recv_at(proofs.height()).await?;
                (proofs, next)
            }
            _ => {
                let proofs = self
                    .src_client
                    .prove(&Path::Receipts {
                        port_id: self.dst_port.clone(),
                        channel_id: self.dst_channel.clone(),
                        sequence: packet.sequence,
                    })
                    .await?;
                (proofs, packet.sequence)
            }
        };

        self.src_chain()
            .submit(Ics26Envelope::Ics4PacketMsg(PacketMsg::TimeoutPacket(MsgTimeout {
                packet: packet.clone(),
                next_sequence_recv,
                proofs,
            })))
            .await?;
        Ok(())
    }

    async fn dst_next_sequence_recv(&self) -> Result<Sequence, Error> {
        let height = self.dst_chain().latest_height().await?;
        self.next_sequence_recv_at(height).await
    }

    async fn next_sequence_recv_at(&self, height: Height) -> Result<Sequence, Error> {
        let path = Path::SeqRecvs(self.dst_port.clone(), self.dst_channel.clone());
        let value = self
            .dst_chain()
            .query(&path, height)
            .await?
            .ok_or_else(|| Kind::Query(self.dst_chain().id().clone()).context(format!("{} is unset", path)))?;

        let raw: [u8; 8] = value.as_slice().try_into().map_err(|_| {
            Kind::Query(self.dst_chain().id().clone())
                .context(format!("{} holds {} bytes", path, value.len()))
        })?;
        Ok(Sequence::from(u64::from_be_bytes(raw)))
    }
}

impl fmt::Display for RelayPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{} -> {}:{}/{}",
            self.src_chain().id(),
            self.src_port,
            self.src_channel,
            self.dst_chain().id(),
            self.dst_port,
            self.dst_channel
        )
    }
}

/// Relays both directions of one channel. Runs until it is told to shut down or its command
/// queue closes.
pub struct PacketWorker {
    a_to_b: RelayPath,
    b_to_a: RelayPath,
    cmd_rx: mpsc::Receiver<WorkerCmd>,
}

impl PacketWorker {
    pub fn new(a_to_b: RelayPath, b_to_a: RelayPath, cmd_rx: mpsc::Receiver<WorkerCmd>) -> Self {
        Self {
            a_to_b,
            b_to_a,
            cmd_rx,
        }
    }

    pub async fn run(mut self) {
        info!("packet worker started for {}", self.a_to_b);

        while let Some(cmd) = self.cmd_rx.recv().await {
            match cmd {
                WorkerCmd::Events(batch) => self.handle(batch).await,
                WorkerCmd::Shutdown => break,
            }
        }

        info!("packet worker stopped for {}", self.a_to_b);
    }

    async fn handle(&self, batch: EventBatch) {
        let events = &batch.events;

        if &batch.chain_id == self.a_to_b.src_chain().id() {
            futures::join!(
                self.a_to_b.handle_src_events(events),
                self.b_to_a.handle_dst_events(events)
            );
        } else if &batch.chain_id == self.b_to_a.src_chain().id() {
            futures::join!(
                self.b_to_a.handle_src_events(events),
                self.a_to_b.handle_dst_events(events)
            );
        } else {
            debug!("ignoring events of unrelated chain {}", batch.chain_id);
        }
    }
}

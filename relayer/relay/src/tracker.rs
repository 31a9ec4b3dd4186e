//! Lifecycle bookkeeping for the packets of one channel path.
//!
//! Every packet seen on the source chain is tracked from detection until it is either
//! acknowledged, timed out, or given up on. A settled packet keeps only its key and outcome, so
//! that an event seen twice (e.g. after a monitor restart) does not relay it again. The oldest
//! outcomes are eventually folded into a per-channel sequence watermark.

use std::collections::BTreeMap;
use std::fmt;

use ibc::ics04_channel::packet::{Packet, Sequence};
use ibc::ics24_host::identifier::{ChannelId, PortId};

use crate::error::{Error, Kind};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PacketState {
    /// Committed on the source chain, nothing done yet.
    Detected,
    /// A proof of the commitment is being fetched and submitted to the destination.
    AwaitingProof,
    /// Received on the destination.
    Relayed,
    /// The destination wrote an acknowledgement that has to go back to the source.
    AwaitingAck,
    Acknowledged,
    TimedOut,
    /// Abandoned after retries ran out or a proof kept failing verification.
    Failed,
}

impl PacketState {
    pub fn is_final(self) -> bool {
        matches!(
            self,
            PacketState::Acknowledged | PacketState::TimedOut | PacketState::Failed
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`. Any packet in flight can
    /// time out or fail. Final states are never left.
    pub fn can_move_to(self, next: PacketState) -> bool {
        use PacketState::*;

        if self.is_final() {
            return false;
        }
        match (self, next) {
            (_, TimedOut) | (_, Failed) => true,
            (Detected, AwaitingProof) => true,
            (AwaitingProof, Relayed) => true,
            (Relayed, AwaitingAck) => true,
            (AwaitingAck, Acknowledged) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PacketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identifies a packet by its source end.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketKey {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub sequence: Sequence,
}

impl PacketKey {
    pub fn of(packet: &Packet) -> Self {
        Self {
            port_id: packet.source_port.clone(),
            channel_id: packet.source_channel.clone(),
            sequence: packet.sequence,
        }
    }
}

impl fmt::Display for PacketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.port_id, self.channel_id, self.sequence)
    }
}

#[derive(Clone, Debug)]
struct Entry {
    packet: Packet,
    state: PacketState,
    ack: Option<Vec<u8>>,
}

/// Number of tracked packets per state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub in_flight: usize,
    pub acknowledged: usize,
    pub timed_out: usize,
    pub failed: usize,
}

/// Final outcomes kept before the oldest ones are folded into their channel's watermark.
pub const DEFAULT_RETENTION: usize = 4096;

#[derive(Debug)]
pub struct PacketTracker {
    /// Packets not yet in a final state, with everything needed to relay them.
    in_flight: BTreeMap<PacketKey, Entry>,
    /// Outcomes of settled packets. Payloads and acknowledgements are dropped on settlement.
    settled: BTreeMap<PacketKey, PacketState>,
    /// Per source channel, the highest sequence folded out of `settled`. Sequences at or below
    /// it count as settled.
    watermarks: BTreeMap<(PortId, ChannelId), Sequence>,
    retention: usize,
    /// Outcome counts, including the folded ones.
    totals: Summary,
}

impl Default for PacketTracker {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl PacketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker remembering the outcome of at most `retention` settled packets.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            in_flight: BTreeMap::new(),
            settled: BTreeMap::new(),
            watermarks: BTreeMap::new(),
            retention: retention.max(1),
            totals: Summary::default(),
        }
    }

    /// Starts tracking `packet` in [`PacketState::Detected`]. Returns false, and changes
    /// nothing, if the packet is already known, whatever its state.
    pub fn observe(&mut self, packet: &Packet) -> bool {
        let key = PacketKey::of(packet);
        if self.in_flight.contains_key(&key) || self.is_settled(&key) {
            return false;
        }
        self.in_flight.insert(
            key,
            Entry {
                packet: packet.clone(),
                state: PacketState::Detected,
                ack: None,
            },
        );
        true
    }

    /// Moves a tracked packet to `next` and returns the state it left.
    pub fn transition(&mut self, key: &PacketKey, next: PacketState) -> Result<PacketState, Error> {
        let current = match self.state(key) {
            Some(state) => state,
            None => return Err(untracked(key)),
        };
        if !current.can_move_to(next) {
            return Err(Kind::InvalidTransition(
                key.to_string(),
                current.to_string(),
                next.to_string(),
            )
            .into());
        }
        if next.is_final() {
            self.settle(key, next);
        } else {
            self.entry_mut(key)?.state = next;
        }
        Ok(current)
    }

    /// Keeps the acknowledgement the destination wrote and moves the packet to
    /// [`PacketState::AwaitingAck`].
    pub fn record_ack(&mut self, key: &PacketKey, ack: Vec<u8>) -> Result<(), Error> {
        self.transition(key, PacketState::AwaitingAck)?;
        self.entry_mut(key)?.ack = Some(ack);
        Ok(())
    }

    /// Settles a packet in the final state `outcome`, e.g. because the source chain reports it
    /// acknowledged or timed out by someone else. Returns false if the packet is unknown or
    /// already settled.
    pub fn complete(&mut self, key: &PacketKey, outcome: PacketState) -> bool {
        if !outcome.is_final() || !self.in_flight.contains_key(key) {
            return false;
        }
        self.settle(key, outcome);
        true
    }

    /// The state of a packet. Settled packets folded into the watermark have none left.
    pub fn state(&self, key: &PacketKey) -> Option<PacketState> {
        self.in_flight
            .get(key)
            .map(|e| e.state)
            .or_else(|| self.settled.get(key).copied())
    }

    /// The payload of a packet still in flight.
    pub fn packet(&self, key: &PacketKey) -> Option<&Packet> {
        self.in_flight.get(key).map(|e| &e.packet)
    }

    pub fn ack(&self, key: &PacketKey) -> Option<&[u8]> {
        self.in_flight.get(key).and_then(|e| e.ack.as_deref())
    }

    /// Packets not yet in a final state, lowest sequence first.
    pub fn pending(&self) -> Vec<PacketKey> {
        self.in_flight.keys().cloned().collect()
    }

    /// Number of packets the tracker holds anything for, in flight or settled.
    pub fn retained(&self) -> usize {
        self.in_flight.len() + self.settled.len()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            in_flight: self.in_flight.len(),
            ..self.totals
        }
    }

    fn is_settled(&self, key: &PacketKey) -> bool {
        if self.settled.contains_key(key) {
            return true;
        }
        self.watermarks
            .get(&(key.port_id.clone(), key.channel_id.clone()))
            .map_or(false, |mark| key.sequence <= *mark)
    }

    fn settle(&mut self, key: &PacketKey, outcome: PacketState) {
        self.in_flight.remove(key);
        self.settled.insert(key.clone(), outcome);
        match outcome {
            PacketState::Acknowledged => self.totals.acknowledged += 1,
            PacketState::TimedOut => self.totals.timed_out += 1,
            _ => self.totals.failed += 1,
        }

        while self.settled.len() > self.retention {
            let oldest = match self.settled.keys().next() {
                Some(key) => key.clone(),
                None => break,
            };
            self.settled.remove(&oldest);
            let mark = self
                .watermarks
                .entry((oldest.port_id, oldest.channel_id))
                .or_insert(oldest.sequence);
            if *mark < oldest.sequence {
                *mark = oldest.sequence;
            }
        }
    }

    fn entry_mut(&mut self, key: &PacketKey) -> Result<&mut Entry, Error> {
        self.in_flight.get_mut(key).ok_or_else(|| untracked(key))
    }
}

fn untracked(key: &PacketKey) -> Error {
    Kind::InvalidTransition(key.to_string(), "untracked".to_string(), "any".to_string()).into()
}

//! The IBC host: a routing context backed by a [`KvStore`].
//!
//! Every record lives in the `ibc` namespace under the key of its ICS-24 [`Path`]. Typed
//! records are protobuf-encoded, sequences and counters are 8-byte big-endian integers, packet
//! commitments and acknowledgements are stored as their hashes, and receipts as a single byte.
//!
//! Messages are processed under fine-grained locks: one per client, connection, channel end
//! and identifier counter. Messages touching disjoint objects run concurrently; messages on
//! the same object are serialized, so that a handler never observes a half-applied result.

use std::collections::{HashSet, VecDeque};
use std::convert::TryFrom;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};

use prost::Message;
use tracing::{debug, error, info, warn};

use crate::events::IBCEvent;
use crate::handler::HandlerOutput;
use crate::ics02_client::context::{ClientKeeper, ClientReader};
use crate::ics02_client::error::Error as ClientError;
use crate::ics02_client::handler::ClientResult;
use crate::ics02_client::height::Height;
use crate::ics02_client::msgs::{ClientMsg, MsgCreateClient, MsgSubmitMisbehaviour, MsgUpdateClient};
use crate::ics02_client::status::Status;
use crate::ics03_connection::connection::ConnectionEnd;
use crate::ics03_connection::context::{ConnectionKeeper, ConnectionReader};
use crate::ics03_connection::error::Error as ConnectionError;
use crate::ics03_connection::msgs::{
    ConnectionMsg, MsgConnectionOpenAck, MsgConnectionOpenConfirm, MsgConnectionOpenInit,
    MsgConnectionOpenTry,
};
use crate::ics03_connection::version::{get_compatible_versions, Version};
use crate::ics04_channel::channel::ChannelEnd;
use crate::ics04_channel::context::{ChannelKeeper, ChannelReader};
use crate::ics04_channel::error::Error as ChannelError;
use crate::ics04_channel::msgs::{
    ChannelMsg, MsgAcknowledgement, MsgChannelOpenAck, MsgChannelOpenConfirm,
    MsgChannelOpenInit, MsgChannelOpenTry, MsgRecvPacket, MsgTimeout, PacketMsg,
};
use crate::ics04_channel::packet::{Packet, Sequence};
use crate::ics07_tendermint::client_state::ClientState;
use crate::ics07_tendermint::consensus_state::ConsensusState;
use crate::ics23_commitment::commitment::CommitmentPrefix;
use crate::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};
use crate::ics24_host::path::Path;
use crate::ics26_routing::context::{Ics26Context, Module, Router};
use crate::ics26_routing::error::{Error, Kind};
use crate::ics26_routing::handler::{dispatch, send, Ics26Result};
use crate::ics26_routing::msgs::Ics26Envelope;
use crate::proto::{
    RawChannel, RawClientState, RawConnectionEnd, RawConsensusHeights, RawConsensusState,
    RawHeight, RawIdentifierList,
};
use crate::store::KvStore;
use crate::timestamp::Timestamp;

/// Namespace of the host store holding every IBC record.
pub const IBC_STORE: &str = "ibc";

const CLIENTS: &str = "clients";
const CONNECTIONS: &str = "connections";
const CHANNELS: &str = "channels";

const PRESENT: &[u8] = &[1];

/// Events kept by default before the oldest are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

pub struct IbcHost<S: KvStore> {
    store: S,
    prefix: CommitmentPrefix,
    locks: LockRegistry,
    router: RwLock<Router>,
    events: RwLock<VecDeque<(Height, IBCEvent)>>,
    event_capacity: usize,
}

impl<S: KvStore> IbcHost<S> {
    pub fn new(store: S, prefix: CommitmentPrefix) -> Self {
        Self {
            store,
            prefix,
            locks: LockRegistry::default(),
            router: RwLock::new(Router::default()),
            events: RwLock::new(VecDeque::new()),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Keeps at most `capacity` events; older ones are dropped as new ones are recorded.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        let capacity = self.event_capacity;
        let events = self.events.get_mut().unwrap_or_else(PoisonError::into_inner);
        while events.len() > capacity {
            events.pop_front();
        }
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn prefix(&self) -> &CommitmentPrefix {
        &self.prefix
    }

    /// Binds `module` to `port_id`. A port is bound at most once.
    pub fn bind_port(&self, port_id: PortId, module: Arc<dyn Module>) -> Result<(), Error> {
        let mut router = self.router.write().unwrap_or_else(PoisonError::into_inner);
        if !router.add_route(port_id.clone(), module) {
            return Err(Kind::PortAlreadyBound(port_id).into());
        }
        self.set_raw(&Path::Ports(port_id.clone()), PRESENT.to_vec());
        info!("bound a module to port {}", port_id);
        Ok(())
    }

    /// Processes one message atomically: either every state change it implies is applied and
    /// its events are recorded at the current height, or nothing changes.
    pub fn deliver(&self, msg: Ics26Envelope) -> Result<Vec<IBCEvent>, Error> {
        self.execute(msg).map(|output| output.events)
    }

    pub fn create_client(&self, msg: MsgCreateClient) -> Result<ClientId, Error> {
        let output = self.execute(Ics26Envelope::Ics2Msg(ClientMsg::CreateClient(msg)))?;
        match output.result {
            Ics26Result::Client(ClientResult::Create(res)) => Ok(res.client_id),
            _ => Err(Kind::UnexpectedResult("create_client").into()),
        }
    }

    pub fn update_client(&self, msg: MsgUpdateClient) -> Result<(), Error> {
        self.execute(Ics26Envelope::Ics2Msg(ClientMsg::UpdateClient(msg)))
            .map(|_| ())
    }

    pub fn submit_misbehavior(&self, msg: MsgSubmitMisbehaviour) -> Result<(), Error> {
        self.execute(Ics26Envelope::Ics2Msg(ClientMsg::SubmitMisbehaviour(msg)))
            .map(|_| ())
    }

    pub fn conn_open_init(&self, msg: MsgConnectionOpenInit) -> Result<ConnectionId, Error> {
        self.connection_step(ConnectionMsg::ConnectionOpenInit(msg))
    }

    pub fn conn_open_try(&self, msg: MsgConnectionOpenTry) -> Result<ConnectionId, Error> {
        self.connection_step(ConnectionMsg::ConnectionOpenTry(Box::new(msg)))
    }

    pub fn conn_open_ack(&self, msg: MsgConnectionOpenAck) -> Result<(), Error> {
        self.connection_step(ConnectionMsg::ConnectionOpenAck(Box::new(msg)))
            .map(|_| ())
    }

    pub fn conn_open_confirm(&self, msg: MsgConnectionOpenConfirm) -> Result<(), Error> {
        self.connection_step(ConnectionMsg::ConnectionOpenConfirm(msg))
            .map(|_| ())
    }

    pub fn chan_open_init(&self, msg: MsgChannelOpenInit) -> Result<ChannelId, Error> {
        self.channel_step(ChannelMsg::ChannelOpenInit(msg))
    }

    pub fn chan_open_try(&self, msg: MsgChannelOpenTry) -> Result<ChannelId, Error> {
        self.channel_step(ChannelMsg::ChannelOpenTry(Box::new(msg)))
    }

    pub fn chan_open_ack(&self, msg: MsgChannelOpenAck) -> Result<(), Error> {
        self.channel_step(ChannelMsg::ChannelOpenAck(Box::new(msg)))
            .map(|_| ())
    }

    pub fn chan_open_confirm(&self, msg: MsgChannelOpenConfirm) -> Result<(), Error> {
        self.channel_step(ChannelMsg::ChannelOpenConfirm(msg))
            .map(|_| ())
    }

    /// Commits an outgoing packet. The packet sequence must be the channel's next send
    /// sequence.
    pub fn send_packet(&self, packet: Packet) -> Result<(), Error> {
        let _guard = self.locks.acquire(vec![channel_lock(
            &packet.source_port,
            &packet.source_channel,
        )]);

        let output = send(self, packet).map_err(|e| {
            warn!("send_packet rejected: {}", e);
            e
        })?;
        self.record(&output);
        Ok(())
    }

    /// Receives a packet and returns the acknowledgement the destination application wrote.
    pub fn recv_packet(&self, msg: MsgRecvPacket) -> Result<Vec<u8>, Error> {
        let output = self.execute(Ics26Envelope::Ics4PacketMsg(PacketMsg::RecvPacket(msg)))?;
        match output.result {
            Ics26Result::Packet {
                acknowledgement: Some(ack),
                ..
            } => Ok(ack),
            _ => Err(Kind::UnexpectedResult("recv_packet").into()),
        }
    }

    pub fn acknowledge_packet(&self, msg: MsgAcknowledgement) -> Result<(), Error> {
        self.execute(Ics26Envelope::Ics4PacketMsg(PacketMsg::AckPacket(msg)))
            .map(|_| ())
    }

    pub fn timeout_packet(&self, msg: MsgTimeout) -> Result<(), Error> {
        self.execute(Ics26Envelope::Ics4PacketMsg(PacketMsg::TimeoutPacket(msg)))
            .map(|_| ())
    }

    pub fn get_client_state(&self, client_id: &ClientId) -> Option<ClientState> {
        self.read_client_state(client_id)
    }

    pub fn get_consensus_state(&self, client_id: &ClientId, height: Height) -> Option<ConsensusState> {
        self.read_consensus_state(client_id, height)
    }

    pub fn get_connection(&self, connection_id: &ConnectionId) -> Option<ConnectionEnd> {
        self.read_connection(connection_id)
    }

    pub fn get_channel(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<ChannelEnd> {
        self.read_channel(port_id, channel_id)
    }

    /// The connections opened on top of `client_id`, in creation order.
    pub fn client_connections(&self, client_id: &ClientId) -> Vec<ConnectionId> {
        self.read_identifiers(&Path::ClientConnections(client_id.clone()))
    }

    /// `None` if the client does not exist.
    pub fn client_status(&self, client_id: &ClientId) -> Option<Status> {
        let client_state = self.read_client_state(client_id)?;
        if client_state.is_frozen() {
            return Some(Status::Frozen);
        }
        let latest = self.read_consensus_state(client_id, client_state.latest_height())?;
        Some(client_state.status(latest.timestamp, self.store.current_timestamp()))
    }

    /// Events recorded at `height` or later, oldest first.
    pub fn events_since(&self, height: Height) -> Vec<(Height, IBCEvent)> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(h, _)| *h >= height)
            .cloned()
            .collect()
    }

    /// Drops the events recorded below `height` and returns how many were dropped.
    pub fn prune_events(&self, height: Height) -> usize {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        let before = events.len();
        events.retain(|(h, _)| *h >= height);
        before - events.len()
    }

    fn connection_step(&self, msg: ConnectionMsg) -> Result<ConnectionId, Error> {
        let output = self.execute(Ics26Envelope::Ics3Msg(msg))?;
        match output.result {
            Ics26Result::Connection(res) => Ok(res.connection_id),
            _ => Err(Kind::UnexpectedResult("connection handshake").into()),
        }
    }

    fn channel_step(&self, msg: ChannelMsg) -> Result<ChannelId, Error> {
        let output = self.execute(Ics26Envelope::Ics4Msg(msg))?;
        match output.result {
            Ics26Result::Channel(res) => Ok(res.channel_id),
            _ => Err(Kind::UnexpectedResult("channel handshake").into()),
        }
    }

    fn execute(&self, msg: Ics26Envelope) -> Result<HandlerOutput<Ics26Result>, Error> {
        let name = msg.name();
        let _guard = self.locks.acquire(lock_keys(&msg));

        match dispatch(self, msg) {
            Ok(output) => {
                self.record(&output);
                info!("{} applied, {} events", name, output.events.len());
                Ok(output)
            }
            Err(e) => {
                warn!("{} rejected: {}", name, e);
                Err(e)
            }
        }
    }

    fn record(&self, output: &HandlerOutput<Ics26Result>) {
        for line in &output.log {
            debug!("{}", line);
        }

        let height = self.store.current_height();
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.extend(output.events.iter().cloned().map(|e| (height, e)));
        while events.len() > self.event_capacity {
            events.pop_front();
        }
    }

    fn get_raw(&self, path: &Path) -> Option<Vec<u8>> {
        self.store.get(IBC_STORE, &path.to_key())
    }

    fn set_raw(&self, path: &Path, value: Vec<u8>) {
        self.store.set(IBC_STORE, path.to_key(), value)
    }

    fn delete_raw(&self, path: &Path) {
        self.store.delete(IBC_STORE, &path.to_key())
    }

    fn get_record<R, T>(&self, path: &Path) -> Option<T>
    where
        R: Message + Default,
        T: TryFrom<R>,
        T::Error: fmt::Display,
    {
        let bytes = self.get_raw(path)?;
        let decoded = R::decode(bytes.as_slice())
            .map_err(|e| e.to_string())
            .and_then(|raw| T::try_from(raw).map_err(|e| e.to_string()));

        match decoded {
            Ok(record) => Some(record),
            Err(e) => {
                error!("{}", Kind::CorruptedRecord(path.to_string()).context(e));
                None
            }
        }
    }

    fn set_record<R, T>(&self, path: &Path, record: T)
    where
        R: Message,
        T: Into<R>,
    {
        self.set_raw(path, record.into().encode_to_vec())
    }

    fn get_u64(&self, path: &Path) -> Option<u64> {
        let bytes = self.get_raw(path)?;
        match <[u8; 8]>::try_from(bytes.as_slice()) {
            Ok(be) => Some(u64::from_be_bytes(be)),
            Err(e) => {
                error!("{}", Kind::CorruptedRecord(path.to_string()).context(e));
                None
            }
        }
    }

    fn set_u64(&self, path: &Path, value: u64) {
        self.set_raw(path, value.to_be_bytes().to_vec())
    }

    fn read_client_state(&self, client_id: &ClientId) -> Option<ClientState> {
        self.get_record::<RawClientState, _>(&Path::ClientState(client_id.clone()))
    }

    fn read_consensus_state(&self, client_id: &ClientId, height: Height) -> Option<ConsensusState> {
        self.get_record::<RawConsensusState, _>(&Path::ClientConsensusState {
            client_id: client_id.clone(),
            height,
        })
    }

    fn read_consensus_heights(&self, client_id: &ClientId) -> Vec<Height> {
        let path = Path::ClientConsensusHeights(client_id.clone());
        let bytes = match self.get_raw(&path) {
            Some(bytes) => bytes,
            None => return vec![],
        };
        match RawConsensusHeights::decode(bytes.as_slice()) {
            Ok(raw) => raw.heights.into_iter().map(Height::from).collect(),
            Err(e) => {
                error!("{}", Kind::CorruptedRecord(path.to_string()).context(e));
                vec![]
            }
        }
    }

    fn write_consensus_heights(&self, client_id: &ClientId, heights: Vec<Height>) {
        let raw = RawConsensusHeights {
            heights: heights.into_iter().map(RawHeight::from).collect(),
        };
        self.set_raw(
            &Path::ClientConsensusHeights(client_id.clone()),
            raw.encode_to_vec(),
        )
    }

    fn read_identifiers<T>(&self, path: &Path) -> Vec<T>
    where
        T: std::str::FromStr,
    {
        let bytes = match self.get_raw(path) {
            Some(bytes) => bytes,
            None => return vec![],
        };
        match RawIdentifierList::decode(bytes.as_slice()) {
            Ok(raw) => raw.ids.iter().filter_map(|id| id.parse().ok()).collect(),
            Err(e) => {
                error!("{}", Kind::CorruptedRecord(path.to_string()).context(e));
                vec![]
            }
        }
    }

    fn read_connection(&self, connection_id: &ConnectionId) -> Option<ConnectionEnd> {
        self.get_record::<RawConnectionEnd, _>(&Path::Connections(connection_id.clone()))
    }

    fn read_channel(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<ChannelEnd> {
        self.get_record::<RawChannel, _>(&Path::ChannelEnds(port_id.clone(), channel_id.clone()))
    }

    fn read_counter(&self, kind: &'static str) -> u64 {
        self.get_u64(&Path::Counter(kind)).unwrap_or_default()
    }

    fn bump_counter(&self, kind: &'static str) {
        let next = self.read_counter(kind).saturating_add(1);
        self.set_u64(&Path::Counter(kind), next)
    }

    pub(crate) fn write_client_state(&self, client_id: &ClientId, client_state: ClientState) {
        self.set_record::<RawClientState, _>(&Path::ClientState(client_id.clone()), client_state)
    }

    /// Stores `consensus_state` and indexes its height, keeping the index sorted.
    pub(crate) fn write_consensus_state(
        &self,
        client_id: &ClientId,
        height: Height,
        consensus_state: ConsensusState,
    ) {
        self.set_record::<RawConsensusState, _>(
            &Path::ClientConsensusState {
                client_id: client_id.clone(),
                height,
            },
            consensus_state,
        );

        let mut heights = self.read_consensus_heights(client_id);
        if let Err(pos) = heights.binary_search(&height) {
            heights.insert(pos, height);
            self.write_consensus_heights(client_id, heights);
        }
    }

    pub(crate) fn write_connection(&self, connection_id: &ConnectionId, end: &ConnectionEnd) {
        self.set_record::<RawConnectionEnd, _>(&Path::Connections(connection_id.clone()), end.clone())
    }

    pub(crate) fn write_channel(&self, port_id: &PortId, channel_id: &ChannelId, end: &ChannelEnd) {
        self.set_record::<RawChannel, _>(
            &Path::ChannelEnds(port_id.clone(), channel_id.clone()),
            end.clone(),
        )
    }

    pub(crate) fn write_sequence(&self, path: &Path, seq: Sequence) {
        self.set_u64(path, u64::from(seq))
    }

    pub(crate) fn write_packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
        commitment: Vec<u8>,
    ) {
        self.set_raw(
            &Path::Commitments {
                port_id: port_id.clone(),
                channel_id: channel_id.clone(),
                sequence,
            },
            commitment,
        )
    }
}

impl<S: KvStore + Clone> Clone for IbcHost<S> {
    fn clone(&self) -> Self {
        let router = self.router.read().unwrap_or_else(PoisonError::into_inner).clone();
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner).clone();
        Self {
            store: self.store.clone(),
            prefix: self.prefix.clone(),
            locks: LockRegistry::default(),
            router: RwLock::new(router),
            events: RwLock::new(events),
            event_capacity: self.event_capacity,
        }
    }
}

impl<S: KvStore> ClientReader for IbcHost<S> {
    fn client_state(&self, client_id: &ClientId) -> Option<ClientState> {
        self.read_client_state(client_id)
    }

    fn consensus_state(&self, client_id: &ClientId, height: Height) -> Option<ConsensusState> {
        self.read_consensus_state(client_id, height)
    }

    fn consensus_heights(&self, client_id: &ClientId) -> Vec<Height> {
        self.read_consensus_heights(client_id)
    }

    fn client_counter(&self) -> u64 {
        self.read_counter(CLIENTS)
    }

    fn host_height(&self) -> Height {
        self.store.current_height()
    }

    fn host_timestamp(&self) -> Timestamp {
        self.store.current_timestamp()
    }
}

impl<S: KvStore> ClientKeeper for IbcHost<S> {
    fn store_client_state(
        &self,
        client_id: ClientId,
        client_state: ClientState,
    ) -> Result<(), ClientError> {
        self.write_client_state(&client_id, client_state);
        Ok(())
    }

    fn store_consensus_state(
        &self,
        client_id: ClientId,
        height: Height,
        consensus_state: ConsensusState,
    ) -> Result<(), ClientError> {
        self.write_consensus_state(&client_id, height, consensus_state);
        Ok(())
    }

    fn delete_consensus_state(&self, client_id: ClientId, height: Height) -> Result<(), ClientError> {
        self.delete_raw(&Path::ClientConsensusState {
            client_id: client_id.clone(),
            height,
        });

        let mut heights = self.read_consensus_heights(&client_id);
        heights.retain(|h| *h != height);
        self.write_consensus_heights(&client_id, heights);
        Ok(())
    }

    fn increase_client_counter(&self) {
        self.bump_counter(CLIENTS)
    }
}

impl<S: KvStore> ConnectionReader for IbcHost<S> {
    fn connection_end(&self, conn_id: &ConnectionId) -> Option<ConnectionEnd> {
        self.read_connection(conn_id)
    }

    fn client_state(&self, client_id: &ClientId) -> Option<ClientState> {
        self.read_client_state(client_id)
    }

    fn client_consensus_state(&self, client_id: &ClientId, height: Height) -> Option<ConsensusState> {
        self.read_consensus_state(client_id, height)
    }

    fn host_current_height(&self) -> Height {
        self.store.current_height()
    }

    fn host_timestamp(&self) -> Timestamp {
        self.store.current_timestamp()
    }

    fn commitment_prefix(&self) -> CommitmentPrefix {
        self.prefix.clone()
    }

    fn get_compatible_versions(&self) -> Vec<Version> {
        get_compatible_versions()
    }

    fn connection_counter(&self) -> u64 {
        self.read_counter(CONNECTIONS)
    }
}

impl<S: KvStore> ConnectionKeeper for IbcHost<S> {
    fn store_connection(
        &self,
        connection_id: &ConnectionId,
        connection_end: &ConnectionEnd,
    ) -> Result<(), ConnectionError> {
        self.write_connection(connection_id, connection_end);
        Ok(())
    }

    fn store_connection_to_client(
        &self,
        connection_id: &ConnectionId,
        client_id: &ClientId,
    ) -> Result<(), ConnectionError> {
        let path = Path::ClientConnections(client_id.clone());
        let mut ids: Vec<ConnectionId> = self.read_identifiers(&path);
        if !ids.contains(connection_id) {
            ids.push(connection_id.clone());
        }
        let raw = RawIdentifierList {
            ids: ids.iter().map(ToString::to_string).collect(),
        };
        self.set_raw(&path, raw.encode_to_vec());
        Ok(())
    }

    fn increase_connection_counter(&self) {
        self.bump_counter(CONNECTIONS)
    }
}

impl<S: KvStore> ChannelReader for IbcHost<S> {
    fn channel_end(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<ChannelEnd> {
        self.read_channel(port_id, channel_id)
    }

    fn connection_end(&self, connection_id: &ConnectionId) -> Option<ConnectionEnd> {
        self.read_connection(connection_id)
    }

    fn client_state(&self, client_id: &ClientId) -> Option<ClientState> {
        self.read_client_state(client_id)
    }

    fn client_consensus_state(&self, client_id: &ClientId, height: Height) -> Option<ConsensusState> {
        self.read_consensus_state(client_id, height)
    }

    fn port_bound(&self, port_id: &PortId) -> bool {
        self.router
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .has_route(port_id)
            || self.get_raw(&Path::Ports(port_id.clone())).is_some()
    }

    fn get_next_sequence_send(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<Sequence> {
        self.get_u64(&Path::SeqSends(port_id.clone(), channel_id.clone()))
            .map(Sequence::from)
    }

    fn get_next_sequence_recv(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<Sequence> {
        self.get_u64(&Path::SeqRecvs(port_id.clone(), channel_id.clone()))
            .map(Sequence::from)
    }

    fn get_next_sequence_ack(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<Sequence> {
        self.get_u64(&Path::SeqAcks(port_id.clone(), channel_id.clone()))
            .map(Sequence::from)
    }

    fn get_packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
    ) -> Option<Vec<u8>> {
        self.get_raw(&Path::Commitments {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
            sequence,
        })
    }

    fn get_packet_receipt(&self, port_id: &PortId, channel_id: &ChannelId, sequence: Sequence) -> bool {
        self.get_raw(&Path::Receipts {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
            sequence,
        })
        .is_some()
    }

    fn get_packet_acknowledgement(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
    ) -> Option<Vec<u8>> {
        self.get_raw(&Path::Acks {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
            sequence,
        })
    }

    fn host_height(&self) -> Height {
        self.store.current_height()
    }

    fn host_timestamp(&self) -> Timestamp {
        self.store.current_timestamp()
    }

    fn channel_counter(&self) -> u64 {
        self.read_counter(CHANNELS)
    }
}

impl<S: KvStore> ChannelKeeper for IbcHost<S> {
    fn store_channel(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        channel_end: &ChannelEnd,
    ) -> Result<(), ChannelError> {
        self.write_channel(port_id, channel_id, channel_end);
        Ok(())
    }

    fn store_next_sequence_send(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), ChannelError> {
        self.write_sequence(&Path::SeqSends(port_id.clone(), channel_id.clone()), seq);
        Ok(())
    }

    fn store_next_sequence_recv(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), ChannelError> {
        self.write_sequence(&Path::SeqRecvs(port_id.clone(), channel_id.clone()), seq);
        Ok(())
    }

    fn store_next_sequence_ack(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), ChannelError> {
        self.write_sequence(&Path::SeqAcks(port_id.clone(), channel_id.clone()), seq);
        Ok(())
    }

    fn store_packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
        commitment: Vec<u8>,
    ) -> Result<(), ChannelError> {
        self.write_packet_commitment(port_id, channel_id, seq, commitment);
        Ok(())
    }

    fn delete_packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), ChannelError> {
        self.delete_raw(&Path::Commitments {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
            sequence: seq,
        });
        Ok(())
    }

    fn store_packet_receipt(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), ChannelError> {
        self.set_raw(
            &Path::Receipts {
                port_id: port_id.clone(),
                channel_id: channel_id.clone(),
                sequence: seq,
            },
            PRESENT.to_vec(),
        );
        Ok(())
    }

    fn store_packet_acknowledgement(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
        ack_commitment: Vec<u8>,
    ) -> Result<(), ChannelError> {
        self.set_raw(
            &Path::Acks {
                port_id: port_id.clone(),
                channel_id: channel_id.clone(),
                sequence: seq,
            },
            ack_commitment,
        );
        Ok(())
    }

    fn increase_channel_counter(&self) {
        self.bump_counter(CHANNELS)
    }
}

impl<S: KvStore> Ics26Context for IbcHost<S> {
    fn module(&self, port_id: &PortId) -> Option<Arc<dyn Module>> {
        self.router
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_route(port_id)
    }
}

fn channel_lock(port_id: &PortId, channel_id: &ChannelId) -> String {
    Path::ChannelEnds(port_id.clone(), channel_id.clone()).to_string()
}

/// The objects a message may write, each standing for a lock.
fn lock_keys(msg: &Ics26Envelope) -> Vec<String> {
    match msg {
        Ics26Envelope::Ics2Msg(ClientMsg::CreateClient(_)) => {
            vec![Path::Counter(CLIENTS).to_string()]
        }
        Ics26Envelope::Ics2Msg(ClientMsg::UpdateClient(msg)) => {
            vec![Path::ClientState(msg.client_id.clone()).to_string()]
        }
        Ics26Envelope::Ics2Msg(ClientMsg::SubmitMisbehaviour(msg)) => {
            vec![Path::ClientState(msg.client_id.clone()).to_string()]
        }
        Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenInit(_))
        | Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenTry(_)) => {
            vec![Path::Counter(CONNECTIONS).to_string()]
        }
        Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenAck(msg)) => {
            vec![Path::Connections(msg.connection_id.clone()).to_string()]
        }
        Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenConfirm(msg)) => {
            vec![Path::Connections(msg.connection_id.clone()).to_string()]
        }
        Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenInit(_))
        | Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenTry(_)) => {
            vec![Path::Counter(CHANNELS).to_string()]
        }
        Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenAck(msg)) => {
            vec![channel_lock(&msg.port_id, &msg.channel_id)]
        }
        Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenConfirm(msg)) => {
            vec![channel_lock(&msg.port_id, &msg.channel_id)]
        }
        Ics26Envelope::Ics4PacketMsg(PacketMsg::RecvPacket(msg)) => vec![channel_lock(
            &msg.packet.destination_port,
            &msg.packet.destination_channel,
        )],
        Ics26Envelope::Ics4PacketMsg(PacketMsg::AckPacket(msg)) => vec![channel_lock(
            &msg.packet.source_port,
            &msg.packet.source_channel,
        )],
        Ics26Envelope::Ics4PacketMsg(PacketMsg::TimeoutPacket(msg)) => vec![channel_lock(
            &msg.packet.source_port,
            &msg.packet.source_channel,
        )],
    }
}

/// Named locks. `acquire` blocks until none of the requested names is held, then takes all of
/// them at once, so two messages never hold overlapping sets.
#[derive(Debug, Default)]
struct LockRegistry {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl LockRegistry {
    fn acquire(&self, keys: Vec<String>) -> LockGuard<'_> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while keys.iter().any(|k| held.contains(k)) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.extend(keys.iter().cloned());

        LockGuard {
            registry: self,
            keys,
        }
    }
}

struct LockGuard<'a> {
    registry: &'a LockRegistry,
    keys: Vec<String>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .registry
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            held.remove(key);
        }
        self.registry.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use crate::events::IBCEvent;
    use crate::ics02_client::client_type::ClientType;
    use crate::ics02_client::height::Height;
    use crate::ics02_client::msgs::MsgCreateClient;
    use crate::ics02_client::status::Status;
    use crate::ics24_host::identifier::{ClientId, PortId};
    use crate::ics24_host::path::Path;
    use crate::ics26_routing::error::Kind;
    use crate::ics26_routing::host::IBC_STORE;
    use crate::mock::context::{MockContext, MockModule};
    use crate::mock::host::{mock_chain_id, mock_client_state, mock_consensus_state};
    use crate::store::KvStore;

    fn create_msg(height: u64) -> MsgCreateClient {
        MsgCreateClient {
            client_state: mock_client_state(mock_chain_id(), Height::new(0, height)),
            consensus_state: mock_consensus_state(height, vec![1; 32]),
        }
    }

    #[test]
    fn a_port_is_bound_once() {
        let ctx = MockContext::default();
        ctx.bind_port(PortId::transfer(), Arc::new(MockModule::default()))
            .unwrap();

        let err = ctx
            .bind_port(PortId::transfer(), Arc::new(MockModule::default()))
            .unwrap_err();
        assert_eq!(err.kind(), &Kind::PortAlreadyBound(PortId::transfer()));
    }

    #[test]
    fn events_are_recorded_at_the_host_height() {
        let ctx = MockContext::default();
        let first = ctx.create_client(create_msg(5)).unwrap();

        let ctx = ctx.with_host_height(Height::new(0, 101));
        let second = ctx.create_client(create_msg(5)).unwrap();
        assert_ne!(first, second);

        let all = ctx.events_since(Height::new(0, 100));
        assert_eq!(all.len(), 2);
        assert!(matches!(all[0], (h, IBCEvent::CreateClient(_)) if h == Height::new(0, 100)));

        let latest = ctx.events_since(Height::new(0, 101));
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].0, Height::new(0, 101));

        assert!(ctx.events_since(Height::new(0, 102)).is_empty());
    }

    #[test]
    fn event_log_is_bounded_and_prunable() {
        let mut ctx = MockContext::default().with_event_capacity(3);
        for height in 100..105 {
            ctx = ctx.with_host_height(Height::new(0, height));
            ctx.create_client(create_msg(5)).unwrap();
        }

        let heights: Vec<u64> = ctx
            .events_since(Height::zero())
            .iter()
            .map(|(h, _)| h.revision_height)
            .collect();
        assert_eq!(heights, vec![102, 103, 104]);

        assert_eq!(ctx.prune_events(Height::new(0, 104)), 2);
        assert_eq!(ctx.events_since(Height::zero()).len(), 1);
        assert_eq!(ctx.prune_events(Height::new(0, 104)), 0);
    }

    #[test]
    fn rejected_messages_record_nothing() {
        let ctx = MockContext::default();
        let mut msg = create_msg(5);
        msg.client_state.latest_height = Height::zero();

        assert!(ctx.create_client(msg).is_err());
        assert!(ctx.events_since(Height::zero()).is_empty());
        assert!(ctx.get_client_state(&ClientId::default()).is_none());
    }

    #[test]
    fn client_status_follows_the_host_clock() {
        let client_id = ClientId::default();
        let ctx = MockContext::default().with_client(&client_id, Height::new(0, 5));
        assert_eq!(ctx.client_status(&client_id), Some(Status::Active));

        let later = ctx.clone().with_host_height(Height::new(0, 2_000_000));
        assert_eq!(later.client_status(&client_id), Some(Status::Expired));

        let mut frozen = ctx.get_client_state(&client_id).unwrap();
        frozen.frozen_height = Some(Height::new(0, 5));
        ctx.write_client_state(&client_id, frozen);
        assert_eq!(ctx.client_status(&client_id), Some(Status::Frozen));

        let unknown = ClientId::new(ClientType::Tendermint, 7).unwrap();
        assert_eq!(ctx.client_status(&unknown), None);
    }

    #[test]
    fn corrupted_records_read_as_absent() {
        let client_id = ClientId::default();
        let ctx = MockContext::default().with_client(&client_id, Height::new(0, 5));

        ctx.store().set(
            IBC_STORE,
            Path::ClientState(client_id.clone()).to_key(),
            vec![0xff, 0xff],
        );
        assert!(ctx.get_client_state(&client_id).is_none());
        assert!(ctx.get_consensus_state(&client_id, Height::new(0, 5)).is_some());
    }

    #[test]
    fn concurrent_creations_get_distinct_identifiers() {
        let ctx = Arc::new(MockContext::default());

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || ctx.create_client(create_msg(5)).unwrap())
            })
            .collect();

        let mut ids: Vec<ClientId> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        ids.sort_by_key(ToString::to_string);
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(ctx.events_since(Height::zero()).len(), 8);
    }
}

//! Path-space as listed in ICS-024
//! <https://github.com/cosmos/ibc/tree/master/spec/core/ics-024-host-requirements#path-space>
//!
//! Every path renders as the familiar slash-separated string for display and logging. The
//! store key, which is also the key counterparties prove against, encodes each segment with a
//! varint length prefix: two distinct paths never produce keys where one is a prefix of the
//! other, even when an identifier is a textual prefix of another (`connection-1`,
//! `connection-10`).

use std::fmt;

use crate::ics02_client::height::Height;
use crate::ics04_channel::packet::Sequence;
use crate::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Path {
    ClientState(ClientId),
    ClientConsensusState {
        client_id: ClientId,
        height: Height,
    },
    ClientConsensusHeights(ClientId),
    ClientConnections(ClientId),
    Connections(ConnectionId),
    Ports(PortId),
    ChannelEnds(PortId, ChannelId),
    SeqSends(PortId, ChannelId),
    SeqRecvs(PortId, ChannelId),
    SeqAcks(PortId, ChannelId),
    Commitments {
        port_id: PortId,
        channel_id: ChannelId,
        sequence: Sequence,
    },
    Acks {
        port_id: PortId,
        channel_id: ChannelId,
        sequence: Sequence,
    },
    Receipts {
        port_id: PortId,
        channel_id: ChannelId,
        sequence: Sequence,
    },
    /// Host-local identifier counters, e.g. `counters/clients`.
    Counter(&'static str),
}

impl Path {
    /// Indication if the path is provable to a counterparty.
    pub fn is_provable(&self) -> bool {
        !matches!(
            self,
            Path::ClientConsensusHeights(_)
                | Path::ClientConnections(_)
                | Path::Ports(_)
                | Path::Counter(_)
        )
    }

    pub fn segments(&self) -> Vec<String> {
        let s = |v: &dyn fmt::Display| v.to_string();
        match self {
            Path::ClientState(id) => vec![s(&"clients"), s(id), s(&"clientState")],
            Path::ClientConsensusState { client_id, height } => vec![
                s(&"clients"),
                s(client_id),
                s(&"consensusStates"),
                s(height),
            ],
            Path::ClientConsensusHeights(id) => {
                vec![s(&"clients"), s(id), s(&"consensusHeights")]
            }
            Path::ClientConnections(id) => vec![s(&"clients"), s(id), s(&"connections")],
            Path::Connections(id) => vec![s(&"connections"), s(id)],
            Path::Ports(id) => vec![s(&"ports"), s(id)],
            Path::ChannelEnds(port_id, channel_id) => vec![
                s(&"channelEnds"),
                s(&"ports"),
                s(port_id),
                s(&"channels"),
                s(channel_id),
            ],
            Path::SeqSends(port_id, channel_id) => vec![
                s(&"nextSequenceSend"),
                s(&"ports"),
                s(port_id),
                s(&"channels"),
                s(channel_id),
            ],
            Path::SeqRecvs(port_id, channel_id) => vec![
                s(&"nextSequenceRecv"),
                s(&"ports"),
                s(port_id),
                s(&"channels"),
                s(channel_id),
            ],
            Path::SeqAcks(port_id, channel_id) => vec![
                s(&"nextSequenceAck"),
                s(&"ports"),
                s(port_id),
                s(&"channels"),
                s(channel_id),
            ],
            Path::Commitments {
                port_id,
                channel_id,
                sequence,
            } => vec![
                s(&"commitments"),
                s(&"ports"),
                s(port_id),
                s(&"channels"),
                s(channel_id),
                s(&"sequences"),
                s(sequence),
            ],
            Path::Acks {
                port_id,
                channel_id,
                sequence,
            } => vec![
                s(&"acks"),
                s(&"ports"),
                s(port_id),
                s(&"channels"),
                s(channel_id),
                s(&"sequences"),
                s(sequence),
            ],
            Path::Receipts {
                port_id,
                channel_id,
                sequence,
            } => vec![
                s(&"receipts"),
                s(&"ports"),
                s(port_id),
                s(&"channels"),
                s(channel_id),
                s(&"sequences"),
                s(sequence),
            ],
            Path::Counter(kind) => vec![s(&"counters"), s(kind)],
        }
    }

    /// The store key under which the record for this path is persisted and proven.
    pub fn to_key(&self) -> Vec<u8> {
        let mut key = Vec::new();
        for segment in self.segments() {
            prost::encoding::encode_varint(segment.len() as u64, &mut key);
            key.extend_from_slice(segment.as_bytes());
        }
        key
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments().join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::Path;
    use crate::ics02_client::height::Height;
    use crate::ics04_channel::packet::Sequence;
    use crate::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};

    #[test]
    fn paths_render_ics24_strings() {
        let port_id = PortId::transfer();
        let channel_id = ChannelId::new(0);

        assert_eq!(
            Path::ClientState(ClientId::default()).to_string(),
            "clients/07-tendermint-0/clientState"
        );
        assert_eq!(
            Path::ClientConsensusState {
                client_id: ClientId::default(),
                height: Height::new(1, 5)
            }
            .to_string(),
            "clients/07-tendermint-0/consensusStates/1-5"
        );
        assert_eq!(
            Path::ChannelEnds(port_id.clone(), channel_id.clone()).to_string(),
            "channelEnds/ports/transfer/channels/channel-0"
        );
        assert_eq!(
            Path::Commitments {
                port_id,
                channel_id,
                sequence: Sequence::from(3)
            }
            .to_string(),
            "commitments/ports/transfer/channels/channel-0/sequences/3"
        );
    }

    #[test]
    fn keys_are_prefix_free() {
        let keys = vec![
            Path::Connections(ConnectionId::new(1)).to_key(),
            Path::Connections(ConnectionId::new(10)).to_key(),
            Path::Connections(ConnectionId::new(100)).to_key(),
            Path::ClientState(ClientId::default()).to_key(),
            Path::ClientConsensusHeights(ClientId::default()).to_key(),
            Path::SeqSends(PortId::transfer(), ChannelId::new(1)).to_key(),
            Path::SeqSends(PortId::transfer(), ChannelId::new(11)).to_key(),
        ];

        for (i, a) in keys.iter().enumerate() {
            for (j, b) in keys.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a), "key {} is a prefix of key {}", i, j);
                }
            }
        }
    }
}

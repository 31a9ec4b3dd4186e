use std::convert::TryFrom;
use std::fmt;

use serde_derive::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ics02_client::height::Height;
use crate::ics04_channel::error::{Error, Kind};
use crate::ics24_host::identifier::{ChannelId, PortId};
use crate::proto::RawPacket;
use crate::timestamp::Timestamp;

/// The sequence number of a packet enforces ordering among packets from the same source
/// channel to the same destination channel.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Sequence(u64);

impl Sequence {
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn increment(&self) -> Sequence {
        Sequence(self.0 + 1)
    }
}

impl From<u64> for Sequence {
    fn from(seq: u64) -> Self {
        Sequence(seq)
    }
}

impl From<Sequence> for u64 {
    fn from(s: Sequence) -> u64 {
        s.0
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Packet {
    pub sequence: Sequence,
    pub source_port: PortId,
    pub source_channel: ChannelId,
    pub destination_port: PortId,
    pub destination_channel: ChannelId,
    pub data: Vec<u8>,
    /// Zero means no height timeout.
    pub timeout_height: Height,
    /// Unset means no timestamp timeout.
    pub timeout_timestamp: Timestamp,
}

impl Packet {
    /// The value a sending chain stores under the packet's commitment path:
    /// `sha256(timeout_timestamp ‖ timeout revision ‖ timeout height ‖ sha256(data))`, with
    /// the integers encoded as big-endian u64.
    pub fn commitment(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.timeout_timestamp.nanoseconds().to_be_bytes());
        hasher.update(self.timeout_height.revision_number.to_be_bytes());
        hasher.update(self.timeout_height.revision_height.to_be_bytes());
        hasher.update(Sha256::digest(&self.data));
        hasher.finalize().to_vec()
    }

    pub fn has_timeout(&self) -> bool {
        !self.timeout_height.is_zero() || self.timeout_timestamp.is_set()
    }

    /// Whether a chain at `height` and `timestamp` is past either of the packet's timeouts.
    pub fn timed_out(&self, height: Height, timestamp: Timestamp) -> bool {
        (!self.timeout_height.is_zero() && height >= self.timeout_height)
            || (self.timeout_timestamp.is_set() && timestamp >= self.timeout_timestamp)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seq:{} {}/{} -> {}/{}",
            self.sequence,
            self.source_port,
            self.source_channel,
            self.destination_port,
            self.destination_channel
        )
    }
}

/// The value a receiving chain stores under the acknowledgement path.
pub fn ack_commitment(ack: &[u8]) -> Vec<u8> {
    Sha256::digest(ack).to_vec()
}

impl TryFrom<RawPacket> for Packet {
    type Error = Error;

    fn try_from(raw_pkt: RawPacket) -> Result<Self, Self::Error> {
        if raw_pkt.sequence == 0 {
            return Err(Kind::InvalidPacket("zero sequence".to_string()).into());
        }

        let timeout_height = raw_pkt.timeout_height.map(Height::from).unwrap_or_default();
        let timeout_timestamp = Timestamp::from_nanoseconds(raw_pkt.timeout_timestamp);

        Ok(Packet {
            sequence: Sequence::from(raw_pkt.sequence),
            source_port: raw_pkt
                .source_port
                .parse()
                .map_err(|e| Kind::IdentifierError.context(e))?,
            source_channel: raw_pkt
                .source_channel
                .parse()
                .map_err(|e| Kind::IdentifierError.context(e))?,
            destination_port: raw_pkt
                .destination_port
                .parse()
                .map_err(|e| Kind::IdentifierError.context(e))?,
            destination_channel: raw_pkt
                .destination_channel
                .parse()
                .map_err(|e| Kind::IdentifierError.context(e))?,
            data: raw_pkt.data,
            timeout_height,
            timeout_timestamp,
        })
    }
}

impl From<Packet> for RawPacket {
    fn from(packet: Packet) -> Self {
        RawPacket {
            sequence: packet.sequence.0,
            source_port: packet.source_port.as_str().to_string(),
            source_channel: packet.source_channel.as_str().to_string(),
            destination_port: packet.destination_port.as_str().to_string(),
            destination_channel: packet.destination_channel.as_str().to_string(),
            data: packet.data,
            timeout_height: Some(packet.timeout_height.into()),
            timeout_timestamp: packet.timeout_timestamp.nanoseconds(),
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use crate::ics02_client::height::Height;
    use crate::ics04_channel::packet::{Packet, Sequence};
    use crate::ics24_host::identifier::{ChannelId, PortId};
    use crate::timestamp::Timestamp;

    /// A transfer packet from `channel-0` to the counterparty's `channel-1`.
    pub fn dummy_packet(sequence: u64) -> Packet {
        Packet {
            sequence: Sequence::from(sequence),
            source_port: PortId::transfer(),
            source_channel: ChannelId::new(0),
            destination_port: PortId::transfer(),
            destination_channel: ChannelId::new(1),
            data: b"hello".to_vec(),
            timeout_height: Height::new(0, 1_000),
            timeout_timestamp: Timestamp::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::test_utils::dummy_packet;
    use super::{ack_commitment, Packet};
    use crate::ics02_client::height::Height;
    use crate::proto::RawPacket;
    use crate::timestamp::Timestamp;

    #[test]
    fn commitment_covers_timeouts_and_data() {
        let packet = dummy_packet(1);
        let commitment = packet.commitment();
        assert_eq!(commitment.len(), 32);

        let other_data = Packet {
            data: b"bye".to_vec(),
            ..packet.clone()
        };
        let other_timeout = Packet {
            timeout_height: Height::new(0, 1_001),
            ..packet.clone()
        };
        let other_sequence = Packet {
            sequence: 9.into(),
            ..packet.clone()
        };

        assert_ne!(commitment, other_data.commitment());
        assert_ne!(commitment, other_timeout.commitment());
        // The sequence is part of the path, not of the committed value.
        assert_eq!(commitment, other_sequence.commitment());

        assert_eq!(ack_commitment(b"ok").len(), 32);
    }

    #[test]
    fn timeouts() {
        let mut packet = dummy_packet(1);
        assert!(!packet.timed_out(Height::new(0, 999), Timestamp::from_seconds(1_000)));
        assert!(packet.timed_out(Height::new(0, 1_000), Timestamp::none()));

        packet.timeout_height = Height::zero();
        packet.timeout_timestamp = Timestamp::from_seconds(50);
        assert!(packet.has_timeout());
        assert!(!packet.timed_out(Height::new(0, 5_000), Timestamp::from_seconds(49)));
        assert!(packet.timed_out(Height::new(0, 1), Timestamp::from_seconds(50)));

        packet.timeout_timestamp = Timestamp::none();
        assert!(!packet.has_timeout());
        assert!(!packet.timed_out(Height::new(9, 9), Timestamp::from_seconds(1 << 30)));
    }

    #[test]
    fn packet_try_from_raw() {
        let raw = RawPacket::from(dummy_packet(4));
        assert_eq!(Packet::try_from(raw.clone()).unwrap(), dummy_packet(4));

        let zero = RawPacket {
            sequence: 0,
            ..raw.clone()
        };
        assert!(Packet::try_from(zero).is_err());

        let bad_port = RawPacket {
            source_port: "".to_string(),
            ..raw
        };
        assert!(Packet::try_from(bad_port).is_err());
    }
}

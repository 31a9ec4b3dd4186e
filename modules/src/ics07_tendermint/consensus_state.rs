use std::convert::{TryFrom, TryInto};

use prost::Message;
use serde_derive::{Deserialize, Serialize};

use crate::ics02_client::client_type::ClientType;
use crate::ics07_tendermint::error::{Error, Kind};
use crate::ics07_tendermint::header::Header;
use crate::ics23_commitment::commitment::CommitmentRoot;
use crate::proto::RawConsensusState;
use crate::timestamp::Timestamp;

/// What a client remembers of the remote chain at one height: when the block was produced,
/// the application hash proofs are checked against, and who may sign the next block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusState {
    pub timestamp: Timestamp,
    pub root: CommitmentRoot,
    pub next_validators_hash: Vec<u8>,
}

impl ConsensusState {
    pub fn new(timestamp: Timestamp, root: CommitmentRoot, next_validators_hash: Vec<u8>) -> Self {
        Self {
            timestamp,
            root,
            next_validators_hash,
        }
    }

    pub fn client_type(&self) -> ClientType {
        ClientType::Tendermint
    }

    pub fn root(&self) -> &CommitmentRoot {
        &self.root
    }
}

impl From<&Header> for ConsensusState {
    fn from(header: &Header) -> Self {
        let header = &header.signed_header.header;
        Self {
            timestamp: header.time,
            root: CommitmentRoot::from_bytes(&header.app_hash),
            next_validators_hash: header.next_validators_hash.clone(),
        }
    }
}

impl TryFrom<RawConsensusState> for ConsensusState {
    type Error = Error;

    fn try_from(raw: RawConsensusState) -> Result<Self, Self::Error> {
        let timestamp = raw
            .timestamp
            .ok_or_else(|| Kind::InvalidRawConsensusState("missing timestamp".to_string()))?;
        if raw.root.is_empty() {
            return Err(Kind::InvalidRawConsensusState("empty commitment root".to_string()).into());
        }

        Ok(Self {
            timestamp: timestamp.into(),
            root: raw.root.into(),
            next_validators_hash: raw.next_validators_hash,
        })
    }
}

impl From<ConsensusState> for RawConsensusState {
    fn from(value: ConsensusState) -> Self {
        RawConsensusState {
            timestamp: Some(value.timestamp.into()),
            root: value.root.into_vec(),
            next_validators_hash: value.next_validators_hash,
        }
    }
}

impl TryFrom<&[u8]> for ConsensusState {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let raw = RawConsensusState::decode(bytes)
            .map_err(|e| Kind::InvalidRawConsensusState("decode".to_string()).context(e))?;
        raw.try_into()
    }
}

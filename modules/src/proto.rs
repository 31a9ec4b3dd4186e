//! Protobuf encodings of every record the IBC module persists or exchanges with a
//! counterparty. Field numbers and integer widths are part of the wire contract: a
//! counterparty implementation decodes the same bytes when verifying proofs.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawHeight {
    #[prost(uint64, tag = "1")]
    pub revision_number: u64,
    #[prost(uint64, tag = "2")]
    pub revision_height: u64,
}

/// Wire-compatible with `google.protobuf.Timestamp` for non-negative instants.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawTimestamp {
    #[prost(uint64, tag = "1")]
    pub seconds: u64,
    #[prost(uint32, tag = "2")]
    pub nanos: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawDuration {
    #[prost(uint64, tag = "1")]
    pub seconds: u64,
    #[prost(uint32, tag = "2")]
    pub nanos: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawFraction {
    #[prost(uint64, tag = "1")]
    pub numerator: u64,
    #[prost(uint64, tag = "2")]
    pub denominator: u64,
}

// ---------------------------------------------------------------------------
// ICS 07 Tendermint client

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawClientState {
    #[prost(string, tag = "1")]
    pub chain_id: String,
    #[prost(message, optional, tag = "2")]
    pub trust_level: Option<RawFraction>,
    #[prost(message, optional, tag = "3")]
    pub trusting_period: Option<RawDuration>,
    #[prost(message, optional, tag = "4")]
    pub unbonding_period: Option<RawDuration>,
    #[prost(message, optional, tag = "5")]
    pub max_clock_drift: Option<RawDuration>,
    #[prost(message, optional, tag = "6")]
    pub frozen_height: Option<RawHeight>,
    #[prost(message, optional, tag = "7")]
    pub latest_height: Option<RawHeight>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawConsensusState {
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<RawTimestamp>,
    #[prost(bytes, tag = "2")]
    pub root: Vec<u8>,
    #[prost(bytes, tag = "3")]
    pub next_validators_hash: Vec<u8>,
}

/// Heights at which a client holds consensus states, oldest first.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawConsensusHeights {
    #[prost(message, repeated, tag = "1")]
    pub heights: Vec<RawHeight>,
}

/// Identifiers indexed under another record, e.g. the connections opened on a client.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawIdentifierList {
    #[prost(string, repeated, tag = "1")]
    pub ids: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawValidator {
    #[prost(bytes, tag = "1")]
    pub address: Vec<u8>,
    #[prost(bytes, tag = "2")]
    pub pub_key: Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub voting_power: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawValidatorSet {
    #[prost(message, repeated, tag = "1")]
    pub validators: Vec<RawValidator>,
}

/// The part of a validator that contributes to the validator set hash.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawSimpleValidator {
    #[prost(bytes, tag = "1")]
    pub pub_key: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub voting_power: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawBlockHeader {
    #[prost(string, tag = "1")]
    pub chain_id: String,
    #[prost(uint64, tag = "2")]
    pub height: u64,
    #[prost(message, optional, tag = "3")]
    pub time: Option<RawTimestamp>,
    #[prost(bytes, tag = "4")]
    pub validators_hash: Vec<u8>,
    #[prost(bytes, tag = "5")]
    pub next_validators_hash: Vec<u8>,
    #[prost(bytes, tag = "6")]
    pub app_hash: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawCommitSig {
    #[prost(bytes, tag = "1")]
    pub validator_address: Vec<u8>,
    #[prost(bytes, tag = "2")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawCommit {
    #[prost(uint64, tag = "1")]
    pub height: u64,
    #[prost(bytes, tag = "2")]
    pub block_hash: Vec<u8>,
    #[prost(message, repeated, tag = "3")]
    pub signatures: Vec<RawCommitSig>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawSignedHeader {
    #[prost(message, optional, tag = "1")]
    pub header: Option<RawBlockHeader>,
    #[prost(message, optional, tag = "2")]
    pub commit: Option<RawCommit>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawTmHeader {
    #[prost(message, optional, tag = "1")]
    pub signed_header: Option<RawSignedHeader>,
    #[prost(message, optional, tag = "2")]
    pub validator_set: Option<RawValidatorSet>,
    #[prost(message, optional, tag = "3")]
    pub trusted_height: Option<RawHeight>,
    #[prost(message, optional, tag = "4")]
    pub trusted_validators: Option<RawValidatorSet>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawMisbehaviour {
    #[prost(string, tag = "1")]
    pub client_id: String,
    #[prost(message, optional, tag = "2")]
    pub header_1: Option<RawTmHeader>,
    #[prost(message, optional, tag = "3")]
    pub header_2: Option<RawTmHeader>,
}

/// The bytes each validator signs when committing a block.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawCanonicalVote {
    #[prost(uint64, tag = "1")]
    pub height: u64,
    #[prost(bytes, tag = "2")]
    pub block_hash: Vec<u8>,
    #[prost(string, tag = "3")]
    pub chain_id: String,
}

// ---------------------------------------------------------------------------
// ICS 03 Connection

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawVersion {
    #[prost(string, tag = "1")]
    pub identifier: String,
    #[prost(string, repeated, tag = "2")]
    pub features: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawMerklePrefix {
    #[prost(bytes, tag = "1")]
    pub key_prefix: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawConnectionCounterparty {
    #[prost(string, tag = "1")]
    pub client_id: String,
    #[prost(string, tag = "2")]
    pub connection_id: String,
    #[prost(message, optional, tag = "3")]
    pub prefix: Option<RawMerklePrefix>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawConnectionEnd {
    #[prost(string, tag = "1")]
    pub client_id: String,
    #[prost(message, repeated, tag = "2")]
    pub versions: Vec<RawVersion>,
    #[prost(int32, tag = "3")]
    pub state: i32,
    #[prost(message, optional, tag = "4")]
    pub counterparty: Option<RawConnectionCounterparty>,
    #[prost(uint64, tag = "5")]
    pub delay_period: u64,
}

// ---------------------------------------------------------------------------
// ICS 04 Channel

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawChannelCounterparty {
    #[prost(string, tag = "1")]
    pub port_id: String,
    #[prost(string, tag = "2")]
    pub channel_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawChannel {
    #[prost(int32, tag = "1")]
    pub state: i32,
    #[prost(int32, tag = "2")]
    pub ordering: i32,
    #[prost(message, optional, tag = "3")]
    pub counterparty: Option<RawChannelCounterparty>,
    #[prost(string, repeated, tag = "4")]
    pub connection_hops: Vec<String>,
    #[prost(string, tag = "5")]
    pub version: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawPacket {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(string, tag = "2")]
    pub source_port: String,
    #[prost(string, tag = "3")]
    pub source_channel: String,
    #[prost(string, tag = "4")]
    pub destination_port: String,
    #[prost(string, tag = "5")]
    pub destination_channel: String,
    #[prost(bytes, tag = "6")]
    pub data: Vec<u8>,
    #[prost(message, optional, tag = "7")]
    pub timeout_height: Option<RawHeight>,
    #[prost(uint64, tag = "8")]
    pub timeout_timestamp: u64,
}

// ---------------------------------------------------------------------------
// ICS 23 Commitment

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawStoreInfo {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bytes, tag = "2")]
    pub root: Vec<u8>,
}

/// Proofs are ordered innermost first: the key inside its module store, then the store
/// inside the application hash. `store_infos` optionally lists every committed store root so
/// the verifier can recompute the application hash instead of checking a store proof.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawMerkleProof {
    #[prost(message, repeated, tag = "1")]
    pub proofs: Vec<ics23::CommitmentProof>,
    #[prost(message, repeated, tag = "2")]
    pub store_infos: Vec<RawStoreInfo>,
}

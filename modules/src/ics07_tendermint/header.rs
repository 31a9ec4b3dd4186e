//! Headers submitted to a Tendermint client: a block header, the commit signing it, and the
//! validator sets needed to check the signatures.

use std::collections::BTreeSet;
use std::convert::{TryFrom, TryInto};
use std::str::FromStr;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use prost::Message;
use sha2::{Digest, Sha256};
use tendermint::crypto::default::Sha256 as MerkleHasher;
use tendermint::merkle::simple_hash_from_byte_vectors;

use crate::ics02_client::height::Height;
use crate::ics07_tendermint::error::{Error, Kind};
use crate::ics24_host::identifier::ChainId;
use crate::proto::{
    RawBlockHeader, RawCanonicalVote, RawCommit, RawCommitSig, RawSignedHeader,
    RawSimpleValidator, RawTmHeader, RawValidator, RawValidatorSet,
};
use crate::timestamp::Timestamp;

/// Length of a validator address: the first 20 bytes of the SHA-256 of its public key.
pub const ADDRESS_LENGTH: usize = 20;

pub fn address_of(pub_key: &[u8; 32]) -> Vec<u8> {
    Sha256::digest(pub_key)[..ADDRESS_LENGTH].to_vec()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
    pub address: Vec<u8>,
    pub pub_key: [u8; 32],
    pub voting_power: u64,
}

impl Validator {
    pub fn new(pub_key: [u8; 32], voting_power: u64) -> Self {
        Self {
            address: address_of(&pub_key),
            pub_key,
            voting_power,
        }
    }

    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<(), Error> {
        let key = VerifyingKey::from_bytes(&self.pub_key)
            .map_err(|e| Kind::InvalidPublicKey.context(e))?;
        let signature = Signature::from_slice(signature)
            .map_err(|e| Kind::InvalidSignature(hex_address(&self.address)).context(e))?;

        key.verify(message, &signature)
            .map_err(|e| Kind::InvalidSignature(hex_address(&self.address)).context(e).into())
    }
}

fn hex_address(address: &[u8]) -> String {
    String::from_utf8_lossy(&subtle_encoding::hex::encode_upper(address)).to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
}

impl ValidatorSet {
    pub fn new(validators: Vec<Validator>) -> Self {
        Self { validators }
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn validator(&self, address: &[u8]) -> Option<&Validator> {
        self.validators.iter().find(|v| v.address == address)
    }

    pub fn total_voting_power(&self) -> u64 {
        self.validators
            .iter()
            .fold(0u64, |total, v| total.saturating_add(v.voting_power))
    }

    /// Simple Merkle root over the `(public key, voting power)` of every validator, in order.
    pub fn hash(&self) -> Vec<u8> {
        let leaves: Vec<Vec<u8>> = self
            .validators
            .iter()
            .map(|v| {
                RawSimpleValidator {
                    pub_key: v.pub_key.to_vec(),
                    voting_power: v.voting_power,
                }
                .encode_to_vec()
            })
            .collect();

        simple_hash_from_byte_vectors::<MerkleHasher>(&leaves).to_vec()
    }
}

impl TryFrom<RawValidatorSet> for ValidatorSet {
    type Error = Error;

    fn try_from(raw: RawValidatorSet) -> Result<Self, Self::Error> {
        let validators = raw
            .validators
            .into_iter()
            .map(|v| {
                let pub_key: [u8; 32] = v
                    .pub_key
                    .as_slice()
                    .try_into()
                    .map_err(|_| {
                        Kind::InvalidRawHeader("validator public key is not 32 bytes".to_string())
                    })?;
                let validator = Validator::new(pub_key, v.voting_power);
                if validator.address != v.address {
                    return Err(Kind::InvalidRawHeader(
                        "validator address does not match its public key".to_string(),
                    )
                    .into());
                }
                Ok(validator)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self::new(validators))
    }
}

impl From<ValidatorSet> for RawValidatorSet {
    fn from(value: ValidatorSet) -> Self {
        RawValidatorSet {
            validators: value
                .validators
                .into_iter()
                .map(|v| RawValidator {
                    address: v.address,
                    pub_key: v.pub_key.to_vec(),
                    voting_power: v.voting_power,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub chain_id: ChainId,
    pub height: u64,
    pub time: Timestamp,
    pub validators_hash: Vec<u8>,
    pub next_validators_hash: Vec<u8>,
    /// State root after executing every block up to and including this one.
    pub app_hash: Vec<u8>,
}

impl BlockHeader {
    pub fn hash(&self) -> Vec<u8> {
        Sha256::digest(RawBlockHeader::from(self.clone()).encode_to_vec()).to_vec()
    }
}

impl From<BlockHeader> for RawBlockHeader {
    fn from(value: BlockHeader) -> Self {
        RawBlockHeader {
            chain_id: value.chain_id.to_string(),
            height: value.height,
            time: Some(value.time.into()),
            validators_hash: value.validators_hash,
            next_validators_hash: value.next_validators_hash,
            app_hash: value.app_hash,
        }
    }
}

impl TryFrom<RawBlockHeader> for BlockHeader {
    type Error = Error;

    fn try_from(raw: RawBlockHeader) -> Result<Self, Self::Error> {
        Ok(Self {
            chain_id: ChainId::from_str(&raw.chain_id)
                .map_err(|e| Kind::InvalidRawHeader("chain id".to_string()).context(e))?,
            height: raw.height,
            time: raw
                .time
                .ok_or_else(|| Kind::InvalidRawHeader("missing time".to_string()))?
                .into(),
            validators_hash: raw.validators_hash,
            next_validators_hash: raw.next_validators_hash,
            app_hash: raw.app_hash,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSig {
    pub validator_address: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub height: u64,
    pub block_hash: Vec<u8>,
    pub signatures: Vec<CommitSig>,
}

impl Commit {
    /// Signatures in commit order, keeping only the first one of each validator.
    pub fn unique_signatures(&self) -> Vec<&CommitSig> {
        let mut seen = BTreeSet::new();
        let mut unique = Vec::new();
        for sig in &self.signatures {
            if seen.insert(sig.validator_address.as_slice()) {
                unique.push(sig);
            }
        }
        unique
    }
}

/// The bytes every validator signs to commit the block `block_hash` at `height`.
pub fn canonical_sign_bytes(chain_id: &ChainId, height: u64, block_hash: &[u8]) -> Vec<u8> {
    RawCanonicalVote {
        height,
        block_hash: block_hash.to_vec(),
        chain_id: chain_id.to_string(),
    }
    .encode_to_vec()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedHeader {
    pub header: BlockHeader,
    pub commit: Commit,
}

/// A header as submitted to update a client. `trusted_validator_set` is the validator set the
/// client already trusts at `trusted_height`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub signed_header: SignedHeader,
    pub validator_set: ValidatorSet,
    pub trusted_height: Height,
    pub trusted_validator_set: ValidatorSet,
}

impl Header {
    pub fn height(&self) -> Height {
        let header = &self.signed_header.header;
        Height::new(header.chain_id.version(), header.height)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.signed_header.header.time
    }

    pub fn hash(&self) -> Vec<u8> {
        self.signed_header.header.hash()
    }
}

impl TryFrom<RawTmHeader> for Header {
    type Error = Error;

    fn try_from(raw: RawTmHeader) -> Result<Self, Self::Error> {
        let signed_header = raw
            .signed_header
            .ok_or_else(|| Kind::InvalidRawHeader("missing signed header".to_string()))?;
        let header = signed_header
            .header
            .ok_or_else(|| Kind::InvalidRawHeader("missing block header".to_string()))?;
        let commit = signed_header
            .commit
            .ok_or_else(|| Kind::InvalidRawHeader("missing commit".to_string()))?;

        Ok(Self {
            signed_header: SignedHeader {
                header: header.try_into()?,
                commit: Commit {
                    height: commit.height,
                    block_hash: commit.block_hash,
                    signatures: commit
                        .signatures
                        .into_iter()
                        .map(|sig| CommitSig {
                            validator_address: sig.validator_address,
                            signature: sig.signature,
                        })
                        .collect(),
                },
            },
            validator_set: raw
                .validator_set
                .ok_or_else(|| Kind::InvalidRawHeader("missing validator set".to_string()))?
                .try_into()?,
            trusted_height: raw
                .trusted_height
                .ok_or_else(|| Kind::InvalidRawHeader("missing trusted height".to_string()))?
                .into(),
            trusted_validator_set: raw
                .trusted_validators
                .ok_or_else(|| Kind::InvalidRawHeader("missing trusted validators".to_string()))?
                .try_into()?,
        })
    }
}

impl From<Header> for RawTmHeader {
    fn from(value: Header) -> Self {
        let SignedHeader { header, commit } = value.signed_header;
        RawTmHeader {
            signed_header: Some(RawSignedHeader {
                header: Some(header.into()),
                commit: Some(RawCommit {
                    height: commit.height,
                    block_hash: commit.block_hash,
                    signatures: commit
                        .signatures
                        .into_iter()
                        .map(|sig| RawCommitSig {
                            validator_address: sig.validator_address,
                            signature: sig.signature,
                        })
                        .collect(),
                }),
            }),
            validator_set: Some(value.validator_set.into()),
            trusted_height: Some(value.trusted_height.into()),
            trusted_validators: Some(value.trusted_validator_set.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::*;
    use crate::mock::host::{signed_header, validator_keys, validator_set};

    #[test]
    fn validator_set_hash_depends_on_keys_and_power() {
        let keys = validator_keys("chainA", 4);
        let set = validator_set(&keys, &[10, 10, 10, 10]);

        assert_eq!(set.total_voting_power(), 40);
        assert_eq!(set.hash(), validator_set(&keys, &[10, 10, 10, 10]).hash());
        assert_ne!(set.hash(), validator_set(&keys, &[10, 10, 10, 11]).hash());
        assert_ne!(set.hash(), validator_set(&keys[..3], &[10, 10, 10]).hash());
    }

    #[test]
    fn duplicate_signatures_count_once() {
        let keys = validator_keys("chainA", 3);
        let set = validator_set(&keys, &[1, 1, 1]);
        let chain_id = ChainId::new("chainA".to_string(), 0);
        let time = Timestamp::from_seconds(5);
        let mut header = signed_header(&chain_id, 5, time, vec![1; 32], &keys, &set, &set);

        let first = header.commit.signatures[0].clone();
        header.commit.signatures.push(first.clone());
        header.commit.signatures.push(first);

        assert_eq!(header.commit.signatures.len(), 5);
        assert_eq!(header.commit.unique_signatures().len(), 3);
    }

    #[test]
    fn raw_header_rejects_forged_validator_addresses() {
        let keys = validator_keys("chainA", 2);
        let set = validator_set(&keys, &[5, 5]);
        let chain_id = ChainId::new("chainA".to_string(), 0);
        let header = Header {
            signed_header: signed_header(
                &chain_id,
                3,
                Timestamp::from_seconds(3),
                vec![7; 32],
                &keys,
                &set,
                &set,
            ),
            validator_set: set.clone(),
            trusted_height: Height::new(0, 2),
            trusted_validator_set: set,
        };

        let raw = RawTmHeader::from(header.clone());
        assert_eq!(Header::try_from(raw.clone()).unwrap(), header);

        let mut forged = raw;
        if let Some(set) = forged.validator_set.as_mut() {
            set.validators[0].address = vec![0; ADDRESS_LENGTH];
        }
        assert!(Header::try_from(forged).is_err());
    }
}

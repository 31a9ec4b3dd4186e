//! A deterministic, block-producing chain for tests. Validators are ed25519 keys derived from
//! a seed, blocks are produced every second from a fixed genesis time, and every committed
//! block keeps the multi-store snapshot it commits to so proofs can be served at any height.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

use crate::ics02_client::height::Height;
use crate::ics07_tendermint::client_state::{ClientState, TrustThreshold};
use crate::ics07_tendermint::consensus_state::ConsensusState;
use crate::ics07_tendermint::header::{
    address_of, canonical_sign_bytes, BlockHeader, Commit, CommitSig, Header, SignedHeader,
    Validator, ValidatorSet,
};
use crate::ics23_commitment::commitment::{CommitmentPrefix, CommitmentProofBytes, CommitmentRoot};
use crate::ics24_host::identifier::{ChainId, PortId};
use crate::ics24_host::path::Path;
use crate::ics26_routing::host::{IbcHost, IBC_STORE};
use crate::mock::context::MockModule;
use crate::mock::tree::MultiStore;
use crate::store::{KvStore, MemStore};
use crate::timestamp::Timestamp;

pub const GENESIS_TIME_SECS: u64 = 1_600_000_000;

/// The time of the block at `height`: one block per second since genesis.
pub fn block_time(height: u64) -> Timestamp {
    Timestamp::from_seconds(GENESIS_TIME_SECS + height)
}

pub fn mock_chain_id() -> ChainId {
    ChainId::new("mockgaia".to_string(), 0)
}

pub fn validator_keys(seed: &str, n: usize) -> Vec<SigningKey> {
    (0..n)
        .map(|i| {
            let secret: [u8; 32] = Sha256::digest(format!("{}-{}", seed, i).as_bytes()).into();
            SigningKey::from_bytes(&secret)
        })
        .collect()
}

pub fn validator_set(keys: &[SigningKey], powers: &[u64]) -> ValidatorSet {
    ValidatorSet::new(
        keys.iter()
            .zip(powers)
            .map(|(key, power)| Validator::new(key.verifying_key().to_bytes(), *power))
            .collect(),
    )
}

pub fn default_validator_keys() -> Vec<SigningKey> {
    validator_keys("mock-validator", 4)
}

pub fn default_validator_set() -> ValidatorSet {
    validator_set(&default_validator_keys(), &[10; 4])
}

/// A block header committed by `signers`.
pub fn signed_header(
    chain_id: &ChainId,
    height: u64,
    time: Timestamp,
    app_hash: Vec<u8>,
    signers: &[SigningKey],
    validators: &ValidatorSet,
    next_validators: &ValidatorSet,
) -> SignedHeader {
    let header = BlockHeader {
        chain_id: chain_id.clone(),
        height,
        time,
        validators_hash: validators.hash(),
        next_validators_hash: next_validators.hash(),
        app_hash,
    };
    let block_hash = header.hash();
    let sign_bytes = canonical_sign_bytes(chain_id, height, &block_hash);

    let signatures = signers
        .iter()
        .map(|key| CommitSig {
            validator_address: address_of(&key.verifying_key().to_bytes()),
            signature: key.sign(&sign_bytes).to_bytes().to_vec(),
        })
        .collect();

    SignedHeader {
        header,
        commit: Commit {
            height,
            block_hash,
            signatures,
        },
    }
}

pub fn mock_client_state(chain_id: ChainId, latest_height: Height) -> ClientState {
    ClientState::new(
        chain_id,
        TrustThreshold::ONE_THIRD,
        Duration::from_secs(14 * 24 * 3600),
        Duration::from_secs(21 * 24 * 3600),
        Duration::from_secs(3600),
        latest_height,
    )
    .expect("mock client parameters are valid")
}

/// The consensus state a client would store for the default validators' block at `height`.
pub fn mock_consensus_state(height: u64, app_hash: Vec<u8>) -> ConsensusState {
    ConsensusState::new(
        block_time(height),
        CommitmentRoot::from(app_hash),
        default_validator_set().hash(),
    )
}

/// A header at `height` signed by the default validators, on top of `trusted_height`.
pub fn mock_header(chain_id: &ChainId, height: u64, trusted_height: Height, app_hash: Vec<u8>) -> Header {
    let keys = default_validator_keys();
    let set = default_validator_set();

    Header {
        signed_header: signed_header(chain_id, height, block_time(height), app_hash, &keys, &set, &set),
        validator_set: set.clone(),
        trusted_height,
        trusted_validator_set: set,
    }
}

struct Block {
    header: SignedHeader,
    state: MultiStore,
}

/// A chain running the IBC host over an in-memory store. The store is executed at the height
/// following the latest committed block; `commit_block` seals it.
pub struct MockChainHost {
    chain_id: ChainId,
    ibc: IbcHost<MemStore>,
    module: Arc<MockModule>,
    keys: Vec<SigningKey>,
    validators: ValidatorSet,
    blocks: BTreeMap<u64, Block>,
}

impl MockChainHost {
    /// A chain with the transfer port bound and its genesis block, at height 1, committed.
    pub fn new(chain_id: ChainId) -> Self {
        let first = Height::new(chain_id.version(), 1);
        let store = MemStore::new(first, block_time(1));
        store.mount(IBC_STORE);

        let ibc = IbcHost::new(store, CommitmentPrefix::from(IBC_STORE.as_bytes().to_vec()));
        let module = Arc::new(MockModule::default());
        ibc.bind_port(PortId::transfer(), module.clone())
            .expect("a fresh host has no bound ports");

        let mut chain = Self {
            chain_id,
            ibc,
            module,
            keys: default_validator_keys(),
            validators: default_validator_set(),
            blocks: BTreeMap::new(),
        };
        chain.commit_block();
        chain
    }

    pub fn ibc(&self) -> &IbcHost<MemStore> {
        &self.ibc
    }

    /// The application bound to the transfer port.
    pub fn module(&self) -> &Arc<MockModule> {
        &self.module
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn prefix(&self) -> CommitmentPrefix {
        self.ibc.prefix().clone()
    }

    /// Height of the latest committed block.
    pub fn latest_height(&self) -> Height {
        let height = self.blocks.keys().next_back().copied().unwrap_or_default();
        Height::new(self.chain_id.version(), height)
    }

    /// Seals the state written so far into a block and starts executing the next one.
    pub fn commit_block(&mut self) -> Height {
        let height = self.ibc.store().current_height();
        let state = MultiStore::from_namespaces(height.revision_height, self.ibc.store().snapshot());
        let header = signed_header(
            &self.chain_id,
            height.revision_height,
            block_time(height.revision_height),
            state.app_hash(),
            &self.keys,
            &self.validators,
            &self.validators,
        );
        self.blocks
            .insert(height.revision_height, Block { header, state });

        let next = height.increment();
        self.ibc
            .store()
            .set_host(next, block_time(next.revision_height));
        height
    }

    /// A proof of `path` against the block at `height`: membership if the path is set in that
    /// block, non-membership otherwise.
    pub fn proof(&self, path: &Path, height: Height) -> Option<CommitmentProofBytes> {
        let state = &self.blocks.get(&height.revision_height)?.state;
        let key = path.to_key();
        state
            .membership_proof(IBC_STORE, &key)
            .or_else(|| state.non_membership_proof(IBC_STORE, &key))
    }

    /// The raw value of `path` in the block at `height`.
    pub fn query(&self, path: &Path, height: Height) -> Option<Vec<u8>> {
        self.blocks
            .get(&height.revision_height)?
            .state
            .get(IBC_STORE, &path.to_key())
    }

    /// A header for the block at `target`, for a client that trusts the block at `trusted`.
    pub fn header(&self, target: Height, trusted: Height) -> Option<Header> {
        let block = self.blocks.get(&target.revision_height)?;
        if !self.blocks.contains_key(&trusted.revision_height) {
            return None;
        }

        Some(Header {
            signed_header: block.header.clone(),
            validator_set: self.validators.clone(),
            trusted_height: trusted,
            trusted_validator_set: self.validators.clone(),
        })
    }

    pub fn consensus_state(&self, height: Height) -> Option<ConsensusState> {
        let header = &self.blocks.get(&height.revision_height)?.header.header;
        Some(ConsensusState::new(
            header.time,
            CommitmentRoot::from_bytes(&header.app_hash),
            header.next_validators_hash.clone(),
        ))
    }

    /// The state a client tracking this chain starts from, at the latest committed height.
    pub fn client_state(&self) -> ClientState {
        mock_client_state(self.chain_id.clone(), self.latest_height())
    }

    /// Heights of every committed block, oldest first.
    pub fn committed_heights(&self) -> Vec<Height> {
        self.blocks
            .keys()
            .map(|h| Height::new(self.chain_id.version(), *h))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{block_time, mock_chain_id, MockChainHost};
    use crate::ics02_client::height::Height;
    use crate::ics04_channel::context::ChannelKeeper;
    use crate::ics04_channel::packet::Sequence;
    use crate::ics07_tendermint::client_def::TendermintClient;
    use crate::ics24_host::identifier::{ChannelId, PortId};
    use crate::ics24_host::path::Path;

    #[test]
    fn blocks_commit_the_host_state() {
        let mut chain = MockChainHost::new(mock_chain_id());
        assert_eq!(chain.latest_height(), Height::new(0, 1));

        chain
            .ibc()
            .store_next_sequence_recv(&PortId::transfer(), &ChannelId::new(0), Sequence::from(3))
            .unwrap();
        let height = chain.commit_block();
        assert_eq!(height, Height::new(0, 2));
        assert_eq!(chain.latest_height(), height);

        let consensus = chain.consensus_state(height).unwrap();
        assert_eq!(consensus.timestamp, block_time(2));

        let path = Path::SeqRecvs(PortId::transfer(), ChannelId::new(0));
        let proof = chain.proof(&path, height).unwrap();
        TendermintClient::default()
            .verify_next_sequence_recv(
                &chain.client_state(),
                &consensus,
                &chain.prefix(),
                &proof,
                height,
                &PortId::transfer(),
                &ChannelId::new(0),
                Sequence::from(3),
            )
            .unwrap();

        // The genesis block predates the write.
        assert!(chain.query(&path, Height::new(0, 1)).is_none());
        assert_eq!(
            chain.query(&path, height),
            Some(3u64.to_be_bytes().to_vec())
        );
    }

    #[test]
    fn headers_chain_onto_trusted_blocks() {
        let mut chain = MockChainHost::new(mock_chain_id());
        chain.commit_block();
        chain.commit_block();

        let header = chain
            .header(Height::new(0, 3), Height::new(0, 1))
            .unwrap();
        assert_eq!(header.height(), Height::new(0, 3));
        assert_eq!(header.timestamp(), block_time(3));
        assert!(chain.header(Height::new(0, 4), Height::new(0, 1)).is_none());
        assert_eq!(chain.committed_heights().len(), 3);
    }
}

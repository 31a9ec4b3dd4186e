//! Proofs about state inside a named module store of a multi-store chain.
//!
//! A multi-store commits every module store (`bank`, `ibc`, `staking`, ...) as its own tree and
//! then commits the set of `(store name, store root)` pairs as a simple Merkle tree whose root
//! is the application hash. Verifying a key inside a store is therefore two chained existence
//! checks: the key under the store root, then the store root under the application hash.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use ics23::commitment_proof::Proof;
use ics23::{CommitmentProof, ExistenceProof};
use prost::Message;
use sha2::{Digest, Sha256};
use tendermint::crypto::default::Sha256 as MerkleHasher;
use tendermint::merkle::simple_hash_from_byte_vectors;

use crate::ics02_client::height::Height;
use crate::ics23_commitment::commitment::{CommitmentPrefix, CommitmentProofBytes, CommitmentRoot};
use crate::ics23_commitment::error::{Error, Kind};
use crate::ics23_commitment::merkle::MerkleProof;
use crate::ics23_commitment::specs::ProofSpecs;
use crate::ics23_commitment::verify;
use crate::proto::RawStoreInfo;

/// Module stores that proofs may name. Anything else is rejected before a key path is built.
pub const ALLOWED_STORES: &[&str] = &[
    "acc",
    "authz",
    "bank",
    "capability",
    "distribution",
    "evidence",
    "feegrant",
    "gov",
    "ibc",
    "mint",
    "params",
    "slashing",
    "staking",
    "transfer",
    "upgrade",
];

const BANK_BALANCES_PREFIX: u8 = 0x02;
const STAKING_VALIDATORS_PREFIX: u8 = 0x21;
const GOV_PROPOSALS_PREFIX: u8 = 0x00;

/// The name of a committed module store, checked against [`ALLOWED_STORES`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreName(String);

impl StoreName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn bank() -> Self {
        Self("bank".to_string())
    }

    pub fn staking() -> Self {
        Self("staking".to_string())
    }

    pub fn gov() -> Self {
        Self("gov".to_string())
    }

    pub fn ibc() -> Self {
        Self("ibc".to_string())
    }
}

impl FromStr for StoreName {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let well_formed = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

        if !well_formed || !ALLOWED_STORES.contains(&name) {
            return Err(Kind::StoreNotAllowed(name.to_string()).into());
        }

        Ok(Self(name.to_string()))
    }
}

impl TryFrom<&CommitmentPrefix> for StoreName {
    type Error = Error;

    fn try_from(prefix: &CommitmentPrefix) -> Result<Self, Self::Error> {
        let name = std::str::from_utf8(prefix.as_bytes())
            .map_err(|e| Kind::StoreNotAllowed(prefix.to_string()).context(e))?;
        StoreName::from_str(name)
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The committed root of one module store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreInfo {
    pub name: String,
    pub root: Vec<u8>,
}

impl StoreInfo {
    pub fn new(name: impl Into<String>, root: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    /// The simple Merkle leaf committing this store:
    /// `varint(len name) || name || varint(32) || sha256(root)`.
    pub fn leaf_bytes(&self) -> Vec<u8> {
        let value_hash = Sha256::digest(&self.root);

        let mut leaf = Vec::with_capacity(self.name.len() + 34);
        prost::encoding::encode_varint(self.name.len() as u64, &mut leaf);
        leaf.extend_from_slice(self.name.as_bytes());
        prost::encoding::encode_varint(value_hash.len() as u64, &mut leaf);
        leaf.extend_from_slice(&value_hash);
        leaf
    }
}

impl From<RawStoreInfo> for StoreInfo {
    fn from(raw: RawStoreInfo) -> Self {
        StoreInfo::new(raw.name, raw.root)
    }
}

impl From<StoreInfo> for RawStoreInfo {
    fn from(info: StoreInfo) -> Self {
        RawStoreInfo {
            name: info.name,
            root: info.root,
        }
    }
}

/// Computes the application hash committing to the given store roots.
pub fn calculate_commitment(store_infos: &[StoreInfo]) -> Result<CommitmentRoot, Error> {
    if store_infos.is_empty() {
        return Err(Kind::InvalidStoreInfos("no stores to commit".to_string()).into());
    }

    let mut sorted: Vec<&StoreInfo> = store_infos.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for pair in sorted.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(Kind::InvalidStoreInfos(format!("duplicate store {}", pair[0].name)).into());
        }
    }
    if let Some(info) = sorted.iter().find(|info| info.name.is_empty()) {
        return Err(Kind::InvalidStoreInfos(format!("unnamed store with root {:?}", info.root)).into());
    }

    let leaves: Vec<Vec<u8>> = sorted.iter().map(|info| info.leaf_bytes()).collect();
    let root = simple_hash_from_byte_vectors::<MerkleHasher>(&leaves);

    Ok(CommitmentRoot::from_bytes(&root))
}

/// A claim about a key inside a named module store at a given height.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiStoreProof {
    pub store: StoreName,
    pub height: Height,
    /// Existence or non-existence of the key under the store root.
    pub value_proof: CommitmentProof,
    /// Existence of `store -> store root` under the application hash.
    pub store_proof: Option<ExistenceProof>,
    /// Every committed store root, as an alternative to `store_proof`.
    pub store_infos: Vec<StoreInfo>,
}

impl MultiStoreProof {
    pub fn new(store: StoreName, height: Height, proof: MerkleProof) -> Result<Self, Error> {
        let mut proofs = proof.proofs.into_iter();
        let value_proof = proofs.next().ok_or(Kind::EmptyProof)?;

        let store_proof = match proofs.next() {
            None => None,
            Some(CommitmentProof {
                proof: Some(Proof::Exist(existence)),
            }) => Some(existence),
            Some(_) => {
                return Err(Kind::malformed("the multi-store proof must be an existence proof").into())
            }
        };

        if store_proof.is_none() && proof.store_infos.is_empty() {
            return Err(Kind::malformed(format!(
                "no proof links store {} to the application hash",
                store
            ))
            .into());
        }

        Ok(Self {
            store,
            height,
            value_proof,
            store_proof,
            store_infos: proof.store_infos,
        })
    }
}

/// Verifies `key -> value` inside the proof's store under the application hash `app_hash`.
pub fn verify_membership(
    specs: &ProofSpecs,
    app_hash: &[u8],
    proof: &MultiStoreProof,
    key: &[u8],
    value: &[u8],
) -> Result<(), Error> {
    let existence = match &proof.value_proof.proof {
        Some(Proof::Exist(existence)) => existence,
        None => return Err(Kind::EmptyProof.into()),
        Some(_) => return Err(Kind::malformed("expected an existence proof for the value").into()),
    };
    if existence.key != key {
        return Err(Kind::KeyMismatch.into());
    }
    if existence.value != value {
        return Err(Kind::ValueMismatch.into());
    }

    let store_root = verify::existence_root(specs.store_spec(), existence)?;
    verify::verify_membership(specs.store_spec(), &store_root, &proof.value_proof, key, value)?;

    verify_store_root(specs, app_hash, proof, &store_root)
}

/// Verifies that `key` is absent from the proof's store under the application hash `app_hash`.
pub fn verify_non_membership(
    specs: &ProofSpecs,
    app_hash: &[u8],
    proof: &MultiStoreProof,
    key: &[u8],
) -> Result<(), Error> {
    let non_existence = match &proof.value_proof.proof {
        Some(Proof::Nonexist(non_existence)) => non_existence,
        None => return Err(Kind::EmptyProof.into()),
        Some(_) => return Err(Kind::malformed("expected a non-existence proof for the key").into()),
    };

    let neighbour = non_existence
        .left
        .as_ref()
        .or_else(|| non_existence.right.as_ref())
        .ok_or_else(|| Kind::malformed("non-existence proof without neighbours"))?;
    let store_root = verify::existence_root(specs.store_spec(), neighbour)?;
    verify::verify_non_membership(specs.store_spec(), &store_root, &proof.value_proof, key)?;

    verify_store_root(specs, app_hash, proof, &store_root)
}

fn verify_store_root(
    specs: &ProofSpecs,
    app_hash: &[u8],
    proof: &MultiStoreProof,
    store_root: &[u8],
) -> Result<(), Error> {
    if let Some(store_proof) = &proof.store_proof {
        return verify::verify_existence(
            specs.multistore_spec(),
            app_hash,
            store_proof,
            proof.store.as_bytes(),
            store_root,
        );
    }

    let committed = calculate_commitment(&proof.store_infos)?;
    if committed.as_bytes() != app_hash {
        return Err(Kind::RootMismatch.into());
    }

    let info = proof
        .store_infos
        .iter()
        .find(|info| info.name == proof.store.as_str())
        .ok_or_else(|| Kind::StoreNotFound(proof.store.to_string()))?;
    if info.root != store_root {
        return Err(Kind::RootMismatch.into());
    }

    Ok(())
}

/// Protobuf encoding of a bank balance (`cosmos.base.v1beta1.Coin`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawCoin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

fn length_prefixed(prefix: u8, address: &[u8]) -> Result<Vec<u8>, Error> {
    let len = u8::try_from(address.len())
        .map_err(|e| Kind::malformed("address longer than 255 bytes").context(e))?;

    let mut key = Vec::with_capacity(address.len() + 2);
    key.push(prefix);
    key.push(len);
    key.extend_from_slice(address);
    Ok(key)
}

pub fn bank_balance_key(address: &[u8], denom: &str) -> Result<Vec<u8>, Error> {
    let mut key = length_prefixed(BANK_BALANCES_PREFIX, address)?;
    key.extend_from_slice(denom.as_bytes());
    Ok(key)
}

pub fn staking_validator_key(operator_address: &[u8]) -> Result<Vec<u8>, Error> {
    length_prefixed(STAKING_VALIDATORS_PREFIX, operator_address)
}

pub fn gov_proposal_key(proposal_id: u64) -> Vec<u8> {
    let mut key = vec![GOV_PROPOSALS_PREFIX];
    key.extend_from_slice(&proposal_id.to_be_bytes());
    key
}

/// Verifies that `address` holds `amount` of `denom` in the bank store.
pub fn verify_bank_balance(
    app_hash: &CommitmentRoot,
    proof: &CommitmentProofBytes,
    height: Height,
    address: &[u8],
    denom: &str,
    amount: &str,
) -> Result<(), Error> {
    let key = bank_balance_key(address, denom)?;
    let value = RawCoin {
        denom: denom.to_string(),
        amount: amount.to_string(),
    }
    .encode_to_vec();

    verify_in_store(StoreName::bank(), app_hash, proof, height, &key, &value)
}

/// Verifies the encoded validator record of `operator_address` in the staking store.
pub fn verify_staking_validator(
    app_hash: &CommitmentRoot,
    proof: &CommitmentProofBytes,
    height: Height,
    operator_address: &[u8],
    validator: &[u8],
) -> Result<(), Error> {
    let key = staking_validator_key(operator_address)?;
    verify_in_store(StoreName::staking(), app_hash, proof, height, &key, validator)
}

/// Verifies the encoded proposal `proposal_id` in the governance store.
pub fn verify_gov_proposal(
    app_hash: &CommitmentRoot,
    proof: &CommitmentProofBytes,
    height: Height,
    proposal_id: u64,
    proposal: &[u8],
) -> Result<(), Error> {
    let key = gov_proposal_key(proposal_id);
    verify_in_store(StoreName::gov(), app_hash, proof, height, &key, proposal)
}

fn verify_in_store(
    store: StoreName,
    app_hash: &CommitmentRoot,
    proof: &CommitmentProofBytes,
    height: Height,
    key: &[u8],
    value: &[u8],
) -> Result<(), Error> {
    let proof = MultiStoreProof::new(store, height, MerkleProof::try_from(proof)?)?;
    verify_membership(&ProofSpecs::cosmos(), app_hash.as_bytes(), &proof, key, value)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use prost::Message;

    use super::*;
    use crate::mock::tree::{MerkleTree, MultiStore};

    fn multistore() -> MultiStore {
        let mut store = MultiStore::new(3);
        store.set("bank", bank_balance_key(b"alice", "uatom").unwrap(), RawCoin {
            denom: "uatom".to_string(),
            amount: "100".to_string(),
        }
        .encode_to_vec());
        store.set("bank", bank_balance_key(b"bob", "uatom").unwrap(), RawCoin {
            denom: "uatom".to_string(),
            amount: "7".to_string(),
        }
        .encode_to_vec());
        store.set("staking", staking_validator_key(b"valoper1").unwrap(), b"validator-one".to_vec());
        store.set("gov", gov_proposal_key(42), b"proposal-42".to_vec());
        store.set("ibc", b"connections/connection-0".to_vec(), b"conn".to_vec());
        store
    }

    #[test]
    fn store_names_are_allow_listed() {
        assert!(StoreName::from_str("bank").is_ok());
        assert!(StoreName::from_str("ibc").is_ok());

        for bad in &["", "../bank", "bank/", "Bank", "wasm", "ibc\0"] {
            assert_eq!(
                StoreName::from_str(bad).unwrap_err().kind(),
                &Kind::StoreNotAllowed(bad.to_string())
            );
        }
    }

    #[test]
    fn commitment_matches_the_simple_merkle_tree_of_store_roots() {
        let store = multistore();
        let infos = store.store_infos();

        let mut tree = MerkleTree::new(ics23::tendermint_spec(), 0);
        for info in &infos {
            tree.insert(info.name.as_bytes().to_vec(), info.root.clone());
        }

        assert_eq!(calculate_commitment(&infos).unwrap().as_bytes(), &tree.root()[..]);
        assert_eq!(store.app_hash(), tree.root());

        // Order of the store infos does not matter.
        let mut reversed = infos.clone();
        reversed.reverse();
        assert_eq!(calculate_commitment(&reversed).unwrap(), calculate_commitment(&infos).unwrap());

        let mut duplicated = infos.clone();
        duplicated.push(infos[0].clone());
        assert!(calculate_commitment(&duplicated).is_err());
        assert!(calculate_commitment(&[]).is_err());
    }

    #[test]
    fn convenience_wrappers() {
        let store = multistore();
        let app_hash = CommitmentRoot::from_bytes(&store.app_hash());
        let height = Height::new(0, 3);

        let key = bank_balance_key(b"alice", "uatom").unwrap();
        let proof = store.membership_proof("bank", &key).unwrap();
        assert!(verify_bank_balance(&app_hash, &proof, height, b"alice", "uatom", "100").is_ok());
        assert!(verify_bank_balance(&app_hash, &proof, height, b"alice", "uatom", "101").is_err());

        let key = staking_validator_key(b"valoper1").unwrap();
        let proof = store.membership_proof("staking", &key).unwrap();
        assert!(verify_staking_validator(&app_hash, &proof, height, b"valoper1", b"validator-one").is_ok());
        // The staking proof does not prove anything about the bank store.
        assert!(verify_bank_balance(&app_hash, &proof, height, b"valoper1", "uatom", "1").is_err());

        let proof = store.membership_proof("gov", &gov_proposal_key(42)).unwrap();
        assert!(verify_gov_proposal(&app_hash, &proof, height, 42, b"proposal-42").is_ok());
        assert!(verify_gov_proposal(&app_hash, &proof, height, 43, b"proposal-42").is_err());
    }

    #[test]
    fn store_infos_can_replace_the_store_proof() {
        let store = multistore();
        let app_hash = store.app_hash();
        let specs = ProofSpecs::cosmos();
        let key = b"connections/connection-0".to_vec();

        let with_infos = MerkleProof {
            proofs: vec![store.store_tree("ibc").existence_proof(&key).unwrap()],
            store_infos: store.store_infos(),
        };
        let proof = MultiStoreProof::new(StoreName::ibc(), Height::new(0, 3), with_infos.clone()).unwrap();
        assert!(verify_membership(&specs, &app_hash, &proof, &key, b"conn").is_ok());

        // Tampering with any committed root breaks the recomputed application hash.
        let mut tampered = with_infos;
        tampered.store_infos[0].root[0] ^= 0xff;
        let proof = MultiStoreProof::new(StoreName::ibc(), Height::new(0, 3), tampered).unwrap();
        assert_eq!(
            verify_membership(&specs, &app_hash, &proof, &key, b"conn").unwrap_err().kind(),
            &Kind::RootMismatch
        );
    }

    #[test]
    fn non_membership_across_stores() {
        let store = multistore();
        let app_hash = CommitmentRoot::from_bytes(&store.app_hash());
        let prefix = CommitmentPrefix::from(b"ibc".to_vec());
        let specs = ProofSpecs::cosmos();
        let height = Height::new(0, 3);

        let missing = b"connections/connection-9".to_vec();
        let proof = store.non_membership_proof("ibc", &missing).unwrap();
        assert!(crate::ics23_commitment::merkle::verify_non_membership(
            &specs, &app_hash, &prefix, &proof, height, &missing
        )
        .is_ok());

        let present = b"connections/connection-0".to_vec();
        let proof = store.membership_proof("ibc", &present).unwrap();
        assert!(crate::ics23_commitment::merkle::verify_non_membership(
            &specs, &app_hash, &prefix, &proof, height, &present
        )
        .is_err());
    }
}

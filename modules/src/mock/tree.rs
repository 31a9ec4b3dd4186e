//! Reference Merkle trees producing real ICS-23 proofs, for tests and the mock chain.
//!
//! Two layouts are supported, selected by the proof spec the tree is created with: the IAVL
//! layout used for module stores and the simple Merkle layout used for the multi-store. Trees
//! are rebuilt balanced from the sorted entries on every query.

use std::collections::BTreeMap;
use std::ops::Bound;

use ics23::commitment_proof::Proof;
use ics23::{
    calculate_existence_root, CommitmentProof, ExistenceProof, HashOp, HostFunctionsManager,
    InnerOp, LeafOp, NonExistenceProof, ProofSpec,
};
use sha2::{Digest, Sha256};

use crate::ics23_commitment::commitment::CommitmentProofBytes;
use crate::ics23_commitment::merkle::MerkleProof;
use crate::ics23_commitment::multistore::StoreInfo;
use crate::ics23_commitment::specs::is_iavl_spec;
use crate::proto::RawMerkleProof;

#[derive(Clone, Debug)]
pub struct MerkleTree {
    spec: ProofSpec,
    version: u64,
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MerkleTree {
    pub fn new(spec: ProofSpec, version: u64) -> Self {
        Self {
            spec,
            version,
            entries: BTreeMap::new(),
        }
    }

    pub fn from_entries(spec: ProofSpec, version: u64, entries: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Self {
            spec,
            version,
            entries,
        }
    }

    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// The root hash; the hash of the empty string for an empty tree.
    pub fn root(&self) -> Vec<u8> {
        let items = self.entries();
        if items.is_empty() {
            return Sha256::digest(b"").to_vec();
        }
        self.node(&items).0
    }

    pub fn existence_proof(&self, key: &[u8]) -> Option<CommitmentProof> {
        let proof = self.exist(key)?;
        Some(CommitmentProof {
            proof: Some(Proof::Exist(proof)),
        })
    }

    /// A proof bracketing `key` by its neighbours, or `None` when the key is present.
    pub fn non_existence_proof(&self, key: &[u8]) -> Option<CommitmentProof> {
        if self.entries.contains_key(key) {
            return None;
        }

        let left = self
            .entries
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key)))
            .next_back()
            .and_then(|(k, _)| self.exist(k));
        let right = self
            .entries
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
            .next()
            .and_then(|(k, _)| self.exist(k));

        Some(CommitmentProof {
            proof: Some(Proof::Nonexist(NonExistenceProof {
                key: key.to_vec(),
                left,
                right,
            })),
        })
    }

    fn exist(&self, key: &[u8]) -> Option<ExistenceProof> {
        let items = self.entries();
        let index = items.iter().position(|(k, _)| k.as_slice() == key)?;
        let (_, _, path) = self.path(&items, index);

        Some(ExistenceProof {
            key: items[index].0.clone(),
            value: items[index].1.clone(),
            leaf: Some(self.leaf_op()),
            path,
        })
    }

    fn iavl(&self) -> bool {
        is_iavl_spec(&self.spec)
    }

    fn leaf_op(&self) -> LeafOp {
        let mut leaf = self.spec.leaf_spec.clone().unwrap_or_default();
        if self.iavl() {
            let mut prefix = Vec::new();
            zigzag(0, &mut prefix);
            zigzag(1, &mut prefix);
            zigzag(self.version as i64, &mut prefix);
            leaf.prefix = prefix;
        }
        leaf
    }

    fn split(&self, len: usize) -> usize {
        if self.iavl() {
            return len / 2;
        }
        // Simple Merkle trees split at the largest power of two strictly below the size.
        let mut k = 1;
        while k * 2 < len {
            k *= 2;
        }
        k
    }

    fn node(&self, items: &[(Vec<u8>, Vec<u8>)]) -> (Vec<u8>, i64) {
        if items.len() == 1 {
            let (key, value) = &items[0];
            let leaf = ExistenceProof {
                key: key.clone(),
                value: value.clone(),
                leaf: Some(self.leaf_op()),
                path: vec![],
            };
            let hash = calculate_existence_root::<HostFunctionsManager>(&leaf)
                .expect("leaf op of a valid spec");
            return (hash, 0);
        }

        let k = self.split(items.len());
        let (left, left_height) = self.node(&items[..k]);
        let (right, right_height) = self.node(&items[k..]);
        let height = left_height.max(right_height) + 1;
        let op = self.inner_op(height, items.len(), &right, true);

        (hash_inner(&op, &left), height)
    }

    /// Root hash, height and inner path (leaf first) of the entry at `index`.
    fn path(&self, items: &[(Vec<u8>, Vec<u8>)], index: usize) -> (Vec<u8>, i64, Vec<InnerOp>) {
        if items.len() == 1 {
            let (hash, height) = self.node(items);
            return (hash, height, vec![]);
        }

        let k = self.split(items.len());
        let on_left = index < k;
        let ((child, child_height, mut path), (sibling, sibling_height)) = if on_left {
            (self.path(&items[..k], index), self.node(&items[k..]))
        } else {
            (self.path(&items[k..], index - k), self.node(&items[..k]))
        };

        let height = child_height.max(sibling_height) + 1;
        let op = self.inner_op(height, items.len(), &sibling, on_left);
        let hash = hash_inner(&op, &child);
        path.push(op);

        (hash, height, path)
    }

    /// The inner op hashing a child together with its `sibling`.
    fn inner_op(&self, height: i64, size: usize, sibling: &[u8], child_on_left: bool) -> InnerOp {
        let mut prefix = Vec::new();
        let mut suffix = Vec::new();

        if self.iavl() {
            zigzag(height, &mut prefix);
            zigzag(size as i64, &mut prefix);
            zigzag(self.version as i64, &mut prefix);
            prefix.push(32);
            if child_on_left {
                suffix.push(32);
                suffix.extend_from_slice(sibling);
            } else {
                prefix.extend_from_slice(sibling);
                prefix.push(32);
            }
        } else {
            prefix.push(1);
            if child_on_left {
                suffix.extend_from_slice(sibling);
            } else {
                prefix.extend_from_slice(sibling);
            }
        }

        InnerOp {
            hash: HashOp::Sha256.into(),
            prefix,
            suffix,
        }
    }
}

fn hash_inner(op: &InnerOp, child: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(&op.prefix);
    hasher.update(child);
    hasher.update(&op.suffix);
    hasher.finalize().to_vec()
}

fn zigzag(value: i64, out: &mut Vec<u8>) {
    prost::encoding::encode_varint(((value << 1) ^ (value >> 63)) as u64, out);
}

/// A set of named IAVL stores committed under a simple Merkle tree of their roots.
#[derive(Clone, Debug)]
pub struct MultiStore {
    version: u64,
    stores: BTreeMap<String, MerkleTree>,
}

impl MultiStore {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            stores: BTreeMap::new(),
        }
    }

    pub fn from_namespaces(version: u64, namespaces: BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>) -> Self {
        let stores = namespaces
            .into_iter()
            .map(|(name, entries)| (name, MerkleTree::from_entries(ics23::iavl_spec(), version, entries)))
            .collect();
        Self { version, stores }
    }

    pub fn set(&mut self, store: &str, key: Vec<u8>, value: Vec<u8>) {
        let version = self.version;
        self.stores
            .entry(store.to_string())
            .or_insert_with(|| MerkleTree::new(ics23::iavl_spec(), version))
            .insert(key, value);
    }

    pub fn store_tree(&self, store: &str) -> &MerkleTree {
        &self.stores[store]
    }

    /// The value committed under `key` in `store`, if any.
    pub fn get(&self, store: &str, key: &[u8]) -> Option<Vec<u8>> {
        self.stores.get(store)?.entries.get(key).cloned()
    }

    pub fn store_infos(&self) -> Vec<StoreInfo> {
        self.stores
            .iter()
            .map(|(name, tree)| StoreInfo::new(name.clone(), tree.root()))
            .collect()
    }

    fn roots_tree(&self) -> MerkleTree {
        let mut tree = MerkleTree::new(ics23::tendermint_spec(), 0);
        for info in self.store_infos() {
            tree.insert(info.name.into_bytes(), info.root);
        }
        tree
    }

    pub fn app_hash(&self) -> Vec<u8> {
        self.roots_tree().root()
    }

    pub fn membership_proof(&self, store: &str, key: &[u8]) -> Option<CommitmentProofBytes> {
        let value_proof = self.stores.get(store)?.existence_proof(key)?;
        self.chain(store, value_proof)
    }

    pub fn non_membership_proof(&self, store: &str, key: &[u8]) -> Option<CommitmentProofBytes> {
        let value_proof = self.stores.get(store)?.non_existence_proof(key)?;
        self.chain(store, value_proof)
    }

    fn chain(&self, store: &str, value_proof: CommitmentProof) -> Option<CommitmentProofBytes> {
        let store_proof = self.roots_tree().existence_proof(store.as_bytes())?;
        let proof = MerkleProof {
            proofs: vec![value_proof, store_proof],
            store_infos: vec![],
        };
        Some(RawMerkleProof::from(proof).into())
    }
}

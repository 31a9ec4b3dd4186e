use std::convert::TryFrom;
use std::fmt;

use prost::Message;
use serde_derive::{Deserialize, Serialize};
use subtle_encoding::hex;

use crate::ics23_commitment::error::{Error, Kind};
use crate::proto::RawMerkleProof;

/// The root hash a consensus state commits to, i.e. the application hash of the remote chain.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRoot {
    bytes: Vec<u8>,
}

impl CommitmentRoot {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for CommitmentRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode_upper(&self.bytes);
        f.debug_tuple("CommitmentRoot")
            .field(&String::from_utf8_lossy(&hex))
            .finish()
    }
}

impl From<Vec<u8>> for CommitmentRoot {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// Proof bytes as they cross the host boundary: an encoded [`RawMerkleProof`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentProofBytes {
    bytes: Vec<u8>,
}

impl CommitmentProofBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for CommitmentProofBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.bytes);
        f.debug_tuple("CommitmentProof")
            .field(&String::from_utf8_lossy(&hex))
            .finish()
    }
}

impl TryFrom<Vec<u8>> for CommitmentProofBytes {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.is_empty() {
            Err(Kind::EmptyProof.into())
        } else {
            Ok(Self { bytes })
        }
    }
}

impl From<CommitmentProofBytes> for Vec<u8> {
    fn from(p: CommitmentProofBytes) -> Vec<u8> {
        p.bytes
    }
}

impl From<RawMerkleProof> for CommitmentProofBytes {
    fn from(proof: RawMerkleProof) -> Self {
        Self {
            bytes: proof.encode_to_vec(),
        }
    }
}

impl TryFrom<&CommitmentProofBytes> for RawMerkleProof {
    type Error = Error;

    fn try_from(value: &CommitmentProofBytes) -> Result<Self, Self::Error> {
        RawMerkleProof::decode(value.as_bytes())
            .map_err(|e| Kind::InvalidRawMerkleProof.context(e).into())
    }
}

/// The key prefix under which a chain stores its IBC records. For Cosmos chains this is the
/// name of the module store, `ibc`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitmentPrefix(Vec<u8>);

impl CommitmentPrefix {
    pub fn new(content: Vec<u8>) -> Self {
        Self(content)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for CommitmentPrefix {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Default for CommitmentPrefix {
    fn default() -> Self {
        Self(b"ibc".to_vec())
    }
}

impl fmt::Debug for CommitmentPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let converted = std::str::from_utf8(self.as_bytes());
        match converted {
            Ok(s) => write!(f, "{}", s),
            Err(_e) => write!(f, "<not valid UTF8: {:?}>", self.as_bytes()),
        }
    }
}

impl fmt::Display for CommitmentPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde_derive::{Deserialize, Serialize};

use super::error::{ValidationError, ValidationKind};
use super::validate::*;
use crate::ics02_client::client_type::ClientType;

/// This type is subject to future changes.
///
/// A chain identifier in the epoch format `{chain name}-{revision number}`. Identifiers that do
/// not carry a revision suffix are accepted and map to revision 0.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId {
    id: String,
    version: u64,
}

impl ChainId {
    /// Creates a new `ChainId` given a chain name and an epoch number.
    ///
    /// ```
    /// use ibc::ics24_host::identifier::ChainId;
    ///
    /// let id = ChainId::new("chainA".to_string(), 1);
    /// assert_eq!(id.version(), 1);
    /// assert_eq!(id.as_str(), "chainA-1");
    /// ```
    pub fn new(name: String, version: u64) -> Self {
        Self {
            id: format!("{}-{}", name, version),
            version,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Extract the version from this chain identifier.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Extract the version from the given chain identifier.
    pub fn chain_version(chain_id: &str) -> u64 {
        if !ChainId::is_epoch_format(chain_id) {
            return 0;
        }

        chain_id
            .rsplit('-')
            .next()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// is_epoch_format() checks if a chain_id is in the format required for parsing epochs.
    /// The chainID must be in the form: `{chainID}-{version}`.
    pub fn is_epoch_format(chain_id: &str) -> bool {
        Regex::new(r"^.+[^-]-{1}[1-9][0-9]*$")
            .map(|re| re.is_match(chain_id))
            .unwrap_or(false)
    }
}

impl FromStr for ChainId {
    type Err = ValidationError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        validate_identifier(id, 1, 64)?;
        Ok(Self {
            id: id.to_string(),
            version: ChainId::chain_version(id),
        })
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Default for ChainId {
    fn default() -> Self {
        ChainId::new("defaultChainId".to_string(), 0)
    }
}

/// Parses the counter out of an identifier of the form `{prefix}-{counter}`.
fn counter_of(id: &str, prefix: &str) -> Result<u64, ValidationError> {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|counter| counter.parse::<u64>().ok())
        .ok_or_else(|| {
            ValidationKind::InvalidCounter {
                id: id.to_string(),
                prefix: prefix.to_string(),
            }
            .into()
        })
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(String);

impl ClientId {
    /// Builds a new client identifier. Client identifiers are deterministically formed from two
    /// elements: a prefix derived from the client type `ctype`, and a monotonically increasing
    /// `counter`; these are separated by a dash "-".
    ///
    /// ```
    /// # use ibc::ics24_host::identifier::ClientId;
    /// # use ibc::ics02_client::client_type::ClientType;
    /// let tm_client_id = ClientId::new(ClientType::Tendermint, 0);
    /// assert!(tm_client_id.is_ok());
    /// tm_client_id.map(|id| { assert_eq!(&id, "07-tendermint-0") });
    /// ```
    pub fn new(ctype: ClientType, counter: u64) -> Result<Self, ValidationError> {
        let id = format!("{}-{}", ctype.as_str(), counter);
        Self::from_str(id.as_str())
    }

    /// Get this identifier as a borrowed `&str`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn counter(&self) -> Result<u64, ValidationError> {
        counter_of(self.as_str(), ClientType::Tendermint.as_str())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_client_identifier(s).map(|_| Self(s.to_string()))
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self("07-tendermint-0".to_string())
    }
}

/// Equality check against string literal (satisfies &ClientId == &str).
/// ```
/// use std::str::FromStr;
/// use ibc::ics24_host::identifier::ClientId;
/// let client_id = ClientId::from_str("clientidtwo");
/// assert!(client_id.is_ok());
/// client_id.map(|id| {assert_eq!(&id, "clientidtwo")});
/// ```
impl PartialEq<str> for ClientId {
    fn eq(&self, other: &str) -> bool {
        self.as_str().eq(other)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    const PREFIX: &'static str = "connection";

    /// Builds a new connection identifier from the host's connection counter.
    ///
    /// ```
    /// # use ibc::ics24_host::identifier::ConnectionId;
    /// let conn_id = ConnectionId::new(11);
    /// assert_eq!(&conn_id, "connection-11");
    /// ```
    pub fn new(counter: u64) -> Self {
        Self(format!("{}-{}", Self::PREFIX, counter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn counter(&self) -> Result<u64, ValidationError> {
        counter_of(self.as_str(), Self::PREFIX)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_connection_identifier(s).map(|_| Self(s.to_string()))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PartialEq<str> for ConnectionId {
    fn eq(&self, other: &str) -> bool {
        self.as_str().eq(other)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortId(String);

impl PortId {
    pub fn transfer() -> Self {
        Self("transfer".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PortId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_port_identifier(s).map(|_| Self(s.to_string()))
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::transfer()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId(String);

impl ChannelId {
    const PREFIX: &'static str = "channel";

    /// Builds a new channel identifier from the host's channel counter.
    ///
    /// ```
    /// # use ibc::ics24_host::identifier::ChannelId;
    /// let chan_id = ChannelId::new(27);
    /// assert_eq!(chan_id.to_string(), "channel-27");
    /// ```
    pub fn new(counter: u64) -> Self {
        Self(format!("{}-{}", Self::PREFIX, counter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn counter(&self) -> Result<u64, ValidationError> {
        counter_of(self.as_str(), Self::PREFIX)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_channel_identifier(s).map(|_| Self(s.to_string()))
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{ChainId, ChannelId, ClientId, ConnectionId};
    use crate::ics02_client::client_type::ClientType;

    #[test]
    fn chain_id_versions() {
        assert_eq!(ChainId::from_str("ibc-5").unwrap().version(), 5);
        assert_eq!(ChainId::from_str("ibc").unwrap().version(), 0);
        assert_eq!(ChainId::from_str("ibc-05").unwrap().version(), 0);
        assert_eq!(ChainId::new("chain".to_string(), 3).as_str(), "chain-3");
    }

    #[test]
    fn counters_round_trip_through_identifiers() {
        let client_id = ClientId::new(ClientType::Tendermint, 42).unwrap();
        assert_eq!(client_id.counter().unwrap(), 42);
        assert_eq!(ConnectionId::new(7).counter().unwrap(), 7);
        assert_eq!(ChannelId::new(0).counter().unwrap(), 0);

        assert!(ConnectionId::from_str("connectionx-1").unwrap().counter().is_err());
    }
}

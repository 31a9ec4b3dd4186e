use std::convert::{TryFrom, TryInto};
use std::str::FromStr;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::ics03_connection::error::{Error, Kind};
use crate::ics03_connection::version::Version;
use crate::ics23_commitment::commitment::CommitmentPrefix;
use crate::ics24_host::identifier::{ClientId, ConnectionId};
use crate::proto::{RawConnectionCounterparty, RawConnectionEnd, RawMerklePrefix};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEnd {
    state: State,
    client_id: ClientId,
    counterparty: Counterparty,
    versions: Vec<Version>,
    delay_period: Duration,
}

impl ConnectionEnd {
    pub fn new(
        state: State,
        client_id: ClientId,
        counterparty: Counterparty,
        versions: Vec<Version>,
        delay_period: Duration,
    ) -> Self {
        Self {
            state,
            client_id,
            counterparty,
            versions,
            delay_period,
        }
    }

    /// Getter for the state of this connection end.
    pub fn state(&self) -> State {
        self.state
    }

    /// Setter for the `state` field.
    pub fn set_state(&mut self, new_state: State) {
        self.state = new_state;
    }

    /// Setter for the `counterparty` field.
    pub fn set_counterparty(&mut self, new_cparty: Counterparty) {
        self.counterparty = new_cparty;
    }

    /// Setter for the `version` field. After negotiation a single version remains.
    pub fn set_version(&mut self, new_version: Version) {
        self.versions = vec![new_version];
    }

    /// Helper function to compare the state of this end with another state.
    pub fn state_matches(&self, other: State) -> bool {
        self.state == other
    }

    pub fn is_open(&self) -> bool {
        self.state_matches(State::Open)
    }

    /// Getter for the client id on the local party of this connection end.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Getter for the list of versions in this connection end.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Getter for the counterparty.
    pub fn counterparty(&self) -> &Counterparty {
        &self.counterparty
    }

    pub fn delay_period(&self) -> Duration {
        self.delay_period
    }
}

impl TryFrom<RawConnectionEnd> for ConnectionEnd {
    type Error = Error;

    fn try_from(value: RawConnectionEnd) -> Result<Self, Self::Error> {
        let state = State::from_i32(value.state)?;
        if state == State::Uninitialized {
            return Err(Kind::InvalidState(value.state).into());
        }
        if value.versions.is_empty() {
            return Err(Kind::EmptyVersions.into());
        }

        Ok(Self::new(
            state,
            value
                .client_id
                .parse()
                .map_err(|e| Kind::IdentifierError.context(e))?,
            value
                .counterparty
                .ok_or(Kind::MissingCounterparty)?
                .try_into()?,
            value
                .versions
                .into_iter()
                .map(Version::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            Duration::from_nanos(value.delay_period),
        ))
    }
}

impl From<ConnectionEnd> for RawConnectionEnd {
    fn from(value: ConnectionEnd) -> Self {
        RawConnectionEnd {
            client_id: value.client_id.to_string(),
            versions: value.versions.into_iter().map(Into::into).collect(),
            state: value.state as i32,
            counterparty: Some(value.counterparty.into()),
            delay_period: u64::try_from(value.delay_period.as_nanos()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    client_id: ClientId,
    connection_id: Option<ConnectionId>,
    prefix: CommitmentPrefix,
}

impl Counterparty {
    pub fn new(
        client_id: ClientId,
        connection_id: Option<ConnectionId>,
        prefix: CommitmentPrefix,
    ) -> Self {
        Self {
            client_id,
            connection_id,
            prefix,
        }
    }

    /// Getter for the client id.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Getter for connection id.
    pub fn connection_id(&self) -> Option<&ConnectionId> {
        self.connection_id.as_ref()
    }

    pub fn prefix(&self) -> &CommitmentPrefix {
        &self.prefix
    }
}

impl TryFrom<RawConnectionCounterparty> for Counterparty {
    type Error = Error;

    fn try_from(value: RawConnectionCounterparty) -> Result<Self, Self::Error> {
        let connection_id = if value.connection_id.is_empty() {
            None
        } else {
            Some(
                ConnectionId::from_str(&value.connection_id)
                    .map_err(|e| Kind::IdentifierError.context(e))?,
            )
        };

        Ok(Counterparty::new(
            value
                .client_id
                .parse()
                .map_err(|e| Kind::IdentifierError.context(e))?,
            connection_id,
            value
                .prefix
                .ok_or(Kind::MissingCounterpartyPrefix)?
                .key_prefix
                .into(),
        ))
    }
}

impl From<Counterparty> for RawConnectionCounterparty {
    fn from(value: Counterparty) -> Self {
        RawConnectionCounterparty {
            client_id: value.client_id.to_string(),
            connection_id: value
                .connection_id
                .map_or_else(String::new, |v| v.to_string()),
            prefix: Some(RawMerklePrefix {
                key_prefix: value.prefix.as_bytes().to_vec(),
            }),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Uninitialized = 0,
    Init = 1,
    TryOpen = 2,
    Open = 3,
}

impl State {
    /// Yields the State as a string.
    pub fn as_string(&self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Init => "INIT",
            Self::TryOpen => "TRYOPEN",
            Self::Open => "OPEN",
        }
    }

    /// Parses the State out from a i32.
    pub fn from_i32(s: i32) -> Result<Self, Error> {
        match s {
            0 => Ok(Self::Uninitialized),
            1 => Ok(Self::Init),
            2 => Ok(Self::TryOpen),
            3 => Ok(Self::Open),
            _ => Err(Kind::InvalidState(s).into()),
        }
    }
}

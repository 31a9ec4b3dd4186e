use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::ics02_client::error::{Error, Kind};

/// Type of the client, depending on the specific consensus algorithm.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientType {
    Tendermint = 1,
}

impl ClientType {
    /// Yields the identifier of this client type as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tendermint => "07-tendermint",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClientType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "07-tendermint" => Ok(Self::Tendermint),
            _ => Err(Kind::UnknownClientType(s.to_string()).into()),
        }
    }
}

use std::fmt;

use serde_derive::{Deserialize, Serialize};

/// Whether a client can still be used to verify counterparty state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Active,
    /// Misbehaviour was proven; terminal.
    Frozen,
    /// The latest consensus state is older than the trusting period.
    Expired,
}

impl Status {
    pub fn is_active(&self) -> bool {
        *self == Status::Active
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Active => "Active",
            Status::Frozen => "Frozen",
            Status::Expired => "Expired",
        };
        write!(f, "{}", s)
    }
}

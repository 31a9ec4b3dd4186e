use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::ics04_channel::error::{Error, Kind};
use crate::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
use crate::proto::{RawChannel, RawChannelCounterparty};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEnd {
    state: State,
    ordering: Order,
    remote: Counterparty,
    connection_hops: Vec<ConnectionId>,
    version: String,
}

impl ChannelEnd {
    /// Creates a new ChannelEnd from its components.
    pub fn new(
        state: State,
        ordering: Order,
        remote: Counterparty,
        connection_hops: Vec<ConnectionId>,
        version: String,
    ) -> Self {
        Self {
            state,
            ordering,
            remote,
            connection_hops,
            version,
        }
    }

    /// Updates the ChannelEnd to assume a new State 's'.
    pub fn set_state(&mut self, s: State) {
        self.state = s;
    }

    pub fn set_version(&mut self, v: String) {
        self.version = v;
    }

    pub fn set_counterparty_channel_id(&mut self, c: ChannelId) {
        self.remote.channel_id = Some(c);
    }

    /// Returns `true` if this `ChannelEnd` is in state [`State::Open`].
    pub fn is_open(&self) -> bool {
        self.state_matches(State::Open)
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn ordering(&self) -> Order {
        self.ordering
    }

    pub fn counterparty(&self) -> &Counterparty {
        &self.remote
    }

    pub fn connection_hops(&self) -> &[ConnectionId] {
        &self.connection_hops
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Helper function to compare the state of this end with another state.
    pub fn state_matches(&self, other: State) -> bool {
        self.state == other
    }

    /// Helper function to compare the order of this end with another order.
    pub fn order_matches(&self, other: Order) -> bool {
        self.ordering == other
    }
}

impl TryFrom<RawChannel> for ChannelEnd {
    type Error = Error;

    fn try_from(value: RawChannel) -> Result<Self, Self::Error> {
        let state = State::from_i32(value.state)?;
        if state == State::Uninitialized {
            return Err(Kind::UnknownState(value.state).into());
        }

        let ordering = Order::from_i32(value.ordering)?;
        if ordering == Order::None {
            return Err(Kind::UnknownOrderType(value.ordering).into());
        }

        let remote = Counterparty::try_from(
            value
                .counterparty
                .ok_or_else(|| Kind::InvalidCounterparty("missing counterparty".to_string()))?,
        )?;

        let connection_hops = value
            .connection_hops
            .into_iter()
            .map(|conn_id| ConnectionId::from_str(&conn_id))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Kind::IdentifierError.context(e))?;

        Ok(ChannelEnd::new(
            state,
            ordering,
            remote,
            connection_hops,
            value.version,
        ))
    }
}

impl From<ChannelEnd> for RawChannel {
    fn from(value: ChannelEnd) -> Self {
        RawChannel {
            state: value.state as i32,
            ordering: value.ordering as i32,
            counterparty: Some(value.remote.into()),
            connection_hops: value
                .connection_hops
                .iter()
                .map(|v| v.as_str().to_string())
                .collect(),
            version: value.version,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub port_id: PortId,
    pub channel_id: Option<ChannelId>,
}

impl Counterparty {
    pub fn new(port_id: PortId, channel_id: Option<ChannelId>) -> Self {
        Self {
            port_id,
            channel_id,
        }
    }

    pub fn port_id(&self) -> &PortId {
        &self.port_id
    }

    pub fn channel_id(&self) -> Option<&ChannelId> {
        self.channel_id.as_ref()
    }
}

impl TryFrom<RawChannelCounterparty> for Counterparty {
    type Error = Error;

    fn try_from(value: RawChannelCounterparty) -> Result<Self, Self::Error> {
        let channel_id = if value.channel_id.is_empty() {
            None
        } else {
            Some(
                value
                    .channel_id
                    .parse()
                    .map_err(|e| Kind::IdentifierError.context(e))?,
            )
        };

        Ok(Counterparty::new(
            value
                .port_id
                .parse()
                .map_err(|e| Kind::IdentifierError.context(e))?,
            channel_id,
        ))
    }
}

impl From<Counterparty> for RawChannelCounterparty {
    fn from(value: Counterparty) -> Self {
        RawChannelCounterparty {
            port_id: value.port_id.as_str().to_string(),
            channel_id: value
                .channel_id
                .map_or_else(String::new, |v| v.as_str().to_string()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    None = 0,
    Unordered = 1,
    Ordered = 2,
}

impl Order {
    /// Yields the Order as a string, as it appears in connection version features.
    pub fn as_string(&self) -> &'static str {
        match self {
            Self::None => "ORDER_NONE_UNSPECIFIED",
            Self::Unordered => "ORDER_UNORDERED",
            Self::Ordered => "ORDER_ORDERED",
        }
    }

    // Parses the Order out from a i32.
    pub fn from_i32(nr: i32) -> Result<Self, Error> {
        match nr {
            0 => Ok(Self::None),
            1 => Ok(Self::Unordered),
            2 => Ok(Self::Ordered),
            _ => Err(Kind::UnknownOrderType(nr).into()),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Uninitialized = 0,
    Init = 1,
    TryOpen = 2,
    Open = 3,
    Closed = 4,
}

impl State {
    /// Yields the state as a string
    pub fn as_string(&self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Init => "INIT",
            Self::TryOpen => "TRYOPEN",
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }

    // Parses the State out from a i32.
    pub fn from_i32(s: i32) -> Result<Self, Error> {
        match s {
            0 => Ok(Self::Uninitialized),
            1 => Ok(Self::Init),
            2 => Ok(Self::TryOpen),
            3 => Ok(Self::Open),
            4 => Ok(Self::Closed),
            _ => Err(Kind::UnknownState(s).into()),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::{ChannelEnd, Counterparty, Order, State};
    use crate::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
    use crate::proto::RawChannel;

    #[test]
    fn channel_end_try_from_raw() {
        struct Test {
            name: String,
            raw: RawChannel,
            want_pass: bool,
        }

        let end = ChannelEnd::new(
            State::Open,
            Order::Ordered,
            Counterparty::new(PortId::transfer(), Some(ChannelId::new(4))),
            vec![ConnectionId::new(0)],
            "ics20-1".to_string(),
        );
        let raw = RawChannel::from(end.clone());
        assert_eq!(ChannelEnd::try_from(raw.clone()).unwrap(), end);

        let tests = vec![
            Test {
                name: "Unspecified ordering".to_string(),
                raw: RawChannel {
                    ordering: 0,
                    ..raw.clone()
                },
                want_pass: false,
            },
            Test {
                name: "Unknown state".to_string(),
                raw: RawChannel {
                    state: 7,
                    ..raw.clone()
                },
                want_pass: false,
            },
            Test {
                name: "Bad connection hop".to_string(),
                raw: RawChannel {
                    connection_hops: vec!["connection/0".to_string()],
                    ..raw.clone()
                },
                want_pass: false,
            },
            Test {
                name: "Counterparty channel not chosen yet".to_string(),
                raw: RawChannel {
                    state: State::Init as i32,
                    counterparty: Some(
                        Counterparty::new(PortId::transfer(), None).into(),
                    ),
                    ..raw
                },
                want_pass: true,
            },
        ];

        for test in tests {
            assert_eq!(
                ChannelEnd::try_from(test.raw).is_ok(),
                test.want_pass,
                "ChannelEnd::try_from failed for test {}",
                test.name
            );
        }
    }

    #[test]
    fn order_strings_match_version_features() {
        assert_eq!(Order::Ordered.as_string(), "ORDER_ORDERED");
        assert_eq!(Order::Unordered.as_string(), "ORDER_UNORDERED");
        assert!(Order::from_i32(3).is_err());
    }
}

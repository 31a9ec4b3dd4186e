use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use prost::Message;
use serde_derive::{Deserialize, Serialize};

use crate::ics02_client::client_type::ClientType;
use crate::ics02_client::height::Height;
use crate::ics02_client::status::Status;
use crate::ics07_tendermint::error::{Error, Kind};
use crate::ics07_tendermint::header::Header;
use crate::ics24_host::identifier::ChainId;
use crate::proto::{RawClientState, RawDuration, RawFraction};
use crate::timestamp::Timestamp;

/// The fraction of a validator set's voting power that must have signed a header for it to be
/// trusted. Must lie in `[1/3, 1)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustThreshold {
    numerator: u64,
    denominator: u64,
}

impl TrustThreshold {
    pub const ONE_THIRD: Self = Self {
        numerator: 1,
        denominator: 3,
    };

    pub const TWO_THIRDS: Self = Self {
        numerator: 2,
        denominator: 3,
    };

    pub fn new(numerator: u64, denominator: u64) -> Result<Self, Error> {
        let threshold = Self {
            numerator,
            denominator,
        };

        if denominator == 0 {
            return Err(Kind::InvalidTrustThreshold(format!("{}: zero denominator", threshold)).into());
        }
        // 1/3 <= n/d < 1
        if u128::from(numerator) * 3 < u128::from(denominator) || numerator >= denominator {
            return Err(Kind::InvalidTrustThreshold(format!("{} is outside [1/3, 1)", threshold)).into());
        }

        Ok(threshold)
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// Whether `signed` is strictly more than this fraction of `total`.
    pub fn is_exceeded(&self, signed: u64, total: u64) -> bool {
        u128::from(signed) * u128::from(self.denominator)
            > u128::from(total) * u128::from(self.numerator)
    }
}

impl Default for TrustThreshold {
    fn default() -> Self {
        Self::ONE_THIRD
    }
}

impl fmt::Display for TrustThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    pub chain_id: ChainId,
    pub trust_level: TrustThreshold,
    pub trusting_period: Duration,
    pub unbonding_period: Duration,
    pub max_clock_drift: Duration,
    pub latest_height: Height,
    pub frozen_height: Option<Height>,
}

impl ClientState {
    pub fn new(
        chain_id: ChainId,
        trust_level: TrustThreshold,
        trusting_period: Duration,
        unbonding_period: Duration,
        max_clock_drift: Duration,
        latest_height: Height,
    ) -> Result<ClientState, Error> {
        // Re-validate in case the threshold was deserialized rather than constructed.
        TrustThreshold::new(trust_level.numerator, trust_level.denominator)?;

        if trusting_period == Duration::from_secs(0) {
            return Err(Kind::InvalidTrustingPeriod("must be greater than zero".to_string()).into());
        }
        if unbonding_period == Duration::from_secs(0) {
            return Err(Kind::InvalidUnbondingPeriod("must be greater than zero".to_string()).into());
        }
        if trusting_period >= unbonding_period {
            return Err(Kind::InvalidTrustingPeriod(format!(
                "trusting period {:?} must be smaller than unbonding period {:?}",
                trusting_period, unbonding_period
            ))
            .into());
        }
        if max_clock_drift == Duration::from_secs(0) {
            return Err(Kind::InvalidMaxClockDrift.into());
        }
        if latest_height.is_zero() {
            return Err(Kind::InvalidLatestHeight(latest_height).into());
        }

        Ok(Self {
            chain_id,
            trust_level,
            trusting_period,
            unbonding_period,
            max_clock_drift,
            latest_height,
            frozen_height: None,
        })
    }

    pub fn client_type(&self) -> ClientType {
        ClientType::Tendermint
    }

    pub fn latest_height(&self) -> Height {
        self.latest_height
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_height.is_some()
    }

    /// Freezes the client at `height`. A client that is already frozen keeps its original
    /// freeze height.
    pub fn with_frozen_height(self, height: Height) -> Self {
        Self {
            frozen_height: Some(self.frozen_height.unwrap_or(height)),
            ..self
        }
    }

    /// Advances the latest height to the header's, never backwards.
    pub fn with_header(self, header: &Header) -> Self {
        Self {
            latest_height: self.latest_height.max(header.height()),
            ..self
        }
    }

    /// Whether the consensus state produced at `consensus_time` is outside the trusting
    /// period as seen at `now`.
    pub fn expired(&self, consensus_time: Timestamp, now: Timestamp) -> bool {
        match now.duration_since(&consensus_time) {
            Some(elapsed) => elapsed > self.trusting_period,
            None => false,
        }
    }

    /// Status of the client given the timestamp of its latest consensus state.
    pub fn status(&self, latest_consensus_time: Timestamp, now: Timestamp) -> Status {
        if self.is_frozen() {
            Status::Frozen
        } else if self.expired(latest_consensus_time, now) {
            Status::Expired
        } else {
            Status::Active
        }
    }
}

fn duration_from_raw(raw: Option<RawDuration>, field: &str) -> Result<Duration, Error> {
    let raw = raw.ok_or_else(|| Kind::InvalidRawClientState(format!("missing {}", field)))?;
    Ok(Duration::new(raw.seconds, raw.nanos))
}

fn duration_to_raw(duration: Duration) -> Option<RawDuration> {
    Some(RawDuration {
        seconds: duration.as_secs(),
        nanos: duration.subsec_nanos(),
    })
}

impl TryFrom<RawClientState> for ClientState {
    type Error = Error;

    fn try_from(raw: RawClientState) -> Result<Self, Self::Error> {
        let chain_id = ChainId::from_str(&raw.chain_id)
            .map_err(|e| Kind::InvalidRawClientState("chain id".to_string()).context(e))?;
        let trust_level = raw
            .trust_level
            .ok_or_else(|| Kind::InvalidRawClientState("missing trust level".to_string()))?;
        let latest_height = raw
            .latest_height
            .ok_or_else(|| Kind::InvalidRawClientState("missing latest height".to_string()))?
            .into();

        Ok(Self {
            chain_id,
            trust_level: TrustThreshold::new(trust_level.numerator, trust_level.denominator)?,
            trusting_period: duration_from_raw(raw.trusting_period, "trusting period")?,
            unbonding_period: duration_from_raw(raw.unbonding_period, "unbonding period")?,
            max_clock_drift: duration_from_raw(raw.max_clock_drift, "max clock drift")?,
            latest_height,
            frozen_height: raw.frozen_height.map(Into::into),
        })
    }
}

impl From<ClientState> for RawClientState {
    fn from(value: ClientState) -> Self {
        RawClientState {
            chain_id: value.chain_id.to_string(),
            trust_level: Some(RawFraction {
                numerator: value.trust_level.numerator,
                denominator: value.trust_level.denominator,
            }),
            trusting_period: duration_to_raw(value.trusting_period),
            unbonding_period: duration_to_raw(value.unbonding_period),
            max_clock_drift: duration_to_raw(value.max_clock_drift),
            frozen_height: value.frozen_height.map(Into::into),
            latest_height: Some(value.latest_height.into()),
        }
    }
}

impl TryFrom<&[u8]> for ClientState {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let raw = RawClientState::decode(bytes)
            .map_err(|e| Kind::InvalidRawClientState("decode".to_string()).context(e))?;
        raw.try_into()
    }
}

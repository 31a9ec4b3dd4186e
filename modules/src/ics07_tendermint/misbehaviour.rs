use std::convert::{TryFrom, TryInto};
use std::str::FromStr;

use crate::ics07_tendermint::error::{Error, Kind};
use crate::ics07_tendermint::header::Header;
use crate::ics24_host::identifier::ClientId;
use crate::proto::RawMisbehaviour;

/// Evidence of two conflicting headers at the same height, each signed by a validator set the
/// client trusts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Misbehaviour {
    pub client_id: ClientId,
    pub header1: Header,
    pub header2: Header,
}

impl TryFrom<RawMisbehaviour> for Misbehaviour {
    type Error = Error;

    fn try_from(raw: RawMisbehaviour) -> Result<Self, Self::Error> {
        Ok(Self {
            client_id: ClientId::from_str(&raw.client_id)
                .map_err(|e| Kind::InvalidRawMisbehaviour("client id".to_string()).context(e))?,
            header1: raw
                .header_1
                .ok_or_else(|| Kind::InvalidRawMisbehaviour("missing header 1".to_string()))?
                .try_into()?,
            header2: raw
                .header_2
                .ok_or_else(|| Kind::InvalidRawMisbehaviour("missing header 2".to_string()))?
                .try_into()?,
        })
    }
}

impl From<Misbehaviour> for RawMisbehaviour {
    fn from(value: Misbehaviour) -> Self {
        RawMisbehaviour {
            client_id: value.client_id.to_string(),
            header_1: Some(value.header1.into()),
            header_2: Some(value.header2.into()),
        }
    }
}

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::ics02_client::error::{Error, Kind};
use crate::proto::RawHeight;

/// A height on a chain, split into the revision (chain upgrade epoch) and the block height
/// within that revision. Heights order lexicographically on `(revision_number, revision_height)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Height {
    pub revision_number: u64,
    pub revision_height: u64,
}

impl Height {
    pub fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.revision_height == 0
    }

    pub fn add(&self, delta: u64) -> Height {
        Height {
            revision_number: self.revision_number,
            revision_height: self.revision_height.saturating_add(delta),
        }
    }

    pub fn increment(&self) -> Height {
        self.add(1)
    }

    pub fn sub(&self, delta: u64) -> Result<Height, Error> {
        if self.revision_height <= delta {
            return Err(Kind::InvalidHeightResult
                .context(format!("{} - {}", self, delta))
                .into());
        }

        Ok(Height {
            revision_number: self.revision_number,
            revision_height: self.revision_height - delta,
        })
    }

    pub fn decrement(&self) -> Result<Height, Error> {
        self.sub(1)
    }
}

impl PartialOrd for Height {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Height {
    fn cmp(&self, other: &Self) -> Ordering {
        self.revision_number
            .cmp(&other.revision_number)
            .then(self.revision_height.cmp(&other.revision_height))
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

impl FromStr for Height {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut split = s.splitn(2, '-');
        let parse = |part: Option<&str>| -> Result<u64, Error> {
            part.ok_or_else(|| Kind::InvalidHeight.context(s.to_string()))?
                .parse::<u64>()
                .map_err(|e| Kind::InvalidHeight.context(e).into())
        };

        let revision_number = parse(split.next())?;
        let revision_height = parse(split.next())?;

        Ok(Height::new(revision_number, revision_height))
    }
}

impl From<RawHeight> for Height {
    fn from(raw: RawHeight) -> Self {
        Height::new(raw.revision_number, raw.revision_height)
    }
}

impl From<Height> for RawHeight {
    fn from(height: Height) -> Self {
        RawHeight {
            revision_number: height.revision_number,
            revision_height: height.revision_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::Height;

    #[test]
    fn height_ordering_and_parsing() {
        assert!(Height::new(0, 10) < Height::new(1, 1));
        assert!(Height::new(1, 9) < Height::new(1, 10));
        assert_eq!(Height::new(2, 5).increment(), Height::new(2, 6));
        assert!(Height::new(0, 1).decrement().is_err());

        assert_eq!(Height::from_str("1-17").unwrap(), Height::new(1, 17));
        assert!(Height::from_str("17").is_err());
        assert!(Height::from_str("a-1").is_err());
        assert_eq!(Height::new(4, 2).to_string(), "4-2");
    }
}

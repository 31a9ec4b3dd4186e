use std::convert::TryFrom;
use std::fmt;

use serde_derive::{Deserialize, Serialize};

use crate::ics03_connection::error::{Error, Kind};
use crate::proto::RawVersion;

/// A connection version: an identifier plus the channel orderings it allows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    identifier: String,
    features: Vec<String>,
}

impl Version {
    pub fn new(identifier: String, features: Vec<String>) -> Result<Self, Error> {
        if identifier.trim().is_empty() {
            return Err(Kind::InvalidVersion
                .context("empty version identifier")
                .into());
        }
        if features.is_empty() {
            return Err(Kind::InvalidVersion
                .context(format!("version {} has no features", identifier))
                .into());
        }

        Ok(Self {
            identifier,
            features,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Checks whether or not the given feature is supported in this version.
    pub fn is_supported_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// The features of `self` that `other` also has, keeping the order of `self`. `None` if
    /// the identifiers differ or nothing is shared.
    fn intersect(&self, other: &Version) -> Option<Version> {
        if self.identifier != other.identifier {
            return None;
        }

        let features: Vec<String> = self
            .features
            .iter()
            .filter(|f| other.is_supported_feature(f))
            .cloned()
            .collect();
        if features.is_empty() {
            return None;
        }

        Some(Version {
            identifier: self.identifier.clone(),
            features,
        })
    }
}

impl Default for Version {
    fn default() -> Self {
        Version {
            identifier: "1".to_string(),
            features: vec!["ORDER_ORDERED".to_string(), "ORDER_UNORDERED".to_string()],
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.identifier, self.features.join(","))
    }
}

impl TryFrom<RawVersion> for Version {
    type Error = Error;

    fn try_from(value: RawVersion) -> Result<Self, Self::Error> {
        Version::new(value.identifier, value.features)
    }
}

impl From<Version> for RawVersion {
    fn from(value: Version) -> Self {
        Self {
            identifier: value.identifier,
            features: value.features,
        }
    }
}

/// Returns the lists of supported versions
pub fn get_compatible_versions() -> Vec<Version> {
    vec![Version::default()]
}

/// Selects a version from the intersection of locally supported and counterparty versions.
/// Local preference order wins; the picked version carries only the shared features.
pub fn pick_version(
    supported_versions: &[Version],
    counterparty_versions: &[Version],
) -> Result<Version, Error> {
    if counterparty_versions.is_empty() {
        return Err(Kind::EmptyVersions.into());
    }

    supported_versions
        .iter()
        .flat_map(|s| counterparty_versions.iter().map(move |c| (s, c)))
        .find_map(|(s, c)| s.intersect(c))
        .ok_or_else(|| Kind::NoCommonVersion.into())
}

/// Whether `proposed`, as chosen by the counterparty, is one the local end offered: same
/// identifier and a non-empty subset of the offered features.
pub fn is_compatible(offered: &[Version], proposed: &Version) -> bool {
    offered.iter().any(|v| {
        v.identifier == proposed.identifier
            && proposed.features.iter().all(|f| v.is_supported_feature(f))
    })
}

#[cfg(test)]
mod tests {
    use super::{get_compatible_versions, is_compatible, pick_version, Version};
    use crate::ics03_connection::error::Kind;

    fn version(id: &str, features: &[&str]) -> Version {
        Version::new(
            id.to_string(),
            features.iter().map(|f| f.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn pick_version_cases() {
        struct Test {
            name: String,
            supported: Vec<Version>,
            counterparty: Vec<Version>,
            picked: Result<Version, Kind>,
        }

        let tests = vec![
            Test {
                name: "Compatible default versions".to_string(),
                supported: get_compatible_versions(),
                counterparty: get_compatible_versions(),
                picked: Ok(Version::default()),
            },
            Test {
                name: "Feature intersection keeps the local order".to_string(),
                supported: vec![version("1", &["ORDER_ORDERED", "ORDER_UNORDERED"])],
                counterparty: vec![version("1", &["ORDER_UNORDERED", "ORDER_DAG"])],
                picked: Ok(version("1", &["ORDER_UNORDERED"])),
            },
            Test {
                name: "Local preference wins".to_string(),
                supported: vec![version("2", &["ORDER_ORDERED"]), Version::default()],
                counterparty: vec![Version::default(), version("2", &["ORDER_ORDERED"])],
                picked: Ok(version("2", &["ORDER_ORDERED"])),
            },
            Test {
                name: "Disjoint identifiers".to_string(),
                supported: get_compatible_versions(),
                counterparty: vec![version("2", &["ORDER_ORDERED"])],
                picked: Err(Kind::NoCommonVersion),
            },
            Test {
                name: "Disjoint features".to_string(),
                supported: vec![version("1", &["ORDER_ORDERED"])],
                counterparty: vec![version("1", &["ORDER_UNORDERED"])],
                picked: Err(Kind::NoCommonVersion),
            },
            Test {
                name: "Empty counterparty versions".to_string(),
                supported: get_compatible_versions(),
                counterparty: vec![],
                picked: Err(Kind::EmptyVersions),
            },
        ];

        for test in tests {
            let picked = pick_version(&test.supported, &test.counterparty);
            assert_eq!(
                picked.map_err(|e| e.kind().clone()),
                test.picked,
                "pick_version: {}",
                test.name
            );
        }
    }

    #[test]
    fn compatibility_and_validation() {
        let offered = get_compatible_versions();
        assert!(is_compatible(&offered, &version("1", &["ORDER_UNORDERED"])));
        assert!(!is_compatible(&offered, &version("1", &["ORDER_DAG"])));
        assert!(!is_compatible(&offered, &version("2", &["ORDER_ORDERED"])));

        assert!(Version::new("".to_string(), vec!["ORDER_ORDERED".to_string()]).is_err());
        assert!(Version::new("1".to_string(), vec![]).is_err());
        assert!(Version::default().is_supported_feature("ORDER_ORDERED"));
    }
}

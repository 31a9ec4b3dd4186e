//! Relayer configuration

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use ibc::ics04_channel::channel::Order;
use ibc::ics07_tendermint::client_state::TrustThreshold;
use ibc::ics23_commitment::commitment::CommitmentPrefix;
use ibc::ics24_host::identifier::{ChainId, ChannelId, PortId};

use crate::error::{Error, Kind};

/// Defaults for various fields
pub mod default {
    use super::*;

    pub fn log_level() -> String {
        "info".to_string()
    }

    pub fn max_retries() -> u32 {
        5
    }

    pub fn initial_backoff() -> Duration {
        Duration::from_millis(200)
    }

    pub fn max_backoff() -> Duration {
        Duration::from_secs(5)
    }

    pub fn poll_interval() -> Duration {
        Duration::from_secs(1)
    }

    pub fn event_batch_size() -> usize {
        64
    }

    pub fn commitment_prefix() -> String {
        "ibc".to_string()
    }

    pub fn trusting_period() -> Duration {
        Duration::from_secs(14 * 24 * 3600)
    }

    pub fn unbonding_period() -> Duration {
        Duration::from_secs(21 * 24 * 3600)
    }

    pub fn clock_drift() -> Duration {
        Duration::from_secs(5)
    }

    pub fn trust_threshold() -> TrustThreshold {
        TrustThreshold::ONE_THIRD
    }

    pub fn ordering() -> Order {
        Order::Unordered
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub paths: Vec<PathConfig>,
}

impl Config {
    pub fn find_chain(&self, id: &ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.id == *id)
    }

    /// Checks what deserialization alone cannot: chain ids are unique, every path joins two
    /// distinct configured chains, and the light client and retry parameters are usable.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(&chain.id) {
                return Err(Kind::Config
                    .context(format!("chain {} is configured twice", chain.id))
                    .into());
            }
            chain.validate()?;
        }

        for path in &self.paths {
            for id in &[&path.a_chain, &path.b_chain] {
                if self.find_chain(id).is_none() {
                    return Err(Kind::UnknownChain((*id).clone()).into());
                }
            }
            if path.a_chain == path.b_chain {
                return Err(Kind::Config
                    .context(format!("path joins chain {} to itself", path.a_chain))
                    .into());
            }
            if path.ordering == Order::None {
                return Err(Kind::Config
                    .context("path ordering must be Ordered or Unordered")
                    .into());
            }
        }

        if self.relay.initial_backoff > self.relay.max_backoff {
            return Err(Kind::Config
                .context("initial_backoff is larger than max_backoff")
                .into());
        }
        if self.relay.event_batch_size == 0 {
            return Err(Kind::Config.context("event_batch_size must be positive").into());
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// A tracing filter directive, e.g. `info` or `relayer=debug,ibc=info`.
    #[serde(default = "default::log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default::log_level(),
            log_json: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Attempts made for one message before a transient failure becomes fatal.
    #[serde(default = "default::max_retries")]
    pub max_retries: u32,
    #[serde(default = "default::initial_backoff", with = "humantime_serde")]
    pub initial_backoff: Duration,
    #[serde(default = "default::max_backoff", with = "humantime_serde")]
    pub max_backoff: Duration,
    /// How often each chain is polled for new events.
    #[serde(default = "default::poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Upper bound on the events handed to a worker in one batch.
    #[serde(default = "default::event_batch_size")]
    pub event_batch_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_retries: default::max_retries(),
            initial_backoff: default::initial_backoff(),
            max_backoff: default::max_backoff(),
            poll_interval: default::poll_interval(),
            event_batch_size: default::event_batch_size(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    #[serde(with = "string_repr")]
    pub id: ChainId,
    #[serde(default = "default::commitment_prefix")]
    pub commitment_prefix: String,
    /// How long a header stays trusted by the clients created for this chain.
    #[serde(default = "default::trusting_period", with = "humantime_serde")]
    pub trusting_period: Duration,
    #[serde(default = "default::unbonding_period", with = "humantime_serde")]
    pub unbonding_period: Duration,
    #[serde(default = "default::clock_drift", with = "humantime_serde")]
    pub clock_drift: Duration,
    #[serde(default = "default::trust_threshold")]
    pub trust_threshold: TrustThreshold,
}

impl ChainConfig {
    pub fn new(id: ChainId) -> Self {
        Self {
            id,
            commitment_prefix: default::commitment_prefix(),
            trusting_period: default::trusting_period(),
            unbonding_period: default::unbonding_period(),
            clock_drift: default::clock_drift(),
            trust_threshold: default::trust_threshold(),
        }
    }

    pub fn prefix(&self) -> CommitmentPrefix {
        CommitmentPrefix::from(self.commitment_prefix.as_bytes().to_vec())
    }

    fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: String| -> Error {
            Kind::Config
                .context(format!("chain {}: {}", self.id, reason))
                .into()
        };

        if self.commitment_prefix.is_empty() {
            return Err(invalid("empty commitment prefix".to_string()));
        }
        TrustThreshold::new(
            self.trust_threshold.numerator(),
            self.trust_threshold.denominator(),
        )
        .map_err(|e| invalid(e.to_string()))?;
        if self.trusting_period >= self.unbonding_period {
            return Err(invalid(
                "trusting period must be shorter than the unbonding period".to_string(),
            ));
        }
        if self.clock_drift == Duration::from_secs(0) {
            return Err(invalid("clock drift must be positive".to_string()));
        }
        Ok(())
    }
}

/// A channel to relay on: the port and channel identifiers of each end.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PathConfig {
    #[serde(with = "string_repr")]
    pub a_chain: ChainId,
    #[serde(with = "string_repr")]
    pub b_chain: ChainId,
    #[serde(with = "string_repr")]
    pub a_port: PortId,
    #[serde(with = "string_repr")]
    pub a_channel: ChannelId,
    #[serde(with = "string_repr")]
    pub b_port: PortId,
    #[serde(with = "string_repr")]
    pub b_channel: ChannelId,
    #[serde(default = "default::ordering")]
    pub ordering: Order,
}

/// Identifiers are written as their string form and validated when read.
mod string_repr {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Parse and validate the configuration at the given path.
pub fn parse(path: impl AsRef<Path>) -> Result<Config, Error> {
    let config_toml = fs::read_to_string(&path).map_err(|e| Kind::Io.context(e))?;

    let config = toml::from_str::<Config>(&config_toml).map_err(|e| Kind::Config.context(e))?;
    config.validate()?;

    Ok(config)
}

/// Serialize the given `Config` as TOML to the given config file.
pub fn store(config: &Config, path: impl AsRef<Path>) -> Result<(), Error> {
    let file = File::create(path).map_err(|e| Kind::Io.context(e))?;
    store_writer(config, file)
}

/// Serialize the given `Config` as TOML to the given writer.
pub fn store_writer(config: &Config, mut writer: impl Write) -> Result<(), Error> {
    let toml_config = toml::to_string_pretty(config).map_err(|e| Kind::Config.context(e))?;

    writeln!(writer, "{}", toml_config).map_err(|e| Kind::Io.context(e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ibc::ics04_channel::channel::Order;
    use ibc::ics24_host::identifier::{ChainId, ChannelId, PortId};

    use super::{parse, store_writer, Config};
    use crate::error::Kind;

    const EXAMPLE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/relayer_conf_example.toml"
    );

    #[test]
    fn parse_valid_config() {
        let config = parse(EXAMPLE).expect("could not parse config");

        assert_eq!(config.global.log_level, "debug");
        assert_eq!(config.relay.max_retries, 4);
        assert_eq!(config.relay.initial_backoff, Duration::from_millis(100));
        assert_eq!(config.relay.poll_interval, Duration::from_millis(500));
        // Not set in the file.
        assert_eq!(config.relay.event_batch_size, 64);

        assert_eq!(config.chains.len(), 2);
        let chain_a = ChainId::new("chain-a".to_string(), 0);
        let a = config.find_chain(&chain_a).unwrap();
        assert_eq!(a.trusting_period, Duration::from_secs(14 * 24 * 3600));
        assert_eq!(a.commitment_prefix, "ibc");

        let path = &config.paths[0];
        assert_eq!(path.a_port, PortId::transfer());
        assert_eq!(path.b_channel, ChannelId::new(0));
        assert_eq!(path.ordering, Order::Ordered);
    }

    #[test]
    fn serialize_round_trips() {
        let config = parse(EXAMPLE).unwrap();

        let mut buffer = Vec::new();
        store_writer(&config, &mut buffer).unwrap();
        let reparsed: Config = toml::from_str(std::str::from_utf8(&buffer).unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        struct Test {
            name: &'static str,
            toml: &'static str,
        }

        let tests = vec![
            Test {
                name: "path to an unknown chain",
                toml: r#"
                    [[chains]]
                    id = "chain-a-0"

                    [[paths]]
                    a_chain = "chain-a-0"
                    b_chain = "chain-b-0"
                    a_port = "transfer"
                    a_channel = "channel-0"
                    b_port = "transfer"
                    b_channel = "channel-0"
                "#,
            },
            Test {
                name: "trusting period outlives unbonding",
                toml: r#"
                    [[chains]]
                    id = "chain-a-0"
                    trusting_period = "30days"
                "#,
            },
            Test {
                name: "trust threshold below one third",
                toml: r#"
                    [[chains]]
                    id = "chain-a-0"
                    trust_threshold = { numerator = 1, denominator = 4 }
                "#,
            },
            Test {
                name: "duplicate chain",
                toml: r#"
                    [[chains]]
                    id = "chain-a-0"

                    [[chains]]
                    id = "chain-a-0"
                "#,
            },
            Test {
                name: "backoff bounds inverted",
                toml: r#"
                    [relay]
                    initial_backoff = "10s"
                    max_backoff = "1s"
                "#,
            },
        ];

        for test in tests {
            let config: Config = toml::from_str(test.toml).unwrap();
            let err = config
                .validate()
                .expect_err(&format!("config was accepted: {}", test.name));
            assert!(
                matches!(err.kind(), Kind::Config | Kind::UnknownChain(_)),
                "unexpected error for {}: {}",
                test.name,
                err
            );
        }
    }

    #[test]
    fn malformed_identifiers_fail_to_parse() {
        let res = toml::from_str::<Config>(
            r#"
                [[chains]]
                id = "not a chain id"
            "#,
        );
        assert!(res.is_err());
    }
}

//! Process-wide components: the `tracing` subscriber.

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::GlobalConfig;
use crate::error::{Error, Kind};

/// Installs the global `tracing` subscriber. `level` is an `EnvFilter` directive such as
/// `info` or `relayer=debug,ibc=info`; `json` switches to one JSON object per line.
pub fn init_tracing(level: &str, json: bool) -> Result<(), Error> {
    let filter = EnvFilter::try_new(level).map_err(|e| Kind::Config.context(e))?;

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(false);

    if json {
        builder
            .json()
            .finish()
            .try_init()
            .map_err(|e| Kind::Tracing.context(e))?;
    } else {
        builder
            .finish()
            .try_init()
            .map_err(|e| Kind::Tracing.context(e))?;
    }

    Ok(())
}

/// Installs the subscriber described by the `[global]` section.
pub fn init_from_config(config: &GlobalConfig) -> Result<(), Error> {
    init_tracing(&config.log_level, config.log_json)
}

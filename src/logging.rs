//! Logging setup shared by the binaries.
//!
//! Log output goes through `tracing-subscriber`. The configured level applies
//! to this crate's targets while everything else logs warnings and above.
//! A valid `RUST_LOG` replaces the configured filter entirely.

use tracing_subscriber::{
    filter::{Directive, EnvFilter, LevelFilter},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Registry,
};

use crate::config::{LogLevel, LoggingConfig};
use crate::error::{MirrorError, MirrorResult};

/// Command line flags controlling log output.
#[derive(clap::Args, Debug, Clone, Default)]
#[group()]
pub struct LoggingArgs {
    /// Enable debug mode.
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    pub json_logging: bool,
}

impl LoggingArgs {
    /// Merge the command line flags into `config`.
    pub fn apply(&self, config: &mut LoggingConfig) {
        config.debug |= self.debug;
        config.json |= self.json_logging;
    }
}

fn configured_filter(config: &LoggingConfig) -> MirrorResult<EnvFilter> {
    let level = if config.debug {
        LogLevel::Trace
    } else {
        config.log_level
    };

    let mut filter = EnvFilter::default().add_directive(LevelFilter::WARN.into());
    for target in ["archportal", "archportal_site"] {
        let directive = format!("{}={}", target, level.as_str())
            .parse::<Directive>()
            .map_err(|e| MirrorError::Configuration(format!("Invalid log directive: {}", e)))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

fn filter(config: &LoggingConfig, env_var: &str) -> MirrorResult<EnvFilter> {
    match EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(env_var)
        .try_from_env()
    {
        Ok(filter) => Ok(filter),
        Err(_) => configured_filter(config),
    }
}

/// Initialize logging based on configuration.
pub fn init_logging(config: &LoggingConfig) -> MirrorResult<()> {
    let filter = filter(config, EnvFilter::DEFAULT_ENV)?;
    let registry = Registry::default().with(filter);

    let result = if config.json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(config.debug)
                    .with_line_number(config.debug),
            )
            .try_init()
    };

    result.map_err(|e| MirrorError::Configuration(format!("Failed to initialize logging: {}", e)))
}

//! ## Init Module
//!
//! Command-line parsing and assembly of the runtime settings the main process wires the
//! tasks up with.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::config;
use crate::dispatcher::{CompletionPolicy, DispatchPolicy};

/// Runtime settings for one adapter process.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Number of floors the simulated building has.
    pub num_floors: u8,
    /// Interval between dispatch ticks.
    pub dispatch_tick: Duration,
    /// Dispatch tunables handed to the dispatcher.
    pub policy: DispatchPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            num_floors: config::DEFAULT_NUM_FLOORS,
            dispatch_tick: config::DISPATCH_TICK,
            policy: DispatchPolicy::default(),
        }
    }
}

/// Parses the process arguments into [`Settings`].
///
/// Recognized arguments:
/// - `--floors=N`: number of floors in the simulated building (2..=255).
/// - `--tick-ms=N`: dispatch tick interval in milliseconds.
/// - `--unsafe-optimistic-completion`: complete requests on destination publish without
///   waiting for state confirmation. Unsafe, see [`CompletionPolicy::Optimistic`].
/// - `--json`: additionally print machine-readable JSON status lines.
///
/// # Returns
/// The assembled [`Settings`], or an error describing the offending argument.
pub fn parse_args() -> Result<Settings> {
    parse_arg_list(env::args().skip(1))
}

fn parse_arg_list(args: impl Iterator<Item = String>) -> Result<Settings> {
    let mut settings = Settings::default();

    for arg in args {
        if let Some(value) = arg.strip_prefix("--floors=") {
            let floors: u8 = value
                .parse()
                .with_context(|| format!("bad --floors value: {:?}", value))?;
            if floors < 2 {
                bail!("--floors must be at least 2, got {}", floors);
            }
            settings.num_floors = floors;
        } else if let Some(value) = arg.strip_prefix("--tick-ms=") {
            let ms: u64 = value
                .parse()
                .with_context(|| format!("bad --tick-ms value: {:?}", value))?;
            if ms == 0 {
                bail!("--tick-ms must be positive");
            }
            settings.dispatch_tick = Duration::from_millis(ms);
        } else if arg == "--unsafe-optimistic-completion" {
            settings.policy.completion = CompletionPolicy::Optimistic;
        } else if arg == "--json" {
            *config::PRINT_JSON_ON.lock().unwrap() = true;
        } else {
            bail!("unknown argument: {:?}", arg);
        }
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Settings> {
        parse_arg_list(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_without_arguments() {
        let settings = parse(&[]).unwrap();
        assert_eq!(settings.num_floors, config::DEFAULT_NUM_FLOORS);
        assert_eq!(settings.dispatch_tick, config::DISPATCH_TICK);
        assert_eq!(settings.policy.completion, CompletionPolicy::Confirmed);
    }

    #[test]
    fn parses_overrides() {
        let settings =
            parse(&["--floors=8", "--tick-ms=50", "--unsafe-optimistic-completion"]).unwrap();
        assert_eq!(settings.num_floors, 8);
        assert_eq!(settings.dispatch_tick, Duration::from_millis(50));
        assert_eq!(settings.policy.completion, CompletionPolicy::Optimistic);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse(&["--floors=one"]).is_err());
        assert!(parse(&["--floors=1"]).is_err());
        assert!(parse(&["--tick-ms=0"]).is_err());
        assert!(parse(&["--warp-speed"]).is_err());
    }
}

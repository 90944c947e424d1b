//! Bus configuration.
//!
//! Defaults are chosen per bus kind; `from_env` lets deployments override
//! them without recompiling:
//!
//! | Variable | Values | Effect |
//! |---|---|---|
//! | `KEEL_DEAD_LETTER_POLICY` | `reject`, `drop` | what happens to messages nobody handles |
//! | `KEEL_REJECT_EMPTY` | `true`, `false` | whether batch posts filter out empty messages |

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEAD_LETTER_POLICY_VAR: &str = "KEEL_DEAD_LETTER_POLICY";
pub const REJECT_EMPTY_VAR: &str = "KEEL_REJECT_EMPTY";

/// What a bus does with a message no dispatcher is registered for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterPolicy {
    /// Acknowledge with `BusError::NoDispatcherFound`; the batch does not complete.
    Reject,
    /// Log and acknowledge with `on_next` as if handled.
    Drop,
}

impl FromStr for DeadLetterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "drop" => Ok(Self::Drop),
            other => Err(format!("unknown dead letter policy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub dead_letter: DeadLetterPolicy,
    pub reject_empty: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::for_commands()
    }
}

impl BusConfig {
    /// Commands must be handled: unhandled ones are rejected.
    pub fn for_commands() -> Self {
        Self {
            dead_letter: DeadLetterPolicy::Reject,
            reject_empty: true,
        }
    }

    /// Events may legitimately have no subscribers: unhandled ones are dropped.
    pub fn for_events() -> Self {
        Self {
            dead_letter: DeadLetterPolicy::Drop,
            reject_empty: true,
        }
    }

    /// Apply overrides from the process environment on top of `defaults`.
    pub fn from_env(defaults: Self) -> Self {
        Self::from_lookup(defaults, |key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup on top of `defaults`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_lookup(defaults: Self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = defaults;

        if let Some(raw) = lookup(DEAD_LETTER_POLICY_VAR) {
            match raw.parse() {
                Ok(policy) => config.dead_letter = policy,
                Err(e) => warn!(var = DEAD_LETTER_POLICY_VAR, error = %e, "ignoring override"),
            }
        }

        if let Some(raw) = lookup(REJECT_EMPTY_VAR) {
            match raw.trim().parse::<bool>() {
                Ok(flag) => config.reject_empty = flag,
                Err(e) => warn!(var = REJECT_EMPTY_VAR, error = %e, "ignoring override"),
            }
        }

        config
    }
}

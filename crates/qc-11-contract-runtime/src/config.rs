//! # Runtime Configuration
//!
//! Resource budgets and limits. Time coefficients and stack sizes are
//! calibration constants, not semantic ones.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Default CPU time per gas unit (nanoseconds).
pub const DEFAULT_TIME_COEFFICIENT_NS: u64 = 300_000;

/// CPU time per gas unit for an invocation flagged to time out (nanoseconds).
pub const FLAGGED_TIME_COEFFICIENT_NS: u64 = 1_500;

/// Default stack budget per invocation (1 MiB).
pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

/// Stack budget for an invocation flagged to exhaust its stack (16 KiB).
pub const FLAGGED_STACK_SIZE: usize = 16 * 1024;

/// Maximum nesting depth, independent of real stack usage.
pub const MAX_CALL_DEPTH: u32 = 64;

/// Response buffer capacity (64 KiB).
pub const RESPONSE_CAPACITY: usize = 64 * 1024;

/// Runtime limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// CPU time granted per gas unit (ns).
    pub default_time_coefficient_ns: u64,
    /// CPU time per gas unit for a flagged invocation (ns).
    pub flagged_time_coefficient_ns: u64,
    /// Stack budget per invocation (bytes).
    pub default_stack_size: usize,
    /// Stack budget for a flagged invocation (bytes).
    pub flagged_stack_size: usize,
    /// Maximum call depth.
    pub max_call_depth: u32,
    /// Response buffer capacity (bytes).
    pub response_capacity: usize,
    /// Re-executions allowed after the first attempt.
    pub max_replay_attempts: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_time_coefficient_ns: DEFAULT_TIME_COEFFICIENT_NS,
            flagged_time_coefficient_ns: FLAGGED_TIME_COEFFICIENT_NS,
            default_stack_size: DEFAULT_STACK_SIZE,
            flagged_stack_size: FLAGGED_STACK_SIZE,
            max_call_depth: MAX_CALL_DEPTH,
            response_capacity: RESPONSE_CAPACITY,
            max_replay_attempts: 2,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `QC_RUNTIME_TIME_COEFFICIENT_NS`
    /// - `QC_RUNTIME_FLAGGED_TIME_COEFFICIENT_NS`
    /// - `QC_RUNTIME_STACK_SIZE`
    /// - `QC_RUNTIME_FLAGGED_STACK_SIZE`
    /// - `QC_RUNTIME_MAX_CALL_DEPTH`
    /// - `QC_RUNTIME_RESPONSE_CAPACITY`
    /// - `QC_RUNTIME_MAX_REPLAYS`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable does not parse or the result fails
    /// [`RuntimeConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            default_time_coefficient_ns: env_or(
                "QC_RUNTIME_TIME_COEFFICIENT_NS",
                defaults.default_time_coefficient_ns,
            )?,
            flagged_time_coefficient_ns: env_or(
                "QC_RUNTIME_FLAGGED_TIME_COEFFICIENT_NS",
                defaults.flagged_time_coefficient_ns,
            )?,
            default_stack_size: env_or("QC_RUNTIME_STACK_SIZE", defaults.default_stack_size)?,
            flagged_stack_size: env_or(
                "QC_RUNTIME_FLAGGED_STACK_SIZE",
                defaults.flagged_stack_size,
            )?,
            max_call_depth: env_or("QC_RUNTIME_MAX_CALL_DEPTH", defaults.max_call_depth)?,
            response_capacity: env_or(
                "QC_RUNTIME_RESPONSE_CAPACITY",
                defaults.response_capacity,
            )?,
            max_replay_attempts: env_or("QC_RUNTIME_MAX_REPLAYS", defaults.max_replay_attempts)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_time_coefficient_ns == 0 {
            return Err(invalid("default_time_coefficient_ns", "must be positive"));
        }
        if self.flagged_time_coefficient_ns >= self.default_time_coefficient_ns {
            return Err(invalid(
                "flagged_time_coefficient_ns",
                "must be below the default coefficient",
            ));
        }
        if self.flagged_stack_size >= self.default_stack_size {
            return Err(invalid(
                "flagged_stack_size",
                "must be below the default stack size",
            ));
        }
        if self.max_call_depth == 0 {
            return Err(invalid("max_call_depth", "must be positive"));
        }
        if self.response_capacity == 0 {
            return Err(invalid("response_capacity", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

pub(crate) fn env_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { var, value }),
        Err(_) => Ok(default),
    }
}

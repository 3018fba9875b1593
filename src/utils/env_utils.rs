use log::debug;
use std::env;

use crate::constants::ENV_PREFIX;

/// Read an environment variable with fallback to a default value
///
/// The `TRADING_` prefixed name wins over the bare name so that a shared
/// environment can carry a client-specific override.
pub fn read_env(key: &str, default: &str) -> String {
    let value = read_env_opt(key).unwrap_or_else(|| default.to_string());
    debug!("Environment variable {} resolved to: {}", key, value);
    value
}

/// Read an environment variable, returning `None` when neither form is set
pub fn read_env_opt(key: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{key}"))
        .or_else(|_| env::var(key))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Read an environment variable with numeric conversion
pub fn read_env_u64(key: &str, default: u64) -> u64 {
    read_env_opt(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

/// Read an environment variable with signed numeric conversion
pub fn read_env_i64(key: &str, default: i64) -> i64 {
    read_env_opt(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variable_uses_default() {
        assert_eq!(
            read_env("TRADING_CLIENT_TEST_SURELY_UNSET", "fallback"),
            "fallback"
        );
        assert_eq!(read_env_u64("TRADING_CLIENT_TEST_SURELY_UNSET", 7), 7);
        assert_eq!(read_env_i64("TRADING_CLIENT_TEST_SURELY_UNSET", -3), -3);
    }
}

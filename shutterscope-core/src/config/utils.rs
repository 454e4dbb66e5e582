//! Configuration utility functions
//!
//! This module provides helper functions for reading `SHUTTERSCOPE_*`
//! environment overrides.

/// Get a boolean value from an environment variable or use the default
pub fn get_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => val.to_lowercase() == "true" || val == "1",
        Err(_) => default,
    }
}

/// Get a f64 value from an environment variable or use the default
pub fn get_env_f64(key: &str, default: f64) -> f64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a u32 value from an environment variable or use the default
pub fn get_env_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a u64 value from an environment variable or use the default
pub fn get_env_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a usize value from an environment variable or use the default
pub fn get_env_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a string value from an environment variable or use the default
pub fn get_env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

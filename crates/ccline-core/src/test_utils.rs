//! Helpers shared by unit tests in this crate
//!
//! Integration tests keep their own copy in tests/common/mod.rs since
//! `#[cfg(test)]` items are not visible to them.

use once_cell::sync::Lazy;
use std::env;

/// Serializes tests that touch process environment variables
pub static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

/// Restores every variable it touched when dropped
#[derive(Default)]
pub struct EnvVarGuard {
    vars: Vec<(String, Option<String>)>,
}

impl EnvVarGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.push((key.to_string(), env::var(key).ok()));
        // set_var is unsafe since edition 2024; callers hold ENV_MUTEX
        unsafe {
            env::set_var(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.vars.push((key.to_string(), env::var(key).ok()));
        unsafe {
            env::remove_var(key);
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.vars.iter().rev() {
            unsafe {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }
}

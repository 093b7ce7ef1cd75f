//! Scoped environment overrides for config and CLI tests.

use std::sync::{Mutex, OnceLock};

/// Process-wide lock that env-mutating tests must hold.
pub fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

#[allow(unused_unsafe)]
fn apply(key: &str, value: Option<&str>) {
    // SAFETY: callers hold `env_lock()` while tests mutate the environment.
    unsafe {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

/// Overrides one environment variable until dropped.
pub struct EnvGuard {
    key: String,
    previous: Option<String>,
}

impl EnvGuard {
    fn replace(key: &str, value: Option<&str>) -> Self {
        let previous = std::env::var(key).ok();
        apply(key, value);
        Self {
            key: key.to_string(),
            previous,
        }
    }

    /// Set `key=value` for the guard's lifetime.
    pub fn set(key: &str, value: &str) -> Self {
        Self::replace(key, Some(value))
    }

    /// Unset `key` for the guard's lifetime.
    pub fn remove(key: &str) -> Self {
        Self::replace(key, None)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        apply(&self.key, self.previous.as_deref());
    }
}

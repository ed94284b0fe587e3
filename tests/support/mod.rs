use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the previous values on unwind and serializes access to the
/// process-global environment so parallel tests cannot observe each
/// other's variables.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ScopedEnv::apply(changes);
    f()
}

struct ScopedEnv<'a> {
    _lock: MutexGuard<'a, ()>,
    saved: Vec<(String, Option<String>)>,
}

impl ScopedEnv<'_> {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let lock = ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let saved = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { _lock: lock, saved }
    }
}

impl Drop for ScopedEnv<'_> {
    fn drop(&mut self) {
        // Restore while the lock is still held.
        for (k, v) in self.saved.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

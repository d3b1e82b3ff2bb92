//! Environment-variable fallback for a config source.

use std::collections::HashMap;

use crate::domain::ports::ConfigSource;

/// Answers from the wrapped source first, then from the process environment.
///
/// The environment is captured once at construction, so later changes to
/// process variables are not observed. `embedding.batch.size` is looked up
/// as `EMBEDDING_BATCH_SIZE`.
#[derive(Debug)]
pub struct EnvFallbackConfigSource<S> {
    primary: S,
    env: HashMap<String, String>,
}

impl<S: ConfigSource> EnvFallbackConfigSource<S> {
    /// Wrap `primary`, falling back to the process environment.
    pub fn new(primary: S) -> Self {
        Self::with_env(primary, std::env::vars())
    }

    /// Use an explicit variable set instead of the process environment.
    pub fn with_env<I>(primary: S, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            primary,
            env: vars.into_iter().collect(),
        }
    }

    /// The wrapped source.
    pub const fn primary(&self) -> &S {
        &self.primary
    }
}

/// Environment variable name for a dotted config key.
pub fn env_var_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

impl<S: ConfigSource> ConfigSource for EnvFallbackConfigSource<S> {
    fn get(&self, key: &str) -> Option<String> {
        self.primary
            .get(key)
            .or_else(|| self.env.get(&env_var_name(key)).cloned())
    }
}

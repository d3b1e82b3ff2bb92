//! Configuration source port.

/// Flat key/value store holding the embedding tunables.
///
/// Implementations must be cheap to poll: the config runtime reads every
/// tunable on each call to fingerprint the current state.
pub trait ConfigSource: Send + Sync {
    /// Raw value for `key`, or `None` when the source does not define it.
    fn get(&self, key: &str) -> Option<String>;
}

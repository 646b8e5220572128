//! Cache configuration.

use crate::types::MissPolicy;

/// Process-wide settings shared by every enumeration in a registry.
///
/// Per-type settings on [`crate::EnumerationType`] take precedence where
/// both exist.
#[derive(Debug, Clone)]
pub struct Config {
    /// Master switch for caching. When false every lookup reads the store.
    pub perform_caching: bool,

    /// Patch the cache after single-record writes instead of invalidating it.
    pub prefer_incremental: bool,

    /// Miss policy for types that don't set their own.
    pub default_miss_policy: MissPolicy,

    /// Whether enumerator values get a safe alias unless the type says otherwise.
    pub safe_aliases: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            perform_caching: true,
            prefer_incremental: true,
            default_miss_policy: MissPolicy::Raise,
            safe_aliases: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the caching master switch.
    #[must_use]
    pub const fn perform_caching(mut self, value: bool) -> Self {
        self.perform_caching = value;
        self
    }

    /// Sets whether single-record writes patch the cache.
    #[must_use]
    pub const fn prefer_incremental(mut self, value: bool) -> Self {
        self.prefer_incremental = value;
        self
    }

    /// Sets the fallback miss policy.
    #[must_use]
    pub const fn default_miss_policy(mut self, policy: MissPolicy) -> Self {
        self.default_miss_policy = policy;
        self
    }

    /// Sets the fallback safe alias setting.
    #[must_use]
    pub const fn safe_aliases(mut self, value: bool) -> Self {
        self.safe_aliases = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.perform_caching);
        assert!(config.prefer_incremental);
        assert_eq!(config.default_miss_policy, MissPolicy::Raise);
        assert!(!config.safe_aliases);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .perform_caching(false)
            .prefer_incremental(false)
            .default_miss_policy(MissPolicy::Silent)
            .safe_aliases(true);

        assert!(!config.perform_caching);
        assert!(!config.prefer_incremental);
        assert_eq!(config.default_miss_policy, MissPolicy::Silent);
        assert!(config.safe_aliases);
    }
}

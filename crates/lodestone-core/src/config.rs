use serde::{Deserialize, Serialize};
use std::time::Duration;

///
/// ProviderConfig
///
/// Provider-level knobs, read once per execution context rather than
/// re-parsed per query.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Maximum transient-failure retries before the last error propagates.
    pub max_retries: u32,

    /// First retry delay; subsequent delays double per attempt.
    #[serde(with = "duration_millis")]
    pub retry_initial_delay: Duration,

    /// Emit the translated AST before resolution.
    pub enable_ast_logging: bool,

    /// Emit the resolved query before execution.
    pub enable_query_logging: bool,

    /// Plan-cache hook. Carried through the resolve handler but not
    /// yet backed by a cache implementation.
    pub enable_caching: bool,

    /// Leave reference navigations as unresolved handles instead of
    /// eager-loading the referenced documents.
    pub lazy_references: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_initial_delay: Duration::from_millis(100),
            enable_ast_logging: false,
            enable_query_logging: false,
            enable_caching: false,
            lazy_references: false,
        }
    }
}

impl ProviderConfig {
    /// Backoff delay before retry `attempt` (1-based):
    /// `initial * 2^(attempt - 1)`.
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_initial_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(de)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_per_attempt() {
        let config = ProviderConfig::default();
        assert_eq!(config.retry_delay(1), Duration::from_millis(100));
        assert_eq!(config.retry_delay(2), Duration::from_millis(200));
        assert_eq!(config.retry_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = ProviderConfig {
            max_retries: 5,
            retry_initial_delay: Duration::from_millis(50),
            enable_query_logging: true,
            ..ProviderConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ProviderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn backoff_doubles_per_attempt(
                initial_ms in 1u64..=10_000,
                attempt in 1u32..=10,
            ) {
                let config = ProviderConfig {
                    retry_initial_delay: Duration::from_millis(initial_ms),
                    ..ProviderConfig::default()
                };
                prop_assert_eq!(
                    config.retry_delay(attempt + 1),
                    config.retry_delay(attempt) * 2
                );
            }
        }
    }
}

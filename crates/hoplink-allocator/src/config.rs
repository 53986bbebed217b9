use std::time::Duration;
use typed_builder::TypedBuilder;

/// Short-code generation strategy, selected per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Encode an atomically incremented counter in base62. Collision-free
    /// without any lookup; codes are guessable and grow over time.
    #[default]
    Sequential,
    /// Draw fixed-length codes uniformly from the base62 alphabet and
    /// retry on collision, bounded by `max_retries`.
    Random,
}

/// Allocation configuration.
///
/// `code_length` and `max_retries` only apply to the random strategy.
#[derive(Debug, Clone, TypedBuilder)]
pub struct AllocatorConfig {
    #[builder(default)]
    pub strategy: Strategy,
    #[builder(default = 6)]
    pub code_length: usize,
    #[builder(default = 10)]
    pub max_retries: u32,
    #[builder(default = Duration::from_secs(3600))]
    pub cache_ttl: Duration,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_contract() {
        let config = AllocatorConfig::default();
        assert_eq!(config.strategy, Strategy::Sequential);
        assert_eq!(config.code_length, 6);
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
    }
}

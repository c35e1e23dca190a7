//! Numeric parameters for a weave job.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default maximum number of palette sounds layered per simultaneous event.
pub const DEFAULT_MAX_LAYERS: u32 = 2;
/// Default quantization granularity applied to the primary media's timing.
pub const DEFAULT_TICK_RATE_HZ: u32 = 20;

/// Configuration record attached to every job submission.
///
/// Construct via [`WeaveConfig::new`], which enforces the value ranges,
/// or take [`WeaveConfig::default`] for the stock settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaveConfig {
    max_layers: u32,
    tick_rate_hz: u32,
}

impl WeaveConfig {
    /// Create a configuration, rejecting out-of-range values.
    ///
    /// `max_layers` must be at least 1; `tick_rate_hz` must be positive.
    pub fn new(max_layers: u32, tick_rate_hz: u32) -> Result<Self, ValidationError> {
        if max_layers < 1 {
            return Err(ValidationError::InvalidConfig(
                "max_layers must be at least 1".to_string(),
            ));
        }
        if tick_rate_hz == 0 {
            return Err(ValidationError::InvalidConfig(
                "tick_rate_hz must be positive".to_string(),
            ));
        }
        Ok(Self {
            max_layers,
            tick_rate_hz,
        })
    }

    /// Maximum number of palette sounds combined per simultaneous event.
    pub fn max_layers(&self) -> u32 {
        self.max_layers
    }

    /// Quantization granularity in events per second.
    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            max_layers: DEFAULT_MAX_LAYERS,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn default_matches_stock_settings() {
        let config = WeaveConfig::default();
        assert_eq!(config.max_layers(), 2);
        assert_eq!(config.tick_rate_hz(), 20);
    }

    #[test]
    fn accepts_minimum_values() {
        let config = WeaveConfig::new(1, 1).unwrap();
        assert_eq!(config.max_layers(), 1);
        assert_eq!(config.tick_rate_hz(), 1);
    }

    #[test]
    fn rejects_zero_layers() {
        assert_matches!(
            WeaveConfig::new(0, 20),
            Err(ValidationError::InvalidConfig(_))
        );
    }

    #[test]
    fn rejects_zero_tick_rate() {
        assert_matches!(
            WeaveConfig::new(2, 0),
            Err(ValidationError::InvalidConfig(_))
        );
    }
}

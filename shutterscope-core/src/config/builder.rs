// ============================================================================
// shutterscope-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for AnalysisConfig
//
// Fluent API over AnalysisConfig so callers (the CLI in particular) can map
// optional flags onto individual settings while keeping every other default.

use super::{AnalysisConfig, DecoderConfig, LiveDetectorConfig};
use crate::analysis::ThresholdMethod;
use crate::error::CoreResult;

/// Builder for creating AnalysisConfig instances.
///
/// # Examples
///
/// ```rust
/// use shutterscope_core::config::AnalysisConfigBuilder;
///
/// let config = AnalysisConfigBuilder::new()
///     .percentile_threshold(20)
///     .sample_step(2)
///     .use_hw_decode(false)
///     .build();
/// assert_eq!(config.percentile_threshold, 20);
/// assert!(!config.decoder.use_hw_decode);
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl Default for AnalysisConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisConfigBuilder {
    /// Creates a new builder seeded with the library defaults.
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }

    /// Creates a builder starting from an existing configuration, e.g. one
    /// produced by [`AnalysisConfig::from_env`].
    pub fn from_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Sets the baseline percentile (0-100).
    pub fn percentile_threshold(mut self, percentile: u32) -> Self {
        self.config.percentile_threshold = percentile;
        self
    }

    /// Sets the margin factor of the original threshold method.
    pub fn margin_factor(mut self, factor: f64) -> Self {
        self.config.margin_factor = factor;
        self
    }

    /// Sets the default threshold method.
    pub fn method(mut self, method: ThresholdMethod) -> Self {
        self.config.method = method;
        self
    }

    /// Sets the plateau membership ratio used for peak estimation.
    pub fn plateau_threshold(mut self, ratio: f64) -> Self {
        self.config.plateau_threshold = ratio;
        self
    }

    /// Sets the minimum plateau length used for peak estimation.
    pub fn min_plateau_frames(mut self, frames: usize) -> Self {
        self.config.min_plateau_frames = frames;
        self
    }

    /// Replaces the whole live detector section.
    pub fn live(mut self, live: LiveDetectorConfig) -> Self {
        self.config.live = live;
        self
    }

    pub fn calibration_duration_seconds(mut self, seconds: f64) -> Self {
        self.config.live.calibration_duration_seconds = seconds;
        self
    }

    pub fn threshold_factor(mut self, factor: f64) -> Self {
        self.config.live.threshold_factor = factor;
        self
    }

    pub fn min_brightness_increase(mut self, increase: f64) -> Self {
        self.config.live.min_brightness_increase = increase;
        self
    }

    pub fn noise_multiplier(mut self, multiplier: f64) -> Self {
        self.config.live.noise_multiplier = multiplier;
        self
    }

    pub fn std_dev_multiplier(mut self, multiplier: f64) -> Self {
        self.config.live.std_dev_multiplier = multiplier;
        self
    }

    /// Replaces the whole decoder section.
    pub fn decoder(mut self, decoder: DecoderConfig) -> Self {
        self.config.decoder = decoder;
        self
    }

    pub fn sample_step(mut self, step: usize) -> Self {
        self.config.decoder.sample_step = step;
        self
    }

    pub fn codec_timeout_us(mut self, timeout_us: u64) -> Self {
        self.config.decoder.codec_timeout_us = timeout_us;
        self
    }

    pub fn use_hw_decode(mut self, enable: bool) -> Self {
        self.config.decoder.use_hw_decode = enable;
        self
    }

    pub fn progress_interval_frames(mut self, frames: u64) -> Self {
        self.config.decoder.progress_interval_frames = frames;
        self
    }

    pub fn prefetch_frames(mut self, frames: usize) -> Self {
        self.config.decoder.prefetch_frames = frames;
        self
    }

    /// Builds the configuration without validation.
    pub fn build(self) -> AnalysisConfig {
        self.config
    }

    /// Builds the configuration and validates it.
    pub fn try_build(self) -> CoreResult<AnalysisConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

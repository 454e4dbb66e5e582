//! Configuration structures and constants for the shutterscope-core library.
//!
//! Every tunable of the measurement engine lives here: batch threshold and
//! plateau parameters, the live calibration state machine constants, and the
//! frame decoder settings. The configuration is immutable once handed to a
//! component.

mod builder;
pub mod utils;

use serde::{Deserialize, Serialize};

use crate::analysis::ThresholdMethod;
use crate::error::{CoreError, CoreResult};

pub use builder::AnalysisConfigBuilder;

use utils::{get_env_bool, get_env_f64, get_env_string, get_env_u32, get_env_u64, get_env_usize};

// Default constants

/// Percentile of the brightness distribution used as the dark baseline.
pub const DEFAULT_PERCENTILE_THRESHOLD: u32 = 25;

/// Multiplier applied to `median - baseline` by the original threshold method.
pub const DEFAULT_MARGIN_FACTOR: f64 = 1.5;

/// Fraction of an event's maximum a sample must reach to count as plateau.
pub const DEFAULT_PLATEAU_THRESHOLD: f64 = 0.90;

/// Minimum plateau length (in samples) for an event to contribute a plateau mean.
pub const DEFAULT_MIN_PLATEAU_FRAMES: usize = 10;

/// Length of the live dark-baseline calibration window.
pub const DEFAULT_CALIBRATION_DURATION_SECONDS: f64 = 5.0;

/// Fraction of the `peak - baseline` span added to the baseline for the live threshold.
pub const DEFAULT_THRESHOLD_FACTOR: f64 = 0.8;

/// Minimum brightness rise over the baseline for the preliminary live threshold.
pub const DEFAULT_MIN_BRIGHTNESS_INCREASE: f64 = 50.0;

/// Multiplier on the brightest calibration sample for the preliminary live threshold.
pub const DEFAULT_NOISE_MULTIPLIER: f64 = 2.0;

/// Number of standard deviations above baseline for the preliminary live threshold.
pub const DEFAULT_STD_DEV_MULTIPLIER: f64 = 5.0;

/// Every n-th luma byte is sampled when computing frame brightness.
pub const DEFAULT_SAMPLE_STEP: usize = 4;

/// Upper bound of a single wait on the decoder, in microseconds.
pub const DEFAULT_CODEC_TIMEOUT_US: u64 = 10_000;

/// Raw pixel format requested from ffmpeg.
pub const DEFAULT_PIX_FMT: &str = "gray";

/// Progress is reported after this many decoded frames on the sequential path.
pub const DEFAULT_PROGRESS_INTERVAL_FRAMES: u64 = 100;

/// Capacity of the channel between the ffmpeg event pump and the decoder.
pub const DEFAULT_PREFETCH_FRAMES: usize = 8;

/// Frame rate assumed when neither the caller nor the container provides one.
pub const DEFAULT_FALLBACK_FPS: f64 = 30.0;

/// Constants of the two-phase live calibration state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveDetectorConfig {
    /// Duration of the dark-baseline phase, in seconds of frame time
    pub calibration_duration_seconds: f64,

    /// Final threshold sits at `baseline + (peak - baseline) * threshold_factor`
    pub threshold_factor: f64,

    pub min_brightness_increase: f64,

    pub noise_multiplier: f64,

    pub std_dev_multiplier: f64,
}

impl Default for LiveDetectorConfig {
    fn default() -> Self {
        Self {
            calibration_duration_seconds: DEFAULT_CALIBRATION_DURATION_SECONDS,
            threshold_factor: DEFAULT_THRESHOLD_FACTOR,
            min_brightness_increase: DEFAULT_MIN_BRIGHTNESS_INCREASE,
            noise_multiplier: DEFAULT_NOISE_MULTIPLIER,
            std_dev_multiplier: DEFAULT_STD_DEV_MULTIPLIER,
        }
    }
}

/// Settings for the ffmpeg-backed frame decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Luma sampling stride for brightness computation (0 is treated as 1)
    pub sample_step: usize,

    /// Bound on each poll of the decoder output, in microseconds
    pub codec_timeout_us: u64,

    /// Raw output pixel format; only the first `width*height` bytes are read
    pub pix_fmt: String,

    /// Whether to add platform hardware decode flags when available
    pub use_hw_decode: bool,

    pub progress_interval_frames: u64,

    pub prefetch_frames: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            sample_step: DEFAULT_SAMPLE_STEP,
            codec_timeout_us: DEFAULT_CODEC_TIMEOUT_US,
            pix_fmt: DEFAULT_PIX_FMT.to_string(),
            use_hw_decode: true,
            progress_interval_frames: DEFAULT_PROGRESS_INTERVAL_FRAMES,
            prefetch_frames: DEFAULT_PREFETCH_FRAMES,
        }
    }
}

/// Main configuration structure for the shutterscope-core library.
///
/// All fields have defaults matching the measurement procedure; the builder
/// provides a convenient way to override individual values.
///
/// # Examples
///
/// ```rust
/// use shutterscope_core::config::AnalysisConfigBuilder;
/// use shutterscope_core::ThresholdMethod;
///
/// let config = AnalysisConfigBuilder::new()
///     .method(ThresholdMethod::ZScore)
///     .margin_factor(1.2)
///     .calibration_duration_seconds(3.0)
///     .build();
/// assert_eq!(config.live.calibration_duration_seconds, 3.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Percentile (0-100) used as the dark baseline
    pub percentile_threshold: u32,

    /// Margin applied by the original threshold method
    pub margin_factor: f64,

    /// Default threshold method for batch analysis
    pub method: ThresholdMethod,

    /// Plateau membership ratio for peak estimation
    pub plateau_threshold: f64,

    /// Minimum plateau length for peak estimation
    pub min_plateau_frames: usize,

    pub live: LiveDetectorConfig,

    pub decoder: DecoderConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            percentile_threshold: DEFAULT_PERCENTILE_THRESHOLD,
            margin_factor: DEFAULT_MARGIN_FACTOR,
            method: ThresholdMethod::Original,
            plateau_threshold: DEFAULT_PLATEAU_THRESHOLD,
            min_plateau_frames: DEFAULT_MIN_PLATEAU_FRAMES,
            live: LiveDetectorConfig::default(),
            decoder: DecoderConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Builds the default configuration with `SHUTTERSCOPE_*` environment
    /// overrides applied. Unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let method = std::env::var("SHUTTERSCOPE_METHOD")
            .ok()
            .and_then(|m| m.parse::<ThresholdMethod>().ok())
            .unwrap_or(defaults.method);

        Self {
            percentile_threshold: get_env_u32(
                "SHUTTERSCOPE_PERCENTILE_THRESHOLD",
                defaults.percentile_threshold,
            ),
            margin_factor: get_env_f64("SHUTTERSCOPE_MARGIN_FACTOR", defaults.margin_factor),
            method,
            plateau_threshold: get_env_f64(
                "SHUTTERSCOPE_PLATEAU_THRESHOLD",
                defaults.plateau_threshold,
            ),
            min_plateau_frames: get_env_usize(
                "SHUTTERSCOPE_MIN_PLATEAU_FRAMES",
                defaults.min_plateau_frames,
            ),
            live: LiveDetectorConfig {
                calibration_duration_seconds: get_env_f64(
                    "SHUTTERSCOPE_CALIBRATION_SECONDS",
                    defaults.live.calibration_duration_seconds,
                ),
                threshold_factor: get_env_f64(
                    "SHUTTERSCOPE_THRESHOLD_FACTOR",
                    defaults.live.threshold_factor,
                ),
                min_brightness_increase: get_env_f64(
                    "SHUTTERSCOPE_MIN_BRIGHTNESS_INCREASE",
                    defaults.live.min_brightness_increase,
                ),
                noise_multiplier: get_env_f64(
                    "SHUTTERSCOPE_NOISE_MULTIPLIER",
                    defaults.live.noise_multiplier,
                ),
                std_dev_multiplier: get_env_f64(
                    "SHUTTERSCOPE_STD_DEV_MULTIPLIER",
                    defaults.live.std_dev_multiplier,
                ),
            },
            decoder: DecoderConfig {
                sample_step: get_env_usize("SHUTTERSCOPE_SAMPLE_STEP", defaults.decoder.sample_step),
                codec_timeout_us: get_env_u64(
                    "SHUTTERSCOPE_CODEC_TIMEOUT_US",
                    defaults.decoder.codec_timeout_us,
                ),
                pix_fmt: get_env_string("SHUTTERSCOPE_PIX_FMT", defaults.decoder.pix_fmt),
                use_hw_decode: get_env_bool(
                    "SHUTTERSCOPE_HW_DECODE",
                    defaults.decoder.use_hw_decode,
                ),
                progress_interval_frames: get_env_u64(
                    "SHUTTERSCOPE_PROGRESS_INTERVAL",
                    defaults.decoder.progress_interval_frames,
                ),
                prefetch_frames: get_env_usize(
                    "SHUTTERSCOPE_PREFETCH_FRAMES",
                    defaults.decoder.prefetch_frames,
                ),
            },
        }
    }

    /// Rejects values that would make the analysis meaningless.
    pub fn validate(&self) -> CoreResult<()> {
        if self.percentile_threshold > 100 {
            return Err(CoreError::Config(format!(
                "percentile_threshold must be within 0-100, got {}",
                self.percentile_threshold
            )));
        }
        if !self.margin_factor.is_finite() || self.margin_factor < 0.0 {
            return Err(CoreError::Config(format!(
                "margin_factor must be a non-negative number, got {}",
                self.margin_factor
            )));
        }
        if !(self.plateau_threshold > 0.0 && self.plateau_threshold <= 1.0) {
            return Err(CoreError::Config(format!(
                "plateau_threshold must be within (0, 1], got {}",
                self.plateau_threshold
            )));
        }
        if !(self.live.calibration_duration_seconds > 0.0) {
            return Err(CoreError::Config(format!(
                "calibration_duration_seconds must be positive, got {}",
                self.live.calibration_duration_seconds
            )));
        }
        if !(self.live.threshold_factor > 0.0 && self.live.threshold_factor <= 1.0) {
            return Err(CoreError::Config(format!(
                "threshold_factor must be within (0, 1], got {}",
                self.live.threshold_factor
            )));
        }
        if self.decoder.codec_timeout_us == 0 {
            return Err(CoreError::Config(
                "codec_timeout_us must be greater than zero".to_string(),
            ));
        }
        if self.decoder.prefetch_frames == 0 {
            return Err(CoreError::Config(
                "prefetch_frames must be greater than zero".to_string(),
            ));
        }
        if self.decoder.pix_fmt.trim().is_empty() {
            return Err(CoreError::Config("pix_fmt must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_measurement_procedure() {
        let config = AnalysisConfig::default();
        assert_eq!(config.percentile_threshold, 25);
        assert_eq!(config.margin_factor, 1.5);
        assert_eq!(config.plateau_threshold, 0.90);
        assert_eq!(config.min_plateau_frames, 10);
        assert_eq!(config.live.calibration_duration_seconds, 5.0);
        assert_eq!(config.live.threshold_factor, 0.8);
        assert_eq!(config.live.min_brightness_increase, 50.0);
        assert_eq!(config.live.noise_multiplier, 2.0);
        assert_eq!(config.live.std_dev_multiplier, 5.0);
        assert_eq!(config.decoder.sample_step, 4);
        assert_eq!(config.decoder.codec_timeout_us, 10_000);
        assert_eq!(config.decoder.pix_fmt, "gray");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = AnalysisConfig {
            percentile_threshold: 120,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let mut config = AnalysisConfig::default();
        config.live.threshold_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.decoder.codec_timeout_us = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serializes_to_json() {
        let config = AnalysisConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"percentile_threshold\":25"));
        let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

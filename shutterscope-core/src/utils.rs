//! Utility functions for formatting and path handling.
//!
//! Small helpers shared by the speed formatting, the report generator and the
//! CLI output.

use std::path::Path;

/// Formats `value` with at most `decimals` decimals, dropping trailing zeros
/// (e.g., 2.50 -> "2.5", 2.00 -> "2").
#[must_use]
pub fn trim_decimal(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

/// Formats a percentage with an explicit sign for positive values (e.g., "+3.2%").
#[must_use]
pub fn format_signed_percent(percent: f64) -> String {
    let sign = if percent > 0.0 { "+" } else { "" };
    format!("{sign}{percent:.1}%")
}

/// Formats a nanosecond timestamp as seconds with millisecond precision.
#[must_use]
pub fn format_timestamp_nanos(nanos: i64) -> String {
    format!("{:.3}s", nanos as f64 / 1_000_000_000.0)
}

/// Returns the file stem of `path`, or `"video"` when it has none.
#[must_use]
pub fn file_stem_or_default(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "video".to_string())
}

/// Safely extracts the file name of a path for display.
pub fn get_filename_safe(path: &Path) -> crate::CoreResult<String> {
    Ok(path
        .file_name()
        .ok_or_else(|| {
            crate::CoreError::PathError(format!("Failed to get filename for {}", path.display()))
        })?
        .to_string_lossy()
        .to_string())
}

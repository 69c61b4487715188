//! Helpers for number formatting, fixed-width fields and file system checks.

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Shortest round-tripping decimal form of `value`, without exponent.
///
/// Integral values print without a fraction (`2.0` -> `"2"`) and negative zero
/// prints as `"0"`. Composite sort keys are built from this form, so it must stay
/// stable across runs.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    value.to_string()
}

/// Round `value` to the nearest `1 / precision`, halves rounding up.
pub fn round_to_precision(value: f64, precision: f64) -> f64 {
    (value * precision + 0.5).floor() / precision
}

/// Center `value` in a field of `width` characters.
///
/// Spaces are added on both sides until the field is at least `width` wide.
/// If it is then too wide, exactly one leading character is dropped, so odd
/// padding leaves the extra space on the right.
///
/// # Arguments
///
/// * `value` - The text to center
/// * `width` - Target field width in characters
///
/// # Returns
///
/// A `width`-character field, or `value` minus its first character when
/// `value` was already wider than the field.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(center("1", 4), " 1  ");
/// assert_eq!(center("$12.34", 5), "12.34");
/// ```
pub fn center(value: &str, width: usize) -> String {
    let mut field = value.to_string();
    while field.chars().count() < width {
        field = format!(" {field} ");
    }
    if field.chars().count() > width {
        field = field.chars().skip(1).collect();
    }
    field
}

/// Append spaces until `value` is at least `width` characters wide.
///
/// # Arguments
///
/// * `value` - The text to pad
/// * `width` - Minimum field width in characters
///
/// # Returns
///
/// `value` followed by enough spaces to fill `width`. Longer values are
/// returned unchanged, never truncated.
pub fn pad_right(value: &str, width: usize) -> String {
    let len = value.chars().count();
    let mut field = value.to_string();
    if len < width {
        field.extend(std::iter::repeat_n(' ', width - len));
    }
    field
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters and suffixed with the number of
/// bytes dropped.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of characters to keep
///
/// # Returns
///
/// The original string if it has at most `max` characters, otherwise the
/// first `max` characters with `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Convert a title to a URL-friendly slug.
///
/// Lowercases, drops everything except alphanumerics, spaces and hyphens, then
/// turns spaces into hyphens. Leading and trailing hyphens are removed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Utopian Daily: "), "utopian-daily");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-")
        .trim_matches('-')
        .to_string()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory cannot be created or
/// the probe file cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

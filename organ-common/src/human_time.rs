//! Human-readable display formatting
//!
//! Elapsed playback time is shown to the operator as `M:SS` (minutes are not
//! wrapped into hours: a 75 minute recital reads `75:00`).

use std::time::Duration;

/// Seconds per minute
const SECONDS_PER_MINUTE: u64 = 60;

/// Format whole seconds as `M:SS`.
///
/// # Examples
///
/// ```
/// use organ_common::human_time::format_elapsed;
///
/// assert_eq!(format_elapsed(0), "0:00");
/// assert_eq!(format_elapsed(65), "1:05");
/// assert_eq!(format_elapsed(754), "12:34");
/// ```
pub fn format_elapsed(seconds: u64) -> String {
    let minutes = seconds / SECONDS_PER_MINUTE;
    let secs = seconds % SECONDS_PER_MINUTE;
    format!("{}:{:02}", minutes, secs)
}

/// Format a duration as `M:SS`, truncating fractional seconds
pub fn format_elapsed_duration(elapsed: Duration) -> String {
    format_elapsed(elapsed.as_secs())
}

/// Format a count with the matching singular or plural noun.
///
/// # Examples
///
/// ```
/// use organ_common::human_time::format_plural;
///
/// assert_eq!(format_plural(1, "verse", "verses"), "1 verse");
/// assert_eq!(format_plural(4, "verse", "verses"), "4 verses");
/// ```
pub fn format_plural(count: u32, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

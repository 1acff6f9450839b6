//! Human-readable downtime strings.

/// Seconds per unit, largest first.
const UNITS: &[(&str, i64)] = &[("d", 86_400), ("h", 3_600), ("m", 60)];

/// Format a number of seconds as the largest whole unit it spans.
///
/// The value is rounded down, so 95 seconds reads `"1 m"` and 7199 seconds
/// reads `"1 h"`. Anything under a minute is shown in seconds. Negative
/// inputs are treated as zero.
pub fn format_downtime(seconds: i64) -> String {
    let seconds = seconds.max(0);
    for (suffix, size) in UNITS {
        if seconds >= *size {
            return format!("{} {}", seconds / size, suffix);
        }
    }
    format!("{} s", seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_below_a_minute() {
        assert_eq!(format_downtime(0), "0 s");
        assert_eq!(format_downtime(35), "35 s");
        assert_eq!(format_downtime(59), "59 s");
    }

    #[test]
    fn rounds_down_to_largest_unit() {
        assert_eq!(format_downtime(60), "1 m");
        assert_eq!(format_downtime(61), "1 m");
        assert_eq!(format_downtime(95), "1 m");
        assert_eq!(format_downtime(6 * 60 + 59), "6 m");
        assert_eq!(format_downtime(7_199), "1 h");
        assert_eq!(format_downtime(86_399), "23 h");
        assert_eq!(format_downtime(86_400), "1 d");
        assert_eq!(format_downtime(10 * 86_400 + 5), "10 d");
    }

    #[test]
    fn negative_clamps_to_zero() {
        assert_eq!(format_downtime(-30), "0 s");
    }
}

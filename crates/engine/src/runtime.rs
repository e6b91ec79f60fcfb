//! Runtime formatting: elapsed wall-clock time since a component started

/// Shown when a component is stopped or has no start time
pub const ZERO_RUNTIME: &str = "00:00:00";

/// Format the elapsed time since `start_time` as `HH:MM:SS`.
///
/// Hours are not wrapped at 24 (90000 s → `25:00:00`). A start time in the
/// future reads as zero elapsed.
pub fn format_runtime(now: i64, start_time: i64, running: bool) -> String {
    if !running || start_time == 0 {
        return ZERO_RUNTIME.to_string();
    }

    let elapsed = (now - start_time).max(0);
    let hours = elapsed / 3600;
    let minutes = (elapsed % 3600) / 60;
    let seconds = elapsed % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parse an `HH:MM:SS` runtime back into seconds
pub fn parse_runtime(s: &str) -> Option<i64> {
    let mut parts = s.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn is_hh_mm_ss(s: &str) -> bool {
        let b = s.as_bytes();
        b.len() == 8
            && b[2] == b':'
            && b[5] == b':'
            && b.iter()
                .enumerate()
                .all(|(i, c)| i == 2 || i == 5 || c.is_ascii_digit())
    }

    #[test]
    fn test_stopped_reads_zero() {
        assert_eq!(format_runtime(NOW, NOW - 500, false), ZERO_RUNTIME);
    }

    #[test]
    fn test_missing_start_time_reads_zero() {
        assert_eq!(format_runtime(NOW, 0, true), ZERO_RUNTIME);
    }

    #[test]
    fn test_formats_each_unit() {
        assert_eq!(format_runtime(NOW, NOW - 3_723, true), "01:02:03");
        assert_eq!(format_runtime(NOW, NOW - 59, true), "00:00:59");
        assert_eq!(format_runtime(NOW, NOW, true), "00:00:00");
    }

    #[test]
    fn test_hours_do_not_roll_over() {
        assert_eq!(format_runtime(NOW, NOW - 90_000, true), "25:00:00");
    }

    #[test]
    fn test_future_start_clamps_to_zero() {
        assert_eq!(format_runtime(NOW, NOW + 30, true), ZERO_RUNTIME);
    }

    #[test]
    fn test_format_then_parse_recovers_elapsed() {
        for elapsed in [0, 1, 59, 60, 61, 3_599, 3_600, 45_296, 86_399] {
            let s = format_runtime(NOW, NOW - elapsed, true);
            assert!(is_hh_mm_ss(&s), "bad shape: {s}");
            assert_eq!(parse_runtime(&s), Some(elapsed), "elapsed={elapsed}");
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_runtime("01:02"), None);
        assert_eq!(parse_runtime("01:02:03:04"), None);
        assert_eq!(parse_runtime("00:61:00"), None);
        assert_eq!(parse_runtime("aa:00:00"), None);
    }
}

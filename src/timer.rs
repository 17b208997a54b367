use time::{format_description::BorrowedFormatItem, macros::format_description};
use tracing_subscriber::fmt::time::UtcTime;

/// `YY-MM-DD HH:MM:SS.mmm`
const SHORT_UTC_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year repr:last_two]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
);

/// The default timer: UTC wall-clock time formatted as `YY-MM-DD HH:MM:SS.mmm`.
pub type ShortUtcTime = UtcTime<&'static [BorrowedFormatItem<'static>]>;

/// Returns the default timer.
pub fn short_utc() -> ShortUtcTime {
    UtcTime::new(SHORT_UTC_FORMAT)
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

    use super::short_utc;

    fn now() -> String {
        let mut out = String::new();
        short_utc().format_time(&mut Writer::new(&mut out)).unwrap();
        out
    }

    #[test]
    fn short_utc_shape() {
        let stamp = now();
        // 24-01-02 10:00:00.000
        assert_eq!(stamp.len(), 21, "{stamp}");
        let bytes = stamp.as_bytes();
        for (idx, sep) in [(2, b'-'), (5, b'-'), (8, b' '), (11, b':'), (14, b':'), (17, b'.')] {
            assert_eq!(bytes[idx], sep, "{stamp}");
        }
        assert!(stamp
            .bytes()
            .enumerate()
            .filter(|(idx, _)| ![2, 5, 8, 11, 14, 17].contains(idx))
            .all(|(_, b)| b.is_ascii_digit()));
    }

    #[test]
    fn short_utc_is_monotonic_enough() {
        let first = now();
        let second = now();
        assert!(first <= second, "{first} > {second}");
    }
}

//! The immutable description of a load run.

use std::num::NonZeroU32;
use std::time::{Duration, SystemTime};

/// Prefix of the write path when none is configured.
pub const DEFAULT_PATH_PREFIX: &str = "putstorm";

/// Parameters of a load run, constructed once at startup.
#[derive(Clone, Debug)]
pub struct LoadSpec {
    /// Base address the backend writes to, used for diagnostics.
    pub target: String,
    /// Overrides the host identity of every write.
    pub host: Option<String>,
    /// Destination path of every write.
    pub path: String,
    /// Size of the random payload in bytes.
    pub payload_size: usize,
    /// Target operations per second.
    pub rate: NonZeroU32,
    /// Number of operations to issue, `0` means unbounded.
    pub count: u64,
    /// Idle connections the backend transport keeps per host.
    pub pool_size: usize,
}

impl LoadSpec {
    /// The time between two consecutive issuances.
    ///
    /// Rates above one billion per second are clamped to a 1ns interval.
    pub fn interval(&self) -> Duration {
        (Duration::from_secs(1) / self.rate.get()).max(Duration::from_nanos(1))
    }

    /// Whether the run stops after [`count`](Self::count) operations.
    pub fn is_bounded(&self) -> bool {
        self.count > 0
    }
}

/// Builds the default write path from the given time.
///
/// The timestamp is RFC 3339 in UTC with `:` replaced, so it is safe to use as an object key.
pub fn default_path(now: SystemTime) -> String {
    let timestamp = humantime::format_rfc3339_nanos(now).to_string();
    format!("{DEFAULT_PATH_PREFIX}/{}", timestamp.replace(':', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(rate: u32, count: u64) -> LoadSpec {
        LoadSpec {
            target: "http://localhost".into(),
            host: None,
            path: "test".into(),
            payload_size: 0,
            rate: NonZeroU32::new(rate).unwrap(),
            count,
            pool_size: 2,
        }
    }

    #[test]
    fn interval_divides_one_second() {
        assert_eq!(spec(1, 0).interval(), Duration::from_secs(1));
        assert_eq!(spec(4, 0).interval(), Duration::from_millis(250));
        assert_eq!(spec(3, 0).interval(), Duration::from_nanos(333_333_333));
        assert_eq!(spec(u32::MAX, 0).interval(), Duration::from_nanos(1));
    }

    #[test]
    fn bounded_only_with_count() {
        assert!(!spec(1, 0).is_bounded());
        assert!(spec(1, 5).is_bounded());
    }

    #[test]
    fn default_path_has_no_colons() {
        let now = SystemTime::UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        assert_eq!(
            default_path(now),
            "putstorm/2023-11-14T22-13-20.123456789Z"
        );
    }
}

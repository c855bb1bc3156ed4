//! Small helpers shared across the engine: condition coercion, ids and
//! timestamps.

mod truthy;

pub use truthy::is_truthy;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Timestamps carried on trace events.
pub type Timestamp = DateTime<Utc>;

/// Generates a new random UUID v4, used for authored step instance ids.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a time-ordered UUID v7, used for run ids.
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::now_v7()
}

/// Returns the current UTC time formatted as RFC 3339 with microseconds.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_versions() {
        assert_eq!(generate_uuid().get_version_num(), 4);
        assert_eq!(generate_run_id().get_version_num(), 7);
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));
    }
}

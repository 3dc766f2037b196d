// Strong Types - Newtype identifiers for every table plus timestamp helpers
// Keeps a PostId from being passed where a UserId is expected

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw row id
            pub fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id!(
    /// Identity owned by the user directory
    UserId
);
row_id!(GroupId);
row_id!(PostId);
row_id!(CommentId);

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn current_time_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert stored milliseconds back into a UTC timestamp
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_id_operations() {
        let id = PostId::new(123);
        assert_eq!(id.value(), 123);
        assert_eq!(id.to_string(), "123");
        assert_eq!(i64::from(id), 123);
        assert_eq!(serde_json::to_string(&id).unwrap(), "123");
    }

    #[test]
    fn test_millis_round_trip() {
        let now = current_time_millis();
        assert_eq!(millis_to_datetime(now).timestamp_millis(), now);
    }
}

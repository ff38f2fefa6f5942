//! Strongly-typed identifier value objects.
//!
//! Identifiers are assigned by the store (database sequences), so they wrap
//! the raw `i64` key rather than generating values themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

macro_rules! store_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an id, rejecting keys the store never assigns.
            pub fn new(value: i64) -> Result<Self, ValidationError> {
                if value <= 0 {
                    return Err(ValidationError::invalid_format(
                        $field,
                        format!("must be positive, got {}", value),
                    ));
                }
                Ok(Self(value))
            }

            /// Wraps a key read back from the store without validation.
            pub fn from_raw(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw key.
            pub fn value(&self) -> i64 {
                self.0
            }

            /// Returns true if the key is one the store could have assigned.
            pub fn is_assigned(&self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| ValidationError::invalid_format($field, e.to_string()))?;
                Self::new(value)
            }
        }
    };
}

store_id!(
    /// Identifier of a machine cycle.
    CycleId,
    "cycle_id"
);

store_id!(
    /// Identifier of a registered user.
    UserId,
    "user_id"
);

store_id!(
    /// Identifier of a notification registration.
    RegistrationId,
    "registration_id"
);

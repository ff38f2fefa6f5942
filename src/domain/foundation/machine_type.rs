//! MachineType enum for the appliances the hub reports on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Kind of laundry machine a cycle or registration refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    Washer,
    Dryer,
}

impl MachineType {
    /// Returns all machine types in display order.
    pub fn all() -> &'static [MachineType] {
        &[MachineType::Washer, MachineType::Dryer]
    }

    /// Lowercase token used on the bus, in storage and in the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::Washer => "washer",
            MachineType::Dryer => "dryer",
        }
    }

    /// Title-case name used in notification titles.
    pub fn display_name(&self) -> &'static str {
        match self {
            MachineType::Washer => "Washer",
            MachineType::Dryer => "Dryer",
        }
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MachineType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() {
            return Err(ValidationError::empty_field("machine_type"));
        }
        match token.to_ascii_lowercase().as_str() {
            "washer" => Ok(MachineType::Washer),
            "dryer" => Ok(MachineType::Dryer),
            other => Err(ValidationError::invalid_format(
                "machine_type",
                format!("expected 'washer' or 'dryer', got '{}'", other),
            )),
        }
    }
}

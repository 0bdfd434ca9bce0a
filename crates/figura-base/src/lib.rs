use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod humanoid;

pub use humanoid::HumanBone;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Guid(Uuid);

impl Guid {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for Guid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scene lengths are metres; the unit only affects how lengths are printed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Meter,
    Centimeter,
}

impl LengthUnit {
    pub fn format(self, meters: f32) -> String {
        match self {
            Self::Meter => format!("{meters:.2} m"),
            Self::Centimeter => format!("{:.0} cm", meters * 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_units_format_metres() {
        assert_eq!(LengthUnit::Meter.format(1.724), "1.72 m");
        assert_eq!(LengthUnit::Centimeter.format(1.724), "172 cm");
    }
}

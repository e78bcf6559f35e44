//! Energy reading value objects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An immutable energy/power sample.
///
/// A reading holds the device- or port-scoped telemetry values reported by
/// a switch in one poll cycle. Delta readings share this shape; their
/// fields are `new - previous` and may be negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyReading {
    /// Energy consumed since the device's own reference point, in joules.
    current_consumption: f64,
    /// Instantaneous power draw, in watts.
    power_drawn: f64,
    /// Free-form metadata annotations. Order-irrelevant.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    annotations: BTreeMap<String, String>,
}

impl EnergyReading {
    /// Creates a reading without annotations.
    pub fn new(current_consumption: f64, power_drawn: f64) -> Self {
        Self {
            current_consumption,
            power_drawn,
            annotations: BTreeMap::new(),
        }
    }

    /// Creates a reading carrying metadata annotations.
    pub fn with_annotations(
        current_consumption: f64,
        power_drawn: f64,
        annotations: BTreeMap<String, String>,
    ) -> Self {
        Self {
            current_consumption,
            power_drawn,
            annotations,
        }
    }

    /// The all-zero reading used as the first-sample delta baseline.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Returns the current consumption value.
    pub fn current_consumption(&self) -> f64 {
        self.current_consumption
    }

    /// Returns the power drawn value.
    pub fn power_drawn(&self) -> f64 {
        self.power_drawn
    }

    /// Returns the metadata annotations.
    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    /// Returns true when both numeric fields are exactly 0.0.
    pub fn is_zero(&self) -> bool {
        self.current_consumption == 0.0 && self.power_drawn == 0.0
    }
}

impl fmt::Display for EnergyReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "currentConsumption: {}, powerDrawn: {}",
            self.current_consumption, self.power_drawn
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_zero_reading() {
        assert!(EnergyReading::zero().is_zero());
        assert!(EnergyReading::new(0.0, 0.0).is_zero());
        assert!(!EnergyReading::new(0.0, 0.1).is_zero());
        assert!(!EnergyReading::new(-0.5, 0.0).is_zero());
    }

    #[test]
    fn test_annotations_order_irrelevant() {
        let mut a = BTreeMap::new();
        a.insert("sensor".to_string(), "psu0".to_string());
        a.insert("unit".to_string(), "J".to_string());

        let mut b = BTreeMap::new();
        b.insert("unit".to_string(), "J".to_string());
        b.insert("sensor".to_string(), "psu0".to_string());

        assert_eq!(
            EnergyReading::with_annotations(1.0, 2.0, a),
            EnergyReading::with_annotations(1.0, 2.0, b)
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let reading = EnergyReading::new(10.5, -3.25);
        let json = serde_json::to_string(&reading).unwrap();
        let back: EnergyReading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }
}

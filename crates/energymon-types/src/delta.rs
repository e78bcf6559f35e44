//! Delta computation between consecutive readings.

use crate::EnergyReading;

/// Computes the delta record for a new reading against the previous one.
///
/// The delta is `new - previous` field by field, exact IEEE-754
/// subtraction, and may be negative. When there is no previous reading the
/// result is the zero reading: the first sample establishes the baseline
/// and carries no meaningful rate yet.
///
/// Annotations are not differenced; the delta carries none.
pub fn delta(previous: Option<&EnergyReading>, new: &EnergyReading) -> EnergyReading {
    match previous {
        Some(prev) => EnergyReading::new(
            new.current_consumption() - prev.current_consumption(),
            new.power_drawn() - prev.power_drawn(),
        ),
        None => EnergyReading::zero(),
    }
}

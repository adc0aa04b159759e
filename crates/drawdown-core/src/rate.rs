//! Removal-rate model.
//!
//! Turns the four operator inputs into a mass-removal rate, the mass still to
//! remove, and the countdown target in seconds. Pure and deterministic; safe
//! to call on every input change.

use serde::{Deserialize, Serialize};

use crate::error::RateError;

/// Converts volume-per-minute times concentration into mass per minute.
pub const VOLUME_TO_MASS_FACTOR: f64 = 42.0;

/// Operator inputs. Every field must be finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RateInputs {
    /// Volume delivered per minute.
    pub flow_rate: f64,
    /// Mass per unit volume.
    pub concentration: f64,
    pub start_mass: f64,
    pub target_mass: f64,
}

impl RateInputs {
    pub fn new(flow_rate: f64, concentration: f64, start_mass: f64, target_mass: f64) -> Self {
        Self {
            flow_rate,
            concentration,
            start_mass,
            target_mass,
        }
    }

    /// Reject negative, NaN or infinite fields.
    pub fn validate(&self) -> Result<(), RateError> {
        let fields = [
            ("flow_rate", self.flow_rate),
            ("concentration", self.concentration),
            ("start_mass", self.start_mass),
            ("target_mass", self.target_mass),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(RateError::InvalidInput { field, value });
            }
        }
        Ok(())
    }
}

/// Derived quantities. `target_duration_secs` is `Some` only when both the
/// removal rate and the mass to remove are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateResult {
    /// Mass removed per minute.
    pub mass_removal_rate: f64,
    /// May be negative when the target exceeds the start mass.
    pub mass_to_remove: f64,
    pub target_duration_secs: Option<f64>,
}

impl RateResult {
    /// Total form: always yields the numbers, even for inputs that cannot
    /// start a timer, so they can still be displayed.
    pub fn from_inputs(inputs: &RateInputs) -> Self {
        let mass_removal_rate = inputs.flow_rate * VOLUME_TO_MASS_FACTOR * inputs.concentration;
        let mass_to_remove = inputs.start_mass - inputs.target_mass;
        let target_duration_secs = if mass_removal_rate > 0.0 && mass_to_remove > 0.0 {
            Some(mass_to_remove / mass_removal_rate * 60.0)
        } else {
            None
        };
        Self {
            mass_removal_rate,
            mass_to_remove,
            target_duration_secs,
        }
    }

    /// Classify the result: a duration, or why there is none.
    ///
    /// A negative mass to remove is reported as `InvalidRange` even when the
    /// rate is also zero; the user has to fix the masses either way.
    pub fn target_duration(&self) -> Result<f64, RateError> {
        if self.mass_to_remove < 0.0 {
            return Err(RateError::InvalidRange {
                excess: -self.mass_to_remove,
            });
        }
        self.target_duration_secs.ok_or(RateError::Incomplete {
            mass_removal_rate: self.mass_removal_rate,
            mass_to_remove: self.mass_to_remove,
        })
    }
}

/// Compute the removal plan. `Ok` always carries a defined duration.
pub fn compute(inputs: &RateInputs) -> Result<RateResult, RateError> {
    inputs.validate()?;
    let result = RateResult::from_inputs(inputs);
    result.target_duration()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reference_scenario() {
        let result = compute(&RateInputs::new(80.0, 2.0, 22_500.0, 11_000.0)).unwrap();
        assert_eq!(result.mass_removal_rate, 6720.0);
        assert_eq!(result.mass_to_remove, 11_500.0);
        let secs = result.target_duration_secs.unwrap();
        assert!((secs - 102.678_571).abs() < 1e-3, "got {secs}");
    }

    #[test]
    fn target_above_start_is_invalid_range() {
        let err = compute(&RateInputs::new(80.0, 2.0, 10_000.0, 15_000.0)).unwrap_err();
        assert_eq!(err, RateError::InvalidRange { excess: 5_000.0 });
    }

    #[test]
    fn zero_rate_or_zero_mass_is_incomplete() {
        let zero_flow = compute(&RateInputs::new(0.0, 2.0, 200.0, 100.0)).unwrap_err();
        assert!(matches!(zero_flow, RateError::Incomplete { .. }));

        let zero_mass = compute(&RateInputs::new(80.0, 2.0, 100.0, 100.0)).unwrap_err();
        assert!(matches!(zero_mass, RateError::Incomplete { mass_to_remove, .. } if mass_to_remove == 0.0));
    }

    #[test]
    fn negative_range_wins_over_zero_rate() {
        let err = compute(&RateInputs::new(0.0, 0.0, 100.0, 200.0)).unwrap_err();
        assert!(matches!(err, RateError::InvalidRange { .. }));
    }

    #[test]
    fn non_finite_and_negative_inputs_rejected() {
        let err = compute(&RateInputs::new(f64::NAN, 2.0, 200.0, 100.0)).unwrap_err();
        assert!(matches!(err, RateError::InvalidInput { field: "flow_rate", .. }));

        let err = compute(&RateInputs::new(1.0, 2.0, 200.0, -1.0)).unwrap_err();
        assert!(matches!(err, RateError::InvalidInput { field: "target_mass", .. }));
    }

    #[test]
    fn from_inputs_keeps_numbers_for_display() {
        let result = RateResult::from_inputs(&RateInputs::new(10.0, 1.0, 100.0, 300.0));
        assert_eq!(result.mass_removal_rate, 420.0);
        assert_eq!(result.mass_to_remove, -200.0);
        assert_eq!(result.target_duration_secs, None);
    }

    proptest! {
        #[test]
        fn duration_matches_formula(
            flow in 0.01f64..1_000.0,
            conc in 0.01f64..50.0,
            target in 0.0f64..100_000.0,
            extra in 0.01f64..100_000.0,
        ) {
            let start = target + extra;
            let result = compute(&RateInputs::new(flow, conc, start, target)).unwrap();
            let expected = (start - target) / (flow * VOLUME_TO_MASS_FACTOR * conc) * 60.0;
            prop_assert_eq!(result.target_duration_secs, Some(expected));
        }

        #[test]
        fn negative_removal_never_yields_duration(
            flow in 0.0f64..1_000.0,
            conc in 0.0f64..50.0,
            start in 0.0f64..100_000.0,
            extra in 0.01f64..100_000.0,
        ) {
            let err = compute(&RateInputs::new(flow, conc, start, start + extra)).unwrap_err();
            let is_invalid_range = matches!(err, RateError::InvalidRange { .. });
            prop_assert!(is_invalid_range);
        }
    }
}

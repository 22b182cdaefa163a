// src/validation.rs
//
// Parameter validation gate, run before a record is sent or saved.
//
// Every field must lie within its clinical [min, max] range and, where a step
// is defined, land on an allowed increment from the range minimum. Validation
// short-circuits on the first violation with a human-readable reason.

use std::fmt;

use crate::params::PacingParameters;

/// Tolerance for step checks, to absorb floating-point roundoff from form input.
const STEP_TOLERANCE: f64 = 1e-6;

/// A named field violating its range or step rule.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationError {
    /// Display name of the offending field, e.g. "Atrial Amplitude"
    pub field: String,
    /// Human-readable reason including the allowed range or step
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

fn check_range(
    name: &str,
    value: f64,
    lo: f64,
    hi: f64,
    step: Option<f64>,
) -> Result<(), ValidationError> {
    if value < lo || value > hi {
        return Err(ValidationError {
            field: name.to_string(),
            reason: format!("{} must be between {} and {}.", name, lo, hi),
        });
    }
    if let Some(step) = step {
        let k = ((value - lo) / step).round();
        if (lo + k * step - value).abs() > STEP_TOLERANCE {
            return Err(ValidationError {
                field: name.to_string(),
                reason: format!("{} must change in steps of {}.", name, step),
            });
        }
    }
    Ok(())
}

/// Validate a parameter record against the programmable ranges.
///
/// Rate-adaptive fields (MSR, reaction/recovery time, response factor) are
/// only checked when the mode is rate-adaptive. The `extra` bag is never
/// validated.
pub fn validate_parameters(p: &PacingParameters) -> Result<(), ValidationError> {
    check_range("Lower Rate Limit", p.lower_rate_limit, 30.0, 175.0, Some(5.0))?;
    check_range("Upper Rate Limit", p.upper_rate_limit, 50.0, 175.0, Some(5.0))?;

    if p.upper_rate_limit <= p.lower_rate_limit {
        return Err(ValidationError {
            field: "Upper Rate Limit".to_string(),
            reason: "Upper Rate Limit must be greater than Lower Rate Limit.".to_string(),
        });
    }

    check_range("Atrial Amplitude", p.atrial_amplitude, 0.5, 7.0, Some(0.5))?;
    check_range(
        "Ventricular Amplitude",
        p.ventricular_amplitude,
        0.5,
        7.0,
        Some(0.5),
    )?;

    check_range("Atrial Pulse Width", p.atrial_pulse_width, 0.05, 1.9, Some(0.05))?;
    check_range(
        "Ventricular Pulse Width",
        p.ventricular_pulse_width,
        0.05,
        1.9,
        Some(0.05),
    )?;

    check_range("ARP", p.arp, 150.0, 500.0, Some(10.0))?;
    check_range("VRP", p.vrp, 150.0, 500.0, Some(10.0))?;

    check_range("AV Delay", p.av_delay_ms, 0.0, 500.0, Some(10.0))?;
    check_range("Hysteresis Time", p.hysteresis_time_ms, 0.0, 500.0, Some(10.0))?;

    if p.mode.is_rate_adaptive() {
        check_range("Maximum Sensor Rate", p.max_sensor_rate, 50.0, 175.0, Some(5.0))?;
        check_range("Reaction Time", p.reaction_time, 10.0, 50.0, Some(10.0))?;
        check_range("Recovery Time", p.recovery_time, 2.0, 16.0, Some(1.0))?;
        check_range("Response Factor", p.response_factor, 1.0, 16.0, Some(1.0))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PacingMode;

    #[test]
    fn test_default_record_is_valid() {
        assert_eq!(validate_parameters(&PacingParameters::default()), Ok(()));
    }

    #[test]
    fn test_upper_must_exceed_lower() {
        let params = PacingParameters {
            lower_rate_limit: 60.0,
            upper_rate_limit: 50.0,
            ..Default::default()
        };
        let err = validate_parameters(&params).expect_err("should reject");
        assert!(err.reason.contains("greater than Lower Rate Limit"));
    }

    #[test]
    fn test_amplitude_range_violation_names_field() {
        let params = PacingParameters {
            atrial_amplitude: 7.3,
            ..Default::default()
        };
        let err = validate_parameters(&params).expect_err("should reject");
        assert_eq!(err.field, "Atrial Amplitude");
        assert!(err.reason.contains("between 0.5 and 7"));
    }

    #[test]
    fn test_vrp_step_violation() {
        // 255 is inside 150..=500 but not a multiple of 10 from 150
        let params = PacingParameters {
            vrp: 255.0,
            ..Default::default()
        };
        let err = validate_parameters(&params).expect_err("should reject");
        assert_eq!(err.field, "VRP");
        assert!(err.reason.contains("steps of 10"));
    }

    #[test]
    fn test_step_check_tolerates_roundoff() {
        // 0.35 = 0.05 + 6 * 0.05 with binary roundoff
        let params = PacingParameters {
            atrial_pulse_width: 0.35,
            ..Default::default()
        };
        assert_eq!(validate_parameters(&params), Ok(()));
    }

    #[test]
    fn test_rate_adaptive_fields_skipped_for_non_adaptive_mode() {
        let params = PacingParameters {
            mode: PacingMode::Vvi,
            reaction_time: 999.0,
            ..Default::default()
        };
        assert_eq!(validate_parameters(&params), Ok(()));
    }

    #[test]
    fn test_rate_adaptive_fields_checked_for_adaptive_mode() {
        let params = PacingParameters {
            mode: PacingMode::Vvir,
            reaction_time: 999.0,
            ..Default::default()
        };
        let err = validate_parameters(&params).expect_err("should reject");
        assert_eq!(err.field, "Reaction Time");
    }

    #[test]
    fn test_short_circuits_on_first_violation() {
        // Both LRL and VRP invalid; the LRL violation is reported
        let params = PacingParameters {
            lower_rate_limit: 10.0,
            vrp: 255.0,
            ..Default::default()
        };
        let err = validate_parameters(&params).expect_err("should reject");
        assert_eq!(err.field, "Lower Rate Limit");
    }
}

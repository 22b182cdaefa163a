// src/params.rs
//
// Programmable pacemaker parameters and the pacing mode table.
// Records are created by the DCM forms and persisted per user+mode as JSON;
// this crate only encodes and validates them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pacing mode. Wire codes are 1-indexed to match the Simulink model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PacingMode {
    Aoo,
    Voo,
    Aai,
    Vvi,
    Aoor,
    Voor,
    Aair,
    Vvir,
    Dddr,
}

impl PacingMode {
    /// Mode byte for the parameter frame.
    pub fn to_byte(self) -> u8 {
        match self {
            PacingMode::Aoo => 1,
            PacingMode::Voo => 2,
            PacingMode::Aai => 3,
            PacingMode::Vvi => 4,
            PacingMode::Aoor => 5,
            PacingMode::Voor => 6,
            PacingMode::Aair => 7,
            PacingMode::Vvir => 8,
            PacingMode::Dddr => 9,
        }
    }

    /// Decode a mode byte. Unknown codes return `None` so a decode can report
    /// the raw code instead of failing the whole frame.
    pub fn from_byte(code: u8) -> Option<Self> {
        match code {
            1 => Some(PacingMode::Aoo),
            2 => Some(PacingMode::Voo),
            3 => Some(PacingMode::Aai),
            4 => Some(PacingMode::Vvi),
            5 => Some(PacingMode::Aoor),
            6 => Some(PacingMode::Voor),
            7 => Some(PacingMode::Aair),
            8 => Some(PacingMode::Vvir),
            9 => Some(PacingMode::Dddr),
            _ => None,
        }
    }

    /// Rate-adaptive modes respond to the activity sensor; sensor-related
    /// fields are only validated for these.
    pub fn is_rate_adaptive(self) -> bool {
        matches!(
            self,
            PacingMode::Aoor | PacingMode::Voor | PacingMode::Aair | PacingMode::Vvir
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PacingMode::Aoo => "AOO",
            PacingMode::Voo => "VOO",
            PacingMode::Aai => "AAI",
            PacingMode::Vvi => "VVI",
            PacingMode::Aoor => "AOOR",
            PacingMode::Voor => "VOOR",
            PacingMode::Aair => "AAIR",
            PacingMode::Vvir => "VVIR",
            PacingMode::Dddr => "DDDR",
        }
    }
}

impl Default for PacingMode {
    fn default() -> Self {
        PacingMode::Aoo
    }
}

/// The full programmable parameter record sent to the pacemaker.
///
/// Numeric fields are `f64` so form input passes through unchanged; the codec
/// truncates and masks each field to its wire width.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PacingParameters {
    pub mode: PacingMode,

    /// Lower rate limit (bpm)
    pub lower_rate_limit: f64,
    /// Upper rate limit (bpm). Not part of the frame but validated against LRL.
    pub upper_rate_limit: f64,
    /// Maximum sensor rate (bpm), rate-adaptive modes only
    pub max_sensor_rate: f64,

    /// Atrial amplitude (V)
    pub atrial_amplitude: f64,
    /// Atrial pulse width (ms)
    pub atrial_pulse_width: f64,
    /// Ventricular amplitude (V)
    pub ventricular_amplitude: f64,
    /// Ventricular pulse width (ms)
    pub ventricular_pulse_width: f64,

    /// Atrial refractory period (ms)
    pub arp: f64,
    /// Ventricular refractory period (ms)
    pub vrp: f64,

    /// Hysteresis time (ms)
    pub hysteresis_time_ms: f64,
    /// AV delay (ms)
    pub av_delay_ms: f64,

    /// Reaction time (s), rate-adaptive modes only
    pub reaction_time: f64,
    /// Recovery time (min), rate-adaptive modes only
    pub recovery_time: f64,
    /// Response factor (unitless), rate-adaptive modes only
    pub response_factor: f64,

    /// Forward-compatibility bag for fields not yet modeled. Excluded from
    /// the frame layout and from validation.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, f64>,
}

impl Default for PacingParameters {
    fn default() -> Self {
        Self {
            mode: PacingMode::Aoo,
            lower_rate_limit: 60.0,
            upper_rate_limit: 120.0,
            max_sensor_rate: 120.0,
            atrial_amplitude: 3.5,
            atrial_pulse_width: 1.0,
            ventricular_amplitude: 3.5,
            ventricular_pulse_width: 1.0,
            arp: 250.0,
            vrp: 320.0,
            hysteresis_time_ms: 0.0,
            av_delay_ms: 0.0,
            reaction_time: 30.0,
            recovery_time: 5.0,
            response_factor: 8.0,
            extra: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_byte_round_trip() {
        for code in 1u8..=9 {
            let mode = PacingMode::from_byte(code).expect("known code");
            assert_eq!(mode.to_byte(), code);
        }
        assert_eq!(PacingMode::from_byte(0), None);
        assert_eq!(PacingMode::from_byte(10), None);
    }

    #[test]
    fn test_rate_adaptive_modes() {
        assert!(PacingMode::Vvir.is_rate_adaptive());
        assert!(PacingMode::Aoor.is_rate_adaptive());
        assert!(!PacingMode::Vvi.is_rate_adaptive());
        assert!(!PacingMode::Dddr.is_rate_adaptive());
    }

    #[test]
    fn test_serde_round_trip_with_extra() {
        let mut params = PacingParameters::default();
        params.mode = PacingMode::Vvir;
        params.extra.insert("activity_threshold".to_string(), 2.5);

        let json = serde_json::to_string(&params).expect("serialize");
        assert!(json.contains("\"VVIR\""));
        let back: PacingParameters = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, params);
    }

    #[test]
    fn test_extra_bag_defaults_empty() {
        let json = r#"{"mode":"AOO","lower_rate_limit":60.0,"upper_rate_limit":120.0,
            "max_sensor_rate":120.0,"atrial_amplitude":3.5,"atrial_pulse_width":1.0,
            "ventricular_amplitude":3.5,"ventricular_pulse_width":1.0,"arp":250.0,
            "vrp":320.0,"hysteresis_time_ms":0.0,"av_delay_ms":0.0,"reaction_time":30.0,
            "recovery_time":5.0,"response_factor":8.0}"#;
        let params: PacingParameters = serde_json::from_str(json).expect("deserialize");
        assert!(params.extra.is_empty());
    }
}

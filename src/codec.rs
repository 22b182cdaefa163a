// src/codec.rs
//
// Parameter frame codec.
//
// Frame format (31 bytes, little-endian numeric fields):
//   [0x01][0x00][Mode][LRL][MSR][AAmp-f32][VAmp-f32][APW-f32][VPW-f32]
//   [VRP-u16][ARP-u16][Hyst][AVDelay-u16][Reaction][ResponseFactor][Recovery]
//
// Encoding is total: every numeric field is truncated toward zero and masked
// to its wire width, so any record produces a valid 31-byte frame. Decoding
// only rejects buffers that are not exactly 31 bytes.

use serde::Serialize;

use crate::error::LinkError;
use crate::params::{PacingMode, PacingParameters};

/// Parameter frame constants
pub mod constants {
    /// Status byte, always 1 for a SET_PARAM frame
    pub const HEADER_BYTE_1: u8 = 0x01;
    /// Second header byte, always 0
    pub const HEADER_BYTE_2: u8 = 0x00;
    /// Exact parameter frame length
    pub const FRAME_LEN: usize = 31;
}

/// Truncate toward zero and mask to 8 bits. Defined for any input, including
/// negative and non-finite values (`as i64` saturates, NaN becomes 0).
fn u8_field(value: f64) -> u8 {
    (value as i64 & 0xFF) as u8
}

/// Truncate toward zero and mask to 16 bits.
fn u16_field(value: f64) -> u16 {
    (value as i64 & 0xFFFF) as u16
}

/// Encode a parameter record into a 31-byte frame.
pub fn encode_parameters(p: &PacingParameters) -> Vec<u8> {
    use constants::*;

    let mut b = Vec::with_capacity(FRAME_LEN);

    b.push(HEADER_BYTE_1);
    b.push(HEADER_BYTE_2);

    // Mode and rates
    b.push(p.mode.to_byte());
    b.push(u8_field(p.lower_rate_limit));
    b.push(u8_field(p.max_sensor_rate));

    // Amplitudes and pulse widths
    b.extend_from_slice(&(p.atrial_amplitude as f32).to_le_bytes());
    b.extend_from_slice(&(p.ventricular_amplitude as f32).to_le_bytes());
    b.extend_from_slice(&(p.atrial_pulse_width as f32).to_le_bytes());
    b.extend_from_slice(&(p.ventricular_pulse_width as f32).to_le_bytes());

    // 16-bit timings
    b.extend_from_slice(&u16_field(p.vrp).to_le_bytes());
    b.extend_from_slice(&u16_field(p.arp).to_le_bytes());

    // Hysteresis and AV delay
    b.push(u8_field(p.hysteresis_time_ms));
    b.extend_from_slice(&u16_field(p.av_delay_ms).to_le_bytes());

    // Rate adaptive
    b.push(u8_field(p.reaction_time));
    b.push(u8_field(p.response_factor));
    b.push(u8_field(p.recovery_time));

    debug_assert_eq!(b.len(), FRAME_LEN);
    b
}

/// Field table decoded from a parameter frame, for diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct DecodedFrame {
    /// Raw mode byte from the wire
    pub mode_code: u8,
    /// Decoded mode, `None` for unknown codes
    pub mode: Option<PacingMode>,
    pub lower_rate_limit: u8,
    pub max_sensor_rate: u8,
    pub atrial_amplitude: f32,
    pub ventricular_amplitude: f32,
    pub atrial_pulse_width: f32,
    pub ventricular_pulse_width: f32,
    pub vrp: u16,
    pub arp: u16,
    pub hysteresis_time_ms: u8,
    pub av_delay_ms: u16,
    pub reaction_time: u8,
    pub response_factor: u8,
    pub recovery_time: u8,
}

impl DecodedFrame {
    /// Mode name for display, e.g. "VVIR" or "UNKNOWN(12)".
    pub fn mode_name(&self) -> String {
        match self.mode {
            Some(m) => m.as_str().to_string(),
            None => format!("UNKNOWN({})", self.mode_code),
        }
    }

    /// Multi-line field breakdown for the monitor/transmit logs.
    pub fn breakdown(&self) -> String {
        format!(
            "  mode = {} ({})\n  LRL = {}\n  MSR = {}\n  AAmp = {}\n  VAmp = {}\n  \
             APW = {}\n  VPW = {}\n  VRP = {}\n  ARP = {}\n  Hysteresis = {}\n  \
             AV Delay = {}\n  Reaction = {}\n  ResponseFactor = {}\n  Recovery = {}",
            self.mode_name(),
            self.mode_code,
            self.lower_rate_limit,
            self.max_sensor_rate,
            self.atrial_amplitude,
            self.ventricular_amplitude,
            self.atrial_pulse_width,
            self.ventricular_pulse_width,
            self.vrp,
            self.arp,
            self.hysteresis_time_ms,
            self.av_delay_ms,
            self.reaction_time,
            self.response_factor,
            self.recovery_time,
        )
    }
}

fn f32_at(frame: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes(frame[offset..offset + 4].try_into().unwrap_or([0; 4]))
}

fn u16_at(frame: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(frame[offset..offset + 2].try_into().unwrap_or([0; 2]))
}

/// Decode a parameter frame into its field table.
///
/// Fails only on a wrong-length buffer. Unknown mode codes and out-of-range
/// numeric content decode to whatever bytes are present.
pub fn decode_frame(frame: &[u8]) -> Result<DecodedFrame, LinkError> {
    use constants::*;

    if frame.len() != FRAME_LEN {
        return Err(LinkError::frame_length(frame.len()));
    }

    let mode_code = frame[2];

    Ok(DecodedFrame {
        mode_code,
        mode: PacingMode::from_byte(mode_code),
        lower_rate_limit: frame[3],
        max_sensor_rate: frame[4],
        atrial_amplitude: f32_at(frame, 5),
        ventricular_amplitude: f32_at(frame, 9),
        atrial_pulse_width: f32_at(frame, 13),
        ventricular_pulse_width: f32_at(frame, 17),
        vrp: u16_at(frame, 21),
        arp: u16_at(frame, 23),
        hysteresis_time_ms: frame[25],
        av_delay_ms: u16_at(frame, 26),
        reaction_time: frame[28],
        response_factor: frame[29],
        recovery_time: frame[30],
    })
}

/// Whether a received buffer looks like a parameter frame: exact length and
/// both header bytes matching.
pub fn is_parameter_frame(data: &[u8]) -> bool {
    use constants::*;
    data.len() == FRAME_LEN && data[0] == HEADER_BYTE_1 && data[1] == HEADER_BYTE_2
}

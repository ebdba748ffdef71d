//! Per-attribute value codecs.
//!
//! Each characteristic binds its wire bytes to a backend value through one
//! of these codecs. Validation happens here, before any backend call; a
//! failed decode maps to a [`Fault`] and leaves attribute state untouched.

use crate::fault::Fault;

/// Fan state as reported and accepted by the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanState {
    On,
    Off,
    Unknown,
}

impl FanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FanState::On => "ON",
            FanState::Off => "OFF",
            FanState::Unknown => "UNKNOWN",
        }
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    /// Lower-cased name forwarded to the backend as the command
    pub fn command(&self) -> &'static str {
        match self {
            FanState::On => "on",
            FanState::Off => "off",
            FanState::Unknown => "unknown",
        }
    }

    /// Decode a written payload. Accepts the fixed state set
    /// case-insensitively; anything else is `NotPermitted`.
    pub fn from_bytes(value: &[u8]) -> Result<Self, Fault> {
        let text = std::str::from_utf8(value).map_err(|_| Fault::NotPermitted)?;
        [FanState::On, FanState::Off, FanState::Unknown]
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(text))
            .ok_or(Fault::NotPermitted)
    }
}

/// Encode a backend floating value as 8 native-order bytes
pub fn encode_f64(value: f64) -> [u8; 8] {
    value.to_ne_bytes()
}

/// Decode exactly 8 native-order bytes into a double
pub fn decode_f64(value: &[u8]) -> Result<f64, Fault> {
    let bytes: [u8; 8] = value.try_into().map_err(|_| Fault::InvalidValueLength)?;
    Ok(f64::from_ne_bytes(bytes))
}

/// Decode exactly 4 native-order bytes into an integer
pub fn decode_i32(value: &[u8]) -> Result<i32, Fault> {
    let bytes: [u8; 4] = value.try_into().map_err(|_| Fault::InvalidValueLength)?;
    Ok(i32::from_ne_bytes(bytes))
}

/// Decode ASCII decimal digits into a tri-state value (0, 1 or 2)
pub fn decode_tri_state(value: &[u8]) -> Result<u8, Fault> {
    let text = std::str::from_utf8(value).map_err(|_| Fault::NotPermitted)?;
    match text.parse::<i64>() {
        Ok(state @ 0..=2) => Ok(state as u8),
        _ => Err(Fault::NotPermitted),
    }
}

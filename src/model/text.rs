//! Bounded text fields.
//!
//! Descriptions, time-of-day strings, and PID notes live in fixed-capacity
//! `heapless::String`s so a device's footprint is known once it is loaded.
//! Over-long input is truncated at the last char boundary that fits; it is
//! never rejected.

use heapless::String;
use serde::{Deserialize, Deserializer};

/// Relay, sensor, action, and scenario descriptions.
pub const DESCRIPTION_CAP: usize = 119;
/// `HH:MM:SS` or `HH:MM`.
pub const TIME_CAP: usize = 9;
/// Long-form PID profile notes.
pub const DETAIL_CAP: usize = 511;

pub type Description = String<DESCRIPTION_CAP>;
pub type TimeText = String<TIME_CAP>;
pub type DetailText = String<DETAIL_CAP>;

/// Copy `s` into a bounded string, truncating at a char boundary.
pub fn bounded<const N: usize>(s: &str) -> String<N> {
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::new();
    // Cannot overflow: `end <= N`.
    let _ = out.push_str(&s[..end]);
    out
}

/// Serde helper: accept any string and truncate it to the field's capacity.
pub fn truncating<'de, D, const N: usize>(deserializer: D) -> Result<String<N>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = std::string::String::deserialize(deserializer)?;
    Ok(bounded(&raw))
}

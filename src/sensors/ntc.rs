//! NTC thermistor and raw analog conversions.
//!
//! The thermistor sits in a voltage divider with the sensor's series
//! resistor and is read through the 12-bit ADC.  The reading is first
//! scaled to the 10-bit range the divider formula was calibrated for, then
//! converted with the simplified Beta (Steinhart-Hart) equation.

use crate::model::sensor::NO_READING;

const ADC_MAX: u32 = 4095;
const SCALED_MAX: u32 = 1023;
const T25_K: f32 = 298.15;

/// Thermistor calibration for one probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NtcParams {
    /// Fixed divider resistor (ohms).
    pub series_ohms: f32,
    /// Thermistor resistance at 25 °C (ohms).
    pub nominal_ohms: f32,
    pub beta: f32,
    /// Added to the computed temperature.
    pub offset_c: f32,
}

/// 12-bit ADC sample to °C.  Returns [`NO_READING`] when the divider is
/// open or shorted.
pub fn celsius(adc: u16, params: &NtcParams) -> f32 {
    let scaled = u32::from(adc).min(ADC_MAX) * SCALED_MAX / ADC_MAX;
    if scaled == 0 || scaled >= SCALED_MAX || params.nominal_ohms <= 0.0 || params.beta == 0.0 {
        return NO_READING;
    }
    let resistance = params.series_ohms / (SCALED_MAX as f32 / scaled as f32 - 1.0);
    let inv_t = (resistance / params.nominal_ohms).ln() / params.beta + 1.0 / T25_K;
    if inv_t <= 0.0 {
        return NO_READING;
    }
    1.0 / inv_t - 273.15 + params.offset_c
}

/// 12-bit ADC sample to the 0–255 range reported for analog sensors.
pub fn analog_level(adc: u16) -> f32 {
    (u32::from(adc).min(ADC_MAX) * 255 / ADC_MAX) as f32
}

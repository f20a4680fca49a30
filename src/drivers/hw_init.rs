//! Raw peripheral access by GPIO number.
//!
//! Pins are configured lazily as the selected device asks for them, so
//! every helper here takes a plain GPIO number: ADC channels are looked up
//! from the pin, LEDC channels are handed out to PWM pins on first use.
//! Host builds compile the same API as no-ops.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::{info, warn};

// ── Error type ────────────────────────────────────────────────

/// Errors during peripheral configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    /// The pin has no ADC1 channel.
    NotAnalog(u8),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    /// Every LEDC channel is already attached to another pin.
    LedcExhausted,
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::NotAnalog(pin) => write!(f, "GPIO{} has no ADC1 channel", pin),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC config failed (rc={})", rc),
            Self::LedcExhausted => write!(f, "no free LEDC channel"),
        }
    }
}

/// PWM carrier for relay outputs.
pub const PWM_FREQ_HZ: u32 = 1_000;
/// LEDC channels available in low-speed mode.
pub const LEDC_CHANNELS: usize = 8;

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
pub fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot, before the
    // control loop starts.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }
    info!("hw_init: ADC1 unit ready");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ADC init skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
fn adc1_channel(pin: u8) -> Result<adc_channel_t, HwInitError> {
    let mut unit: adc_unit_t = 0;
    let mut channel: adc_channel_t = 0;
    // SAFETY: pure lookup in the SoC's IO→channel table.
    let ret = unsafe { adc_oneshot_io_to_channel(i32::from(pin), &mut unit, &mut channel) };
    if ret != ESP_OK as i32 || unit != adc_unit_t_ADC_UNIT_1 {
        return Err(HwInitError::NotAnalog(pin));
    }
    Ok(channel)
}

/// Attach `pin` to its ADC1 channel (12 bit, full-scale attenuation).
#[cfg(target_os = "espidf")]
pub fn adc_config_pin(pin: u8) -> Result<(), HwInitError> {
    let channel = adc1_channel(pin)?;
    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    // SAFETY: handle initialised by init_adc(); main-loop access only.
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_config_pin(_pin: u8) -> Result<(), HwInitError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc_read(pin: u8) -> u16 {
    let Ok(channel) = adc1_channel(pin) else {
        return 0;
    };
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract — single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.clamp(0, 4095) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_read(_pin: u8) -> u16 {
    0
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn gpio_configure(pin: u8, mode: gpio_mode_t, pull_up: bool) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config only touches the pins in the mask.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_config_output(pin: u8, level: bool) -> Result<(), HwInitError> {
    // Input+output so the driven level can be read back.
    gpio_configure(pin, gpio_mode_t_GPIO_MODE_INPUT_OUTPUT, false)?;
    gpio_write(pin, level);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_config_output(_pin: u8, _level: bool) -> Result<(), HwInitError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_config_input(pin: u8, pull_up: bool) -> Result<(), HwInitError> {
    gpio_configure(pin, gpio_mode_t_GPIO_MODE_INPUT, pull_up)
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_config_input(_pin: u8, _pull_up: bool) -> Result<(), HwInitError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: u8) -> bool {
    // SAFETY: read-only register access on a configured pin.
    (unsafe { gpio_get_level(i32::from(pin)) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: u8) -> bool {
    true
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: u8, high: bool) {
    // SAFETY: writes the output latch of a configured pin; main loop only.
    unsafe {
        gpio_set_level(i32::from(pin), u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: u8, _high: bool) {}

/// Switch a configured pin between output and input at runtime (DHT
/// single-wire handshake).
#[cfg(target_os = "espidf")]
pub fn gpio_set_output(pin: u8, output: bool) {
    let mode = if output {
        gpio_mode_t_GPIO_MODE_OUTPUT
    } else {
        gpio_mode_t_GPIO_MODE_INPUT
    };
    // SAFETY: direction change of a pin the caller owns.
    unsafe {
        gpio_set_direction(i32::from(pin), mode);
    }
}

// ── LEDC PWM ─────────────────────────────────────────────────

/// GPIO attached to each LEDC channel.
#[cfg(target_os = "espidf")]
static mut LEDC_PINS: [Option<u8>; LEDC_CHANNELS] = [None; LEDC_CHANNELS];

#[cfg(target_os = "espidf")]
pub fn init_ledc() -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: called once from main() before the control loop.
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }
    info!("hw_init: LEDC timer 0 at {} Hz, 8 bit", PWM_FREQ_HZ);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_ledc() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): LEDC init skipped");
    Ok(())
}

/// LEDC channel driving `pin`, attaching a free one on first use.
#[cfg(target_os = "espidf")]
fn ledc_channel_for(pin: u8) -> Result<u32, HwInitError> {
    // SAFETY: LEDC_PINS is only touched from the main loop.
    let table = unsafe { &mut *(&raw mut LEDC_PINS) };
    if let Some(ch) = table.iter().position(|p| *p == Some(pin)) {
        return Ok(ch as u32);
    }
    let ch = table
        .iter()
        .position(Option::is_none)
        .ok_or(HwInitError::LedcExhausted)?;
    // SAFETY: channel config for a pin the device owns.
    let ret = unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: ch as u32,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: i32::from(pin),
            duty: 0,
            hpoint: 0,
            ..Default::default()
        })
    };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }
    table[ch] = Some(pin);
    info!("hw_init: GPIO{} on LEDC channel {}", pin, ch);
    Ok(ch as u32)
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(pin: u8, duty: u8) {
    let channel = match ledc_channel_for(pin) {
        Ok(ch) => ch,
        Err(e) => {
            warn!("hw_init: PWM on GPIO{}: {}", pin, e);
            return;
        }
    };
    // SAFETY: channel configured above; duty register writes are
    // main-loop only.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty));
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_pin: u8, _duty: u8) {}

/// Release the LEDC channel of `pin` so it can be driven as plain GPIO
/// again.
#[cfg(target_os = "espidf")]
pub fn ledc_detach(pin: u8) {
    // SAFETY: main-loop only.
    let table = unsafe { &mut *(&raw mut LEDC_PINS) };
    if let Some(ch) = table.iter().position(|p| *p == Some(pin)) {
        // SAFETY: stops a channel we configured.
        unsafe {
            ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, ch as u32, 0);
        }
        table[ch] = None;
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_detach(_pin: u8) {}

/// Bring up the shared peripherals.  Pins themselves are configured by
/// the pin setup pass of the selected device.
pub fn init_peripherals() -> Result<(), HwInitError> {
    init_adc()?;
    init_ledc()?;
    Ok(())
}

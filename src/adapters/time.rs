//! Clock adapter.
//!
//! - Monotonic time: `esp_timer_get_time()` on target, `std::time::Instant`
//!   on host.
//! - Wall clock: explicitly re-synchronised by whoever owns network time
//!   (SNTP callback, web UI, chat bot).  Between syncs it advances with
//!   the monotonic clock.  On target, a system clock already set by SNTP
//!   is used until the first explicit sync.

use chrono::{NaiveDateTime, TimeDelta};
use log::info;

use crate::app::ports::ClockPort;

/// Milliseconds since boot (monotonic).
#[cfg(target_os = "espidf")]
pub fn uptime_ms() -> u64 {
    // SAFETY: reads the free-running system timer.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
}

/// Milliseconds since the first call (monotonic).
#[cfg(not(target_os = "espidf"))]
pub fn uptime_ms() -> u64 {
    use std::sync::OnceLock;
    static START: OnceLock<std::time::Instant> = OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed().as_millis() as u64
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    local: NaiveDateTime,
    at_ms: u64,
}

#[derive(Debug, Default)]
pub struct SystemClock {
    anchor: Option<Anchor>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the local date and time.
    pub fn resync(&mut self, local: NaiveDateTime) {
        let at_ms = uptime_ms();
        info!("Clock: wall clock set to {}", local);
        self.anchor = Some(Anchor { local, at_ms });
    }

    pub fn is_synced(&self) -> bool {
        self.anchor.is_some() || system_local_time().is_some()
    }

    fn anchored(anchor: Anchor, now_ms: u64) -> Option<NaiveDateTime> {
        let elapsed = TimeDelta::try_milliseconds(now_ms.saturating_sub(anchor.at_ms) as i64)?;
        anchor.local.checked_add_signed(elapsed)
    }
}

impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        uptime_ms()
    }

    fn wall_clock(&self) -> Option<NaiveDateTime> {
        match self.anchor {
            Some(anchor) => Self::anchored(anchor, uptime_ms()),
            None => system_local_time(),
        }
    }
}

/// Local time from the C library clock, if SNTP has set it.
#[cfg(target_os = "espidf")]
fn system_local_time() -> Option<NaiveDateTime> {
    use esp_idf_svc::sys::{gettimeofday, localtime_r, time_t, timeval, tm};

    let mut tv = timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    // SAFETY: plain libc call with a valid out pointer.
    if unsafe { gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
        return None;
    }
    // Anything before 2020-01-01 means the clock was never set.
    const EPOCH_2020: i64 = 1_577_836_800;
    if (tv.tv_sec as i64) < EPOCH_2020 {
        return None;
    }
    let secs = tv.tv_sec as time_t;
    // SAFETY: `tm` is plain old data.
    let mut t: tm = unsafe { core::mem::zeroed() };
    // SAFETY: both pointers are valid for the call.
    if unsafe { localtime_r(&secs, &mut t) }.is_null() {
        return None;
    }
    chrono::NaiveDate::from_ymd_opt(t.tm_year + 1900, (t.tm_mon + 1) as u32, t.tm_mday as u32)?
        .and_hms_opt(t.tm_hour as u32, t.tm_min as u32, t.tm_sec as u32)
}

#[cfg(not(target_os = "espidf"))]
fn system_local_time() -> Option<NaiveDateTime> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn unsynced_clock_has_no_wall_time() {
        let clock = SystemClock::new();
        assert!(!clock.is_synced());
        assert!(clock.wall_clock().is_none());
    }

    #[test]
    fn anchor_advances_with_monotonic_time() {
        let anchor = Anchor {
            local: noon(),
            at_ms: 1_000,
        };
        let later = SystemClock::anchored(anchor, 61_000).unwrap();
        assert_eq!(later, noon() + TimeDelta::minutes(1));
    }

    #[test]
    fn resync_sets_wall_time() {
        let mut clock = SystemClock::new();
        clock.resync(noon());
        let now = clock.wall_clock().unwrap();
        assert!(now >= noon() && now < noon() + TimeDelta::seconds(5));
    }

    #[test]
    fn monotonic_time_never_goes_back() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}

//! OSC time tags.
//!
//! OSC time is a 64-bit fixed point number, 32 integer bits of seconds since
//! 1900-01-01 followed by 32 fractional bits. The runtime schedules in "elapsed"
//! seconds, counted from some process-local zero. A [`TimeBase`] ties the two together.

use serde::{Deserialize, Serialize};

/// Number of OSC ticks in one second.
pub const SECONDS_TO_OSC: f64 = 4_294_967_296.0;
/// Inverse of [`SECONDS_TO_OSC`].
pub const OSC_TO_SECONDS: f64 = 1.0 / SECONDS_TO_OSC;

/// Reserved time tag meaning "execute immediately".
pub const IMMEDIATE: u64 = 1;

/// Seconds between the OSC/NTP epoch (1900) and the Unix epoch (1970).
pub const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// Converts plain seconds (already on the OSC epoch) to a time tag.
///
/// Negative and NaN inputs saturate to `0`.
#[inline(always)]
pub fn seconds_to_osc(secs: f64) -> u64 {
    (secs * SECONDS_TO_OSC) as u64
}

/// Converts a time tag to plain seconds on the OSC epoch.
#[inline(always)]
pub fn osc_to_seconds(osc: u64) -> f64 {
    osc as f64 * OSC_TO_SECONDS
}

/// Anchors the runtime's elapsed-time clock to OSC time.
///
/// `origin_secs` is the OSC time, in seconds, at which elapsed time was zero.
/// Both directions of the conversion use the same anchor and scale, so
/// `osc_time_to_elapsed(elapsed_time_to_osc(t))` is within one tick (`2^-32` s) of `t`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct TimeBase {
    origin_secs: f64,
}

impl TimeBase {
    /// Elapsed time zero sits at the OSC epoch itself.
    pub const EPOCH: Self = Self::new(0.);

    #[inline(always)]
    pub const fn new(origin_secs: f64) -> Self {
        Self { origin_secs }
    }

    /// Anchors elapsed-time zero at the given number of seconds since the Unix epoch.
    #[inline(always)]
    pub fn from_unix_secs(unix_secs: f64) -> Self {
        Self::new(unix_secs + NTP_UNIX_OFFSET_SECS as f64)
    }

    #[inline(always)]
    pub const fn origin_secs(&self) -> f64 {
        self.origin_secs
    }

    #[inline(always)]
    pub fn elapsed_time_to_osc(&self, elapsed: f64) -> u64 {
        seconds_to_osc(elapsed + self.origin_secs)
    }

    #[inline(always)]
    pub fn osc_time_to_elapsed(&self, osc: u64) -> f64 {
        osc_to_seconds(osc) - self.origin_secs
    }
}

//! Small shared primitives for the OSC bridge: the elapsed-time clock and the
//! shared control array exchanged with an in-process synthesis engine.

pub mod controls;

pub use controls::{ControlsError, SharedControls};

use scosc_proto::time::TimeBase;

/// The runtime's elapsed-time clock, anchored to OSC time.
///
/// Elapsed time starts at zero when the clock is created. The attached [`TimeBase`]
/// records the OSC time of that instant, so elapsed times and bundle time tags convert
/// into each other.
///
/// ```ignore
/// let clock = ElapsedClock::new();
///
/// // a bundle due half a second from now
/// let tag = clock.time_base().elapsed_time_to_osc(clock.elapsed() + 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct ElapsedClock {
    start: std::time::Instant,
    time_base: TimeBase,
}

impl Default for ElapsedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ElapsedClock {
    /// Starts a clock at the current instant, anchored to the system wall clock.
    pub fn new() -> Self {
        let unix_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_else(|e| {
                log::warn!("system clock is before the Unix epoch: {e}");
                0.
            });

        Self::with_time_base(TimeBase::from_unix_secs(unix_secs))
    }

    /// Starts a clock at the current instant with an explicit anchor.
    #[inline(always)]
    pub fn with_time_base(time_base: TimeBase) -> Self {
        Self {
            start: std::time::Instant::now(),
            time_base,
        }
    }

    #[inline(always)]
    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Seconds since the clock started.
    #[inline(always)]
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

//! The slave's disciplined virtual clock. Never reads the host wall clock after
//! construction — every subsequent `now()` is derived from a monotonic instant.

use crate::traits::ClockSource;
use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

struct Inner {
    anchor_wall: f64,
    anchor_mono: Instant,
    rate_adjustment: f64,
}

/// `now() = anchor_wall + elapsed_since(anchor_mono) * (1 + rate_adjustment)`.
///
/// `set_time_offset` steps by moving `anchor_wall` (a jump is the only permitted
/// discontinuity). `set_rate_adjustment` folds the elapsed interval into
/// `anchor_wall` and resets `anchor_mono` before installing the new rate, so the
/// rate change itself never produces a jump — only future drift changes.
pub struct SoftwareClock {
    inner: Mutex<Inner>,
    max_rate: f64,
}

impl SoftwareClock {
    pub fn new(max_rate: f64) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        SoftwareClock {
            inner: Mutex::new(Inner {
                anchor_wall: now,
                anchor_mono: Instant::now(),
                rate_adjustment: 0.0,
            }),
            max_rate,
        }
    }

    pub fn rate_adjustment(&self) -> f64 {
        self.inner.lock().unwrap().rate_adjustment
    }
}

impl ClockSource for SoftwareClock {
    fn now(&self) -> f64 {
        let inner = self.inner.lock().unwrap();
        inner.anchor_wall + inner.anchor_mono.elapsed().as_secs_f64() * (1.0 + inner.rate_adjustment)
    }

    fn set_rate_adjustment(&self, rate: f64) {
        let clamped = rate.clamp(-self.max_rate, self.max_rate);
        let mut inner = self.inner.lock().unwrap();
        let current =
            inner.anchor_wall + inner.anchor_mono.elapsed().as_secs_f64() * (1.0 + inner.rate_adjustment);
        inner.anchor_wall = current;
        inner.anchor_mono = Instant::now();
        inner.rate_adjustment = clamped;
    }

    fn set_time_offset(&self, delta: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.anchor_wall += delta;
    }
}

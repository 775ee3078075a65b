//! The master's reference timeline: a monotonic clock anchored to a settable
//! wall-clock epoch, with an accumulating manual offset on top.

use chrono::{Local, NaiveDateTime, TimeZone};
use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

struct Inner {
    init_system_time: f64,
    init_perf_counter: Instant,
    time_offset: f64,
}

/// `current_master_time = init_system_time + elapsed_mono + time_offset`.
/// `set_reference_time` rebases the first two fields and zeros the offset;
/// `adjust_reference_time` only ever accumulates into the offset.
pub struct MasterTimeSource {
    inner: Mutex<Inner>,
}

impl MasterTimeSource {
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        MasterTimeSource {
            inner: Mutex::new(Inner {
                init_system_time: now,
                init_perf_counter: Instant::now(),
                time_offset: 0.0,
            }),
        }
    }

    /// Seconds since the UNIX epoch, per the current reference and offset.
    pub fn now(&self) -> f64 {
        let inner = self.inner.lock().unwrap();
        inner.init_system_time + inner.init_perf_counter.elapsed().as_secs_f64() + inner.time_offset
    }

    /// Rebases the reference to `time_str` (`YYYY-MM-DD HH:MM:SS`, local time) and
    /// zeros the accumulated offset. Returns `false` on an unparseable or
    /// ambiguous (DST-fold) timestamp, leaving the source untouched.
    pub fn set_reference_time(&self, time_str: &str) -> bool {
        let parsed = match NaiveDateTime::parse_from_str(time_str, "%Y-%m-%d %H:%M:%S") {
            Ok(v) => v,
            Err(_) => return false,
        };
        let local = match Local.from_local_datetime(&parsed).single() {
            Some(v) => v,
            None => return false,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.init_system_time =
            local.timestamp() as f64 + local.timestamp_subsec_nanos() as f64 / 1e9;
        inner.init_perf_counter = Instant::now();
        inner.time_offset = 0.0;
        true
    }

    /// Accumulates `delta` seconds into the offset and returns the resulting
    /// `now()`. Never touches the reference epoch.
    pub fn adjust_reference_time(&self, delta: f64) -> f64 {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.time_offset += delta;
        }
        self.now()
    }

    /// Formats `now()` with a strftime-style `pattern`.
    pub fn format(&self, pattern: &str) -> String {
        let secs = self.now();
        let whole = secs.floor() as i64;
        let nanos = ((secs - whole as f64) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
        let dt = Local
            .timestamp_opt(whole, nanos)
            .single()
            .unwrap_or_else(|| Local.timestamp_opt(whole, 0).single().expect("valid timestamp"));
        dt.format(pattern).to_string()
    }
}

impl Default for MasterTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

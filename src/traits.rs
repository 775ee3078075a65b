//! Seams the sync controller is generic over, so it can be driven by a mock clock
//! and a mock exchanger in tests instead of real sockets and real time.

use crate::error::ExchangeError;
use crate::sample::Sample;

#[cfg_attr(test, mockall::automock)]
pub trait ClockSource: Send {
    fn now(&self) -> f64;
    fn set_rate_adjustment(&self, rate: f64);
    fn set_time_offset(&self, delta: f64);
}

#[cfg_attr(test, mockall::automock)]
pub trait Exchanger: Send {
    /// Runs one request/reply exchange for `sequence` and derives a [`Sample`].
    fn exchange(&mut self, sequence: u16) -> Result<Sample, ExchangeError>;
}

impl<T: ClockSource + ?Sized> ClockSource for std::sync::Arc<T> {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn set_rate_adjustment(&self, rate: f64) {
        (**self).set_rate_adjustment(rate)
    }

    fn set_time_offset(&self, delta: f64) {
        (**self).set_time_offset(delta)
    }
}
//! Offset-to-rate PID controller. Tuned in seconds and rate-fraction units (a
//! rate of `1.0` means "run the clock at twice real speed").

use crate::config::SyncConfig;

pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    integral: f64,
    last_error: f64,
    last_time: Option<f64>,
    integral_limit: f64,
    max_rate: f64,
    large_offset_reset: f64,
}

impl PidController {
    pub fn new(config: &SyncConfig) -> Self {
        PidController {
            kp: config.pid_kp,
            ki: config.pid_ki,
            kd: config.pid_kd,
            integral: 0.0,
            last_error: 0.0,
            last_time: None,
            integral_limit: config.pid_integral_limit,
            max_rate: config.max_rate_adjustment,
            large_offset_reset: config.pid_large_offset_reset,
        }
    }

    /// Clears accumulated state. Called after a step, so the next `update` does
    /// not see a stale `dt` or carry integral windup across the discontinuity.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_time = None;
    }

    /// `error` is the measured offset (seconds), `t` is the slave clock's
    /// current `now()`. Returns a rate adjustment clamped to `[-max_rate,
    /// max_rate]`.
    pub fn update(&mut self, error: f64, t: f64) -> f64 {
        let dt = match self.last_time {
            None => {
                self.last_time = Some(t);
                self.last_error = error;
                return (self.kp * error).clamp(-self.max_rate, self.max_rate);
            }
            Some(last) => t - last,
        };

        if error.abs() > self.large_offset_reset {
            self.integral = 0.0;
        }

        if dt > 0.0 {
            self.integral = (self.integral + error * dt).clamp(-self.integral_limit, self.integral_limit);
        }

        let derivative = if dt > 0.0 { (error - self.last_error) / dt } else { 0.0 };

        self.last_error = error;
        self.last_time = Some(t);

        (self.kp * error + self.ki * self.integral + self.kd * derivative)
            .clamp(-self.max_rate, self.max_rate)
    }
}

//! Drives the periodic sync cycle: runs a round of exchanges, picks the best
//! sample, disciplines the clock, and walks the sync state machine.
//!
//! State transitions (round completion unless noted):
//!
//! | From           | Condition                              | To             |
//! |----------------|-----------------------------------------|----------------|
//! | Idle           | `start()`                                | Syncing        |
//! | any            | `offset` >= `large_offset_threshold`     | LargeOffset    |
//! | any            | `offset` <= `sync_threshold`              | Synced         |
//! | any            | otherwise, round succeeded                | Syncing        |
//! | any            | 3 consecutive empty rounds                | Error          |
//! | Error          | `master_offline_timeout` since last reply | MasterOffline  |
//! | MasterOffline  | round succeeds                            | Syncing        |
//!
//! An offset of exactly `large_offset_threshold` is treated as large (ties go
//! to the step branch).

use crate::config::SyncConfig;
use crate::sample::{select_best, Sample};
use crate::slave::monitor::{SyncMonitor, SyncObserver};
use crate::slave::pid::PidController;
use crate::status::{SyncState, SyncStatus};
use crate::traits::{ClockSource, Exchanger};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

const CONSECUTIVE_FAILURES_TO_ERROR: u32 = 3;
const SLEEP_QUANTUM: Duration = Duration::from_millis(100);

pub struct SyncController<E: Exchanger, C: ClockSource> {
    exchanger: E,
    clock: C,
    pid: PidController,
    monitor: SyncMonitor,
    status: Arc<RwLock<SyncStatus>>,
    config: SyncConfig,
    state: SyncState,
    sequence: u16,
    consecutive_failures: u32,
    last_reply_at: Option<Instant>,
    last_rate: f64,
    started_at: Instant,
    stop: Arc<AtomicBool>,
}

impl<E: Exchanger, C: ClockSource> SyncController<E, C> {
    pub fn new(
        exchanger: E,
        clock: C,
        config: SyncConfig,
        status: Arc<RwLock<SyncStatus>>,
    ) -> Self {
        let pid = PidController::new(&config);
        let monitor = SyncMonitor::new(1000);
        SyncController {
            exchanger,
            clock,
            pid,
            monitor,
            status,
            config,
            state: SyncState::Idle,
            sequence: 0,
            consecutive_failures: 0,
            last_reply_at: None,
            last_rate: 0.0,
            started_at: Instant::now(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn SyncObserver>) -> usize {
        self.monitor.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: usize) {
        self.monitor.unsubscribe(id);
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// A clone of the stop flag, so a `ctrlc` handler (or a test) can cancel
    /// `run()` from another thread.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn start(&mut self) {
        if self.state == SyncState::Idle {
            self.started_at = Instant::now();
            self.transition(SyncState::Syncing);
        }
    }

    /// Runs rounds back to back, sleeping between them, until `stop()` is
    /// called. Never panics: every exchange failure becomes a monitor event.
    pub fn run(&mut self) {
        self.start();
        while !self.stop.load(Ordering::SeqCst) {
            self.run_round();
            self.sleep_until_next_cycle();
        }
    }

    /// Runs a single round of up to `rounds_per_sync` sequential exchanges and
    /// applies its outcome. Exposed directly so tests can drive the state
    /// machine without waiting on real sleeps.
    pub fn run_round(&mut self) {
        let mut successes = Vec::with_capacity(self.config.rounds_per_sync);
        for _ in 0..self.config.rounds_per_sync {
            let sequence = self.next_sequence();
            match self.exchanger.exchange(sequence) {
                Ok(sample) => successes.push(sample),
                Err(e) => debug!("exchange {} failed: {}", sequence, e),
            }
        }

        if successes.is_empty() {
            self.on_round_empty();
        } else {
            self.on_round_success(&successes);
        }

        self.update_shared_status();
    }

    fn next_sequence(&mut self) -> u16 {
        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        seq
    }

    fn on_round_empty(&mut self) {
        self.consecutive_failures += 1;
        warn!(
            "round failed: all {} exchanges were lost or timed out ({} consecutive)",
            self.config.rounds_per_sync, self.consecutive_failures
        );
        self.monitor.record_error("round_empty", "every exchange in the round failed");

        if self.consecutive_failures >= CONSECUTIVE_FAILURES_TO_ERROR && self.state != SyncState::MasterOffline {
            self.transition(SyncState::Error);
        }

        if self.state == SyncState::Error {
            let since_last_reply = match self.last_reply_at {
                Some(t) => t.elapsed(),
                None => self.started_at.elapsed(),
            };
            if since_last_reply.as_secs_f64() >= self.config.master_offline_timeout {
                self.transition(SyncState::MasterOffline);
            }
        }
    }

    fn on_round_success(&mut self, successes: &[Sample]) {
        let best = select_best(successes).expect("successes is non-empty");
        self.consecutive_failures = 0;
        self.last_reply_at = Some(Instant::now());

        let prev_state = self.state;
        let abs_offset = best.offset.abs();

        let mut new_state = if abs_offset >= self.config.large_offset_threshold {
            info!("offset {:+.6}s exceeds the large-offset threshold, stepping clock", best.offset);
            self.clock.set_time_offset(best.offset);
            self.pid.reset();
            self.clock.set_rate_adjustment(0.0);
            self.last_rate = 0.0;
            SyncState::LargeOffset
        } else {
            let rate = self.pid.update(best.offset, self.clock.now());
            self.clock.set_rate_adjustment(rate);
            self.last_rate = rate;
            if abs_offset <= self.config.sync_threshold {
                SyncState::Synced
            } else {
                SyncState::Syncing
            }
        };

        if prev_state == SyncState::MasterOffline {
            new_state = SyncState::Syncing;
        }

        self.monitor.record_sample(self.clock.now(), best.offset, best.delay);
        self.transition(new_state);
    }

    fn transition(&mut self, new_state: SyncState) {
        if new_state != self.state {
            let old = self.state;
            self.state = new_state;
            info!("sync state {:?} -> {:?}", old, new_state);
            self.monitor.record_state_change(old, new_state);
        }
    }

    fn update_shared_status(&self) {
        let mut status = self.status.write().unwrap();
        status.state = self.state;
        status.rate_adjustment = self.last_rate;
        status.consecutive_failures = self.consecutive_failures;
        if let Some((_, offset, delay)) = self.monitor.history().last() {
            status.offset = *offset;
            status.delay = *delay;
        }
        status.last_reply_at = self.last_reply_at.map(|_| self.clock.now());
    }

    fn sleep_until_next_cycle(&self) {
        let interval = Duration::from_secs_f64(self.config.sync_interval.max(0.0));
        let mut slept = Duration::ZERO;
        while slept < interval {
            if self.stop.load(Ordering::SeqCst) {
                return;
            }
            let chunk = SLEEP_QUANTUM.min(interval - slept);
            thread::sleep(chunk);
            slept += chunk;
        }
    }
}

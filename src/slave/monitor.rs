//! Bounded history of sync samples plus synchronous observer dispatch. The
//! controller owns a monitor; the monitor never references the controller back.

use crate::status::SyncState;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub enum SyncEvent {
    Sample { timestamp: f64, offset: f64, delay: f64 },
    StateChange { old: SyncState, new: SyncState },
    Error { kind: String, detail: String },
}

pub trait SyncObserver: Send {
    fn notify(&self, event: &SyncEvent);
}

pub struct SyncMonitor {
    history: VecDeque<(f64, f64, f64)>,
    capacity: usize,
    observers: Vec<Option<Box<dyn SyncObserver>>>,
}

impl SyncMonitor {
    pub fn new(capacity: usize) -> Self {
        SyncMonitor {
            history: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            observers: Vec::new(),
        }
    }

    /// Returns a handle usable with [`SyncMonitor::unsubscribe`].
    pub fn subscribe(&mut self, observer: Box<dyn SyncObserver>) -> usize {
        self.observers.push(Some(observer));
        self.observers.len() - 1
    }

    pub fn unsubscribe(&mut self, id: usize) {
        if let Some(slot) = self.observers.get_mut(id) {
            *slot = None;
        }
    }

    /// Records a sample in the oldest-first ring and dispatches a `Sample` event.
    pub fn record_sample(&mut self, timestamp: f64, offset: f64, delay: f64) {
        if self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back((timestamp, offset, delay));
        self.dispatch(&SyncEvent::Sample { timestamp, offset, delay });
    }

    pub fn record_state_change(&mut self, old: SyncState, new: SyncState) {
        self.dispatch(&SyncEvent::StateChange { old, new });
    }

    pub fn record_error(&mut self, kind: &str, detail: &str) {
        self.dispatch(&SyncEvent::Error { kind: kind.to_string(), detail: detail.to_string() });
    }

    /// Snapshot of the history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &(f64, f64, f64)> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    fn dispatch(&self, event: &SyncEvent) {
        for observer in self.observers.iter().flatten() {
            observer.notify(event);
        }
    }
}

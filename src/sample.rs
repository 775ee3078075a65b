//! A single four-timestamp exchange and the best-of-round selection rule.

/// The four timestamps of one request/reply exchange, plus the derived offset and
/// delay. Immutable once constructed — there are no setters, only [`Sample::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub t1: f64,
    pub t2: f64,
    pub t3: f64,
    pub t4: f64,
    pub offset: f64,
    pub delay: f64,
}

impl Sample {
    /// Derives `offset` and `delay` from the four raw timestamps. `delay` is
    /// clamped at zero: clock noise can otherwise produce a negative round trip.
    pub fn new(t1: f64, t2: f64, t3: f64, t4: f64) -> Self {
        let offset = ((t2 - t1) + (t3 - t4)) / 2.0;
        let delay = ((t4 - t1) - (t3 - t2)).max(0.0);
        Sample { t1, t2, t3, t4, offset, delay }
    }
}

/// Picks the sample with the smallest delay out of a round of exchanges. The
/// reported offset is whatever that sample's offset was — it is never recomputed.
pub fn select_best(samples: &[Sample]) -> Option<Sample> {
    samples
        .iter()
        .copied()
        .min_by(|a, b| a.delay.partial_cmp(&b.delay).unwrap_or(std::cmp::Ordering::Equal))
}

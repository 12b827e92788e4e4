//! Progress reporting primitives.

use parking_lot::Mutex;

/// Sender for reporting progress to the caller.
///
/// Wraps a callback that receives a progress percentage (0.0 -- 100.0) and a
/// human-readable step description.
pub struct ProgressSender {
    callback: Box<dyn Fn(f32, &str) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(f32, &str) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_, _| {}),
        }
    }

    /// Report progress.
    pub fn send(&self, progress: f32, step: &str) {
        (self.callback)(progress, step);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// Maps a native completion fraction (0..1) into a fixed sub-range of the
/// overall percentage, reserving the points outside the range for other
/// phases.
///
/// Output is clamped to `[0, 100]` and never decreases, even if the
/// underlying fraction jumps backwards.
pub struct ProgressMapper {
    lo: f32,
    hi: f32,
    last: Mutex<f32>,
}

impl ProgressMapper {
    /// Create a mapper targeting the `[lo, hi]` percentage sub-range.
    pub fn new(lo: f32, hi: f32) -> Self {
        let lo = lo.clamp(0.0, 100.0);
        let hi = hi.clamp(lo, 100.0);
        Self {
            lo,
            hi,
            last: Mutex::new(lo),
        }
    }

    /// Map a 0..1 fraction into the sub-range.
    pub fn map(&self, fraction: f32) -> f32 {
        let fraction = fraction.clamp(0.0, 1.0);
        let value = self.lo + fraction * (self.hi - self.lo);
        let mut last = self.last.lock();
        if value > *last {
            *last = value;
        }
        *last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_into_subrange() {
        let mapper = ProgressMapper::new(10.0, 95.0);
        assert_eq!(mapper.map(0.0), 10.0);
        assert_eq!(mapper.map(1.0), 95.0);
    }

    #[test]
    fn never_decreases() {
        let mapper = ProgressMapper::new(10.0, 95.0);
        let a = mapper.map(0.5);
        let b = mapper.map(0.2);
        let c = mapper.map(0.9);
        assert!(a <= b || b == a, "went backwards: {a} -> {b}");
        assert_eq!(b, a);
        assert!(c > b);
    }

    #[test]
    fn out_of_range_fractions_are_clamped() {
        let mapper = ProgressMapper::new(0.0, 100.0);
        assert_eq!(mapper.map(-1.0), 0.0);
        assert_eq!(mapper.map(2.0), 100.0);
    }

    #[test]
    fn degenerate_range_is_tolerated() {
        let mapper = ProgressMapper::new(120.0, 40.0);
        // lo clamps to 100, hi clamps up to lo.
        assert_eq!(mapper.map(0.5), 100.0);
    }

    #[test]
    fn sender_invokes_callback() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sender = ProgressSender::new(move |pct, step| {
            seen_clone.lock().push((pct, step.to_string()));
        });
        sender.send(42.0, "working");
        assert_eq!(seen.lock().as_slice(), &[(42.0, "working".to_string())]);
    }
}

//! Windowed latency accumulation.
//!
//! Two independent `(sum, count)` windows, one for request handling and one
//! for pizza creation. Both live behind a single mutex so that the
//! read-then-reset in [`LatencyAccumulator::drain_averages`] is one critical
//! section: a sample lands in exactly one window.

use parking_lot::Mutex;

/// Running sum and count for one latency category.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Window {
    sum_ms: f64,
    count: u64,
}

impl Window {
    fn record(&mut self, ms: f64) {
        self.sum_ms += ms;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_ms / self.count as f64
        }
    }
}

#[derive(Debug, Default)]
struct Windows {
    endpoint: Window,
    domain: Window,
}

/// Means of both categories for one completed window.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LatencyAverages {
    /// Mean request-handling latency in milliseconds.
    pub endpoint_ms: f64,
    /// Mean pizza-creation latency in milliseconds.
    pub pizza_creation_ms: f64,
    /// Request-handling samples in the window.
    pub endpoint_samples: u64,
    /// Pizza-creation samples in the window.
    pub pizza_creation_samples: u64,
}

/// Accumulates latency samples between export ticks.
#[derive(Debug, Default)]
pub struct LatencyAccumulator {
    windows: Mutex<Windows>,
}

impl LatencyAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request-handling latency sample.
    pub fn record_endpoint_latency(&self, ms: f64) {
        self.windows.lock().endpoint.record(ms);
    }

    /// Record a domain-operation (pizza creation) latency sample.
    pub fn record_domain_latency(&self, ms: f64) {
        self.windows.lock().domain.record(ms);
    }

    /// Return the mean of each category and reset both windows.
    ///
    /// A category with no samples reports `0.0`. Call this once per export
    /// cycle; calling it more often shortens the next window.
    pub fn drain_averages(&self) -> LatencyAverages {
        let drained = std::mem::take(&mut *self.windows.lock());
        LatencyAverages {
            endpoint_ms: drained.endpoint.mean(),
            pizza_creation_ms: drained.domain.mean(),
            endpoint_samples: drained.endpoint.count,
            pizza_creation_samples: drained.domain.count,
        }
    }

    /// Number of samples in the open window, per category.
    pub fn pending(&self) -> (u64, u64) {
        let windows = self.windows.lock();
        (windows.endpoint.count, windows.domain.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_drain_empty() {
        let acc = LatencyAccumulator::new();
        let avg = acc.drain_averages();
        assert_eq!(avg.endpoint_ms, 0.0);
        assert_eq!(avg.pizza_creation_ms, 0.0);
        assert!(!avg.endpoint_ms.is_nan());
    }

    #[test]
    fn test_mean_then_consumed() {
        let acc = LatencyAccumulator::new();
        acc.record_endpoint_latency(10.0);
        acc.record_endpoint_latency(20.0);
        acc.record_endpoint_latency(30.0);

        let avg = acc.drain_averages();
        assert_eq!(avg.endpoint_ms, 20.0);
        assert_eq!(avg.pizza_creation_ms, 0.0);

        let avg = acc.drain_averages();
        assert_eq!(avg.endpoint_ms, 0.0);
    }

    #[test]
    fn test_categories_independent() {
        let acc = LatencyAccumulator::new();
        acc.record_endpoint_latency(4.0);
        acc.record_domain_latency(100.0);
        acc.record_domain_latency(300.0);

        assert_eq!(acc.pending(), (1, 2));

        let avg = acc.drain_averages();
        assert_eq!(avg.endpoint_ms, 4.0);
        assert_eq!(avg.pizza_creation_ms, 200.0);
        assert_eq!(acc.pending(), (0, 0));
    }

    #[test]
    fn test_concurrent_record_and_drain_loses_nothing() {
        let acc = Arc::new(LatencyAccumulator::new());
        let writers = 4;
        let per_writer = 5_000u64;

        let handles: Vec<_> = (0..writers)
            .map(|_| {
                let acc = Arc::clone(&acc);
                thread::spawn(move || {
                    for _ in 0..per_writer {
                        acc.record_endpoint_latency(1.0);
                    }
                })
            })
            .collect();

        let mut drained = 0;
        for _ in 0..50 {
            let avg = acc.drain_averages();
            assert!(avg.endpoint_samples == 0 || avg.endpoint_ms == 1.0);
            drained += avg.endpoint_samples;
        }

        for handle in handles {
            handle.join().unwrap();
        }
        drained += acc.drain_averages().endpoint_samples;
        assert_eq!(drained, writers * per_writer);
    }
}

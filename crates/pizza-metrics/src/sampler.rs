//! Host CPU and memory sampling.
//!
//! CPU utilization is the share of wall-clock time the process spent on CPU
//! (user + system) since the previous sample. Memory utilization is an
//! instantaneous read of used versus total host memory, where used excludes
//! reclaimable page cache.
//!
//! Introspection failures never propagate: the sampler logs and reports `0.0`.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::warn;

use crate::hub::SystemUsage;

/// Host memory at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReading {
    /// Total physical memory in bytes.
    pub total_bytes: u64,
    /// Memory available to new allocations without swapping, in bytes.
    /// Includes reclaimable page cache.
    pub available_bytes: u64,
}

/// Source of raw host readings.
pub trait HostProbe: Send {
    /// Cumulative user + system CPU time consumed by this process.
    fn process_cpu_time(&mut self) -> Option<Duration>;

    /// Current host memory reading.
    fn memory(&mut self) -> Option<MemoryReading>;
}

/// [`HostProbe`] backed by `sysinfo`.
pub struct SysinfoProbe {
    system: System,
    pid: Option<Pid>,
}

impl SysinfoProbe {
    /// Create a probe for the current process.
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SysinfoProbe {
    fn process_cpu_time(&mut self) -> Option<Duration> {
        let pid = self.pid?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu(),
        );
        self.system
            .process(pid)
            .map(|process| Duration::from_millis(process.accumulated_cpu_time()))
    }

    fn memory(&mut self) -> Option<MemoryReading> {
        self.system.refresh_memory();
        let total_bytes = self.system.total_memory();
        if total_bytes == 0 {
            return None;
        }
        Some(MemoryReading {
            total_bytes,
            available_bytes: self.system.available_memory(),
        })
    }
}

/// Reference point for the next CPU delta.
#[derive(Debug, Clone, Copy)]
struct CpuBaseline {
    cpu_time: Duration,
    at: Instant,
}

struct SamplerState {
    probe: Box<dyn HostProbe>,
    baseline: Option<CpuBaseline>,
}

/// Computes CPU and memory percentages from a [`HostProbe`].
pub struct SystemSampler {
    state: Mutex<SamplerState>,
}

impl SystemSampler {
    /// Create a sampler over the given probe.
    pub fn new(probe: impl HostProbe + 'static) -> Self {
        Self {
            state: Mutex::new(SamplerState {
                probe: Box::new(probe),
                baseline: None,
            }),
        }
    }

    /// Create a sampler reading the real host through `sysinfo`.
    pub fn host() -> Self {
        Self::new(SysinfoProbe::new())
    }

    /// CPU utilization since the previous sample, rounded to a whole percent.
    ///
    /// The first call only establishes the baseline and reports `0.0`.
    pub fn sample_cpu_percentage(&self) -> f64 {
        self.sample_cpu_percentage_at(Instant::now())
    }

    /// [`sample_cpu_percentage`](Self::sample_cpu_percentage) against an
    /// explicit wall-clock reading.
    pub fn sample_cpu_percentage_at(&self, now: Instant) -> f64 {
        self.cpu_percentage_at(now).unwrap_or_else(|| {
            warn!("process CPU time unavailable, reporting 0%");
            0.0
        })
    }

    /// Used share of host memory, rounded to one decimal place.
    pub fn sample_memory_percentage(&self) -> f64 {
        self.memory_percentage().unwrap_or_else(|| {
            warn!("host memory reading unavailable, reporting 0%");
            0.0
        })
    }

    /// Sample CPU and memory together, warning at most once.
    pub fn sample(&self) -> SystemUsage {
        self.sample_at(Instant::now())
    }

    /// [`sample`](Self::sample) against an explicit wall-clock reading.
    pub fn sample_at(&self, now: Instant) -> SystemUsage {
        let cpu = self.cpu_percentage_at(now);
        let memory = self.memory_percentage();
        if cpu.is_none() || memory.is_none() {
            warn!(
                cpu_available = cpu.is_some(),
                memory_available = memory.is_some(),
                "host introspection unavailable, reporting 0%"
            );
        }
        SystemUsage {
            cpu_percentage: cpu.unwrap_or(0.0),
            memory_percentage: memory.unwrap_or(0.0),
        }
    }

    // `None` only when the probe fails; a cold start is `Some(0.0)`.
    fn cpu_percentage_at(&self, now: Instant) -> Option<f64> {
        let mut state = self.state.lock();
        let cpu_time = state.probe.process_cpu_time()?;

        let previous = state.baseline.replace(CpuBaseline { cpu_time, at: now });
        let Some(previous) = previous else {
            return Some(0.0);
        };

        let wall = now.saturating_duration_since(previous.at);
        if wall.is_zero() {
            return Some(0.0);
        }
        let busy = cpu_time.saturating_sub(previous.cpu_time);
        Some((100.0 * busy.as_secs_f64() / wall.as_secs_f64()).round())
    }

    fn memory_percentage(&self) -> Option<f64> {
        let reading = self.state.lock().probe.memory()?;
        if reading.total_bytes == 0 {
            return None;
        }
        let used = reading.total_bytes.saturating_sub(reading.available_bytes) as f64;
        let percentage = 100.0 * used / reading.total_bytes as f64;
        Some((percentage * 10.0).round() / 10.0)
    }
}

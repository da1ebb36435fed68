//! Buffer pool statistics tracking.

use std::fmt;

/// Running counters owned by one buffer pool.
///
/// The pool bumps these as it serves requests; callers read them through
/// [`BufferPoolStats::snapshot`] and clear them with
/// [`BufferPoolStats::reset`], e.g. around one join run.
///
/// # Example
/// ```
/// use heapstore::BufferPoolStats;
///
/// let mut stats = BufferPoolStats::new();
/// stats.record_request(true);
/// stats.record_request(false);
/// assert_eq!(stats.snapshot().pin_misses(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct BufferPoolStats {
    /// Calls to `pin_page`, hits and misses alike.
    pin_requests: u64,

    /// Pin requests served by an already-resident page.
    pin_hits: u64,

    /// Dirty pages written back (eviction or flush).
    dirty_writes: u64,

    /// Resident pages pushed out to make room for another.
    evictions: u64,

    /// Pages read from the disk store.
    pages_read: u64,
}

impl BufferPoolStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one pin request.
    pub fn record_request(&mut self, hit: bool) {
        self.pin_requests += 1;
        if hit {
            self.pin_hits += 1;
        }
    }

    pub fn record_dirty_write(&mut self) {
        self.dirty_writes += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_read(&mut self) {
        self.pages_read += 1;
    }

    /// Get a copy of the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pin_requests: self.pin_requests,
            pin_hits: self.pin_hits,
            dirty_writes: self.dirty_writes,
            evictions: self.evictions,
            pages_read: self.pages_read,
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A point-in-time copy of buffer pool statistics.
///
/// `Display` renders the multi-line report printed after a workload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub pin_requests: u64,
    pub pin_hits: u64,
    pub dirty_writes: u64,
    pub evictions: u64,
    pub pages_read: u64,
}

impl StatsSnapshot {
    /// Pin requests that had to load or initialize a frame.
    pub fn pin_misses(&self) -> u64 {
        self.pin_requests - self.pin_hits
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        if self.pin_requests == 0 {
            0.0
        } else {
            self.pin_hits as f64 / self.pin_requests as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Buffer pool statistics")?;
        writeln!(f, "  dirty pages written:  {}", self.dirty_writes)?;
        writeln!(f, "  pin requests:         {}", self.pin_requests)?;
        writeln!(f, "  pin misses:           {}", self.pin_misses())?;
        write!(f, "  hit rate:             {:.2}%", self.hit_rate() * 100.0)
    }
}

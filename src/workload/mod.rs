//! # Workload Drivers
//!
//! Three benchmark-equivalent drivers feed the simulator the way the
//! classic filesystem benchmarks would:
//!
//! - [`bonnie`]: sequential write passes followed by a sequential read
//!   sweep
//! - [`postmark`]: prefill, unmeasured warm-up, then measured random
//!   mixed reads and writes at a configured write ratio
//! - [`tiotech`]: per-thread striped regions with partial overlap,
//!   interleaved round-robin (threads are logical stripes, not OS
//!   threads)
//!
//! All drivers issue one event at a time with a fixed arrival gap of
//! 1.0 µs and collect latencies into a [`WorkloadReport`].

pub mod bonnie;
pub mod postmark;
pub mod tiotech;

use std::io::{self, Write};

/// Fixed gap between consecutive event arrivals, in microseconds.
pub const ARRIVAL_GAP_US: f64 = 1.0;

/// Latency and throughput accounting for one measured phase.
#[derive(Debug, Default, Clone)]
pub struct WorkloadReport {
    pub reads: u64,
    pub writes: u64,
    pub sum_read_latency: f64,
    pub sum_write_latency: f64,
    /// Latest completion timestamp observed (arrival + latency).
    pub end_time: f64,
}

impl WorkloadReport {
    pub fn record_read(&mut self, now: f64, latency: f64) {
        self.reads += 1;
        self.sum_read_latency += latency;
        self.end_time = self.end_time.max(now + latency);
    }

    pub fn record_write(&mut self, now: f64, latency: f64) {
        self.writes += 1;
        self.sum_write_latency += latency;
        self.end_time = self.end_time.max(now + latency);
    }

    /// Track a completion without counting it (prefill/warm-up phases).
    pub fn observe(&mut self, now: f64, latency: f64) {
        self.end_time = self.end_time.max(now + latency);
    }

    pub fn avg_read_latency(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.sum_read_latency / self.reads as f64
        }
    }

    pub fn avg_write_latency(&self) -> f64 {
        if self.writes == 0 {
            0.0
        } else {
            self.sum_write_latency / self.writes as f64
        }
    }

    pub fn avg_response_time(&self) -> f64 {
        let ops = self.reads + self.writes;
        if ops == 0 {
            0.0
        } else {
            (self.sum_read_latency + self.sum_write_latency) / ops as f64
        }
    }

    /// Throughput over the measured ops, based on the simulated end time.
    pub fn throughput_mbps(&self, page_size: usize) -> f64 {
        if self.end_time <= 0.0 {
            return 0.0;
        }
        let total_bytes = (self.reads + self.writes) as f64 * page_size as f64;
        (total_bytes / (1024.0 * 1024.0)) / (self.end_time / 1e6)
    }

    /// Write the result block the drivers print at the end of a run.
    pub fn print(&self, title: &str, page_size: usize, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "==== {} ====", title)?;
        if self.writes > 0 {
            writeln!(out, "Avg write latency: {:.2} us", self.avg_write_latency())?;
        }
        if self.reads > 0 {
            writeln!(out, "Avg read latency : {:.2} us", self.avg_read_latency())?;
        }
        writeln!(out, "Avg response time: {:.2} us", self.avg_response_time())?;
        writeln!(out, "Measured ops: R={} W={}", self.reads, self.writes)?;
        writeln!(
            out,
            "Sim end time: {:.2} us ({:.6} s)",
            self.end_time,
            self.end_time / 1e6
        )?;
        writeln!(
            out,
            "Throughput  : {:.2} MB/s",
            self.throughput_mbps(page_size)
        )?;
        Ok(())
    }
}

/// Pages covered by a dataset of `dataset_mb` megabytes, capped to the
/// addressable range so oversized requests degrade instead of erroring.
pub(crate) fn dataset_pages(dataset_mb: u64, page_size: usize, addressable_pages: u64) -> u64 {
    let pages = dataset_mb * 1024 * 1024 / page_size as u64;
    pages.clamp(1, addressable_pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_handle_empty_phases() {
        let report = WorkloadReport::default();

        assert_eq!(report.avg_read_latency(), 0.0);
        assert_eq!(report.avg_write_latency(), 0.0);
        assert_eq!(report.avg_response_time(), 0.0);
        assert_eq!(report.throughput_mbps(2048), 0.0);
    }

    #[test]
    fn records_accumulate_and_track_end_time() {
        let mut report = WorkloadReport::default();

        report.record_write(0.0, 200.0);
        report.record_read(1.0, 30.0);
        report.record_read(250.0, 40.0);

        assert_eq!(report.writes, 1);
        assert_eq!(report.reads, 2);
        assert_eq!(report.avg_read_latency(), 35.0);
        assert_eq!(report.end_time, 290.0);
    }

    #[test]
    fn dataset_pages_is_capped_to_the_addressable_range() {
        assert_eq!(dataset_pages(1, 2048, 10_000), 512);
        assert_eq!(dataset_pages(1024, 2048, 10_000), 10_000);
        assert_eq!(dataset_pages(0, 2048, 10_000), 1);
    }
}

//! Tiobench-equivalent interleaved workload: the dataset is divided
//! into per-thread regions that overlap by half a stride, and the
//! threads take turns issuing one random op each. Threads here are
//! logical stripes; the event stream stays totally ordered with the
//! fixed arrival gap.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::controller::Ssd;
use crate::error::Result;
use crate::event::EventKind;

use super::{dataset_pages, WorkloadReport, ARRIVAL_GAP_US};

/// Fraction of a thread's stride shared with its neighbor. Half overlap
/// mimics the cross-thread contention a real filesystem shows.
const OVERLAP_RATIO: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct TiotechOptions {
    pub threads: u32,
    pub dataset_mb: u64,
    pub write_ratio: f64,
    /// Measured rounds = region pages times this.
    pub ops_multiplier: u64,
    /// Warm-up rounds = region pages times this.
    pub warmup_multiplier: u64,
    pub seed: u64,
}

impl Default for TiotechOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            dataset_mb: 200,
            write_ratio: 0.5,
            ops_multiplier: 20,
            warmup_multiplier: 2,
            seed: 1,
        }
    }
}

pub fn run(ssd: &mut Ssd, options: &TiotechOptions) -> Result<WorkloadReport> {
    let threads = options.threads.max(1);
    let total_pages = dataset_pages(
        options.dataset_mb,
        ssd.config().page_size,
        ssd.config().addressable_pages(),
    );
    let write_ratio = options.write_ratio.clamp(0.0, 1.0);
    let region_pages = (total_pages / threads as u64).max(1);
    let warmup_rounds = region_pages * options.warmup_multiplier;
    let measured_rounds = region_pages * options.ops_multiplier.max(1);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut report = WorkloadReport::default();
    let mut now = 0.0;

    // Prefill the whole dataset so random reads are valid.
    for lpn in 0..total_pages {
        let latency = ssd.event_arrive(EventKind::Write, lpn, 1, now)?;
        report.observe(now, latency);
        now += ARRIVAL_GAP_US;
    }

    let stride = (region_pages as f64 * (1.0 - OVERLAP_RATIO)).max(1.0);
    let pick_lpn = |thread: u32, rng: &mut StdRng| -> u64 {
        let start = (thread as f64 * stride) as u64 % total_pages;
        let local = rng.gen_range(0..region_pages);
        (start + local) % total_pages
    };

    for _ in 0..warmup_rounds {
        for thread in 0..threads {
            let lpn = pick_lpn(thread, &mut rng);
            let kind = if rng.gen::<f64>() < write_ratio {
                EventKind::Write
            } else {
                EventKind::Read
            };
            let latency = ssd.event_arrive(kind, lpn, 1, now)?;
            report.observe(now, latency);
            now += ARRIVAL_GAP_US;
        }
    }

    let mut measured = WorkloadReport::default();
    for _ in 0..measured_rounds {
        for thread in 0..threads {
            let lpn = pick_lpn(thread, &mut rng);
            if rng.gen::<f64>() < write_ratio {
                let latency = ssd.event_arrive(EventKind::Write, lpn, 1, now)?;
                measured.record_write(now, latency);
            } else {
                let latency = ssd.event_arrive(EventKind::Read, lpn, 1, now)?;
                measured.record_read(now, latency);
            }
            now += ARRIVAL_GAP_US;
        }
    }

    Ok(measured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn small_options() -> TiotechOptions {
        TiotechOptions {
            threads: 4,
            dataset_mb: 1,
            write_ratio: 0.5,
            ops_multiplier: 2,
            warmup_multiplier: 1,
            seed: 3,
        }
    }

    #[test]
    fn measured_ops_cover_every_thread() {
        let mut ssd = Ssd::new(SimConfig::default()).unwrap();
        let options = small_options();

        let report = run(&mut ssd, &options).unwrap();

        // region = 512 / 4 = 128 pages; 2x rounds, 4 threads per round.
        assert_eq!(report.reads + report.writes, 128 * 2 * 4);
    }

    #[test]
    fn single_thread_degenerates_to_random_io() {
        let mut ssd = Ssd::new(SimConfig::default()).unwrap();
        let options = TiotechOptions {
            threads: 1,
            ..small_options()
        };

        let report = run(&mut ssd, &options).unwrap();

        assert_eq!(report.reads + report.writes, 512 * 2);
    }

    #[test]
    fn no_reads_miss_after_prefill() {
        let mut ssd = Ssd::new(SimConfig::default()).unwrap();

        run(&mut ssd, &small_options()).unwrap();

        assert_eq!(ssd.stats().noop_reads, 0);
    }
}

//! Postmark-equivalent random mixed workload: sequential prefill so
//! every page exists, an unmeasured warm-up that drives mapping and GC
//! into steady state, then a measured phase of random reads and writes
//! at the configured write ratio.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::controller::Ssd;
use crate::error::Result;
use crate::event::EventKind;

use super::{dataset_pages, WorkloadReport, ARRIVAL_GAP_US};

#[derive(Debug, Clone)]
pub struct PostmarkOptions {
    pub dataset_mb: u64,
    pub write_ratio: f64,
    /// Measured ops = working-set pages times this.
    pub ops_multiplier: u64,
    /// Warm-up ops = working-set pages times this.
    pub warmup_multiplier: u64,
    pub seed: u64,
}

impl Default for PostmarkOptions {
    fn default() -> Self {
        Self {
            dataset_mb: 150,
            write_ratio: 0.5,
            ops_multiplier: 20,
            warmup_multiplier: 2,
            seed: 1,
        }
    }
}

pub fn run(ssd: &mut Ssd, options: &PostmarkOptions) -> Result<WorkloadReport> {
    let working_set = dataset_pages(
        options.dataset_mb,
        ssd.config().page_size,
        ssd.config().addressable_pages(),
    );
    let write_ratio = options.write_ratio.clamp(0.0, 1.0);
    let warmup_ops = working_set * options.warmup_multiplier;
    let measured_ops = working_set * options.ops_multiplier.max(1);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut report = WorkloadReport::default();
    let mut now = 0.0;

    // Prefill: every page written once so random reads hit mapped data.
    for lpn in 0..working_set {
        let latency = ssd.event_arrive(EventKind::Write, lpn, 1, now)?;
        report.observe(now, latency);
        now += ARRIVAL_GAP_US;
    }

    // Warm-up: overwrite steady state, not measured.
    for _ in 0..warmup_ops {
        let lpn = rng.gen_range(0..working_set);
        let kind = if rng.gen::<f64>() < write_ratio {
            EventKind::Write
        } else {
            EventKind::Read
        };
        let latency = ssd.event_arrive(kind, lpn, 1, now)?;
        report.observe(now, latency);
        now += ARRIVAL_GAP_US;
    }

    let mut measured = WorkloadReport::default();
    for _ in 0..measured_ops {
        let lpn = rng.gen_range(0..working_set);
        if rng.gen::<f64>() < write_ratio {
            let latency = ssd.event_arrive(EventKind::Write, lpn, 1, now)?;
            measured.record_write(now, latency);
        } else {
            let latency = ssd.event_arrive(EventKind::Read, lpn, 1, now)?;
            measured.record_read(now, latency);
        }
        now += ARRIVAL_GAP_US;
    }

    Ok(measured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn small_options() -> PostmarkOptions {
        PostmarkOptions {
            dataset_mb: 1,
            write_ratio: 0.5,
            ops_multiplier: 2,
            warmup_multiplier: 1,
            seed: 7,
        }
    }

    #[test]
    fn measured_ops_match_the_multiplier() {
        let mut ssd = Ssd::new(SimConfig::default()).unwrap();
        let options = small_options();

        let report = run(&mut ssd, &options).unwrap();

        assert_eq!(report.reads + report.writes, 1024);
        assert!(report.reads > 0);
        assert!(report.writes > 0);
    }

    #[test]
    fn same_seed_reproduces_the_op_mix() {
        let options = small_options();

        let mut first = Ssd::new(SimConfig::default()).unwrap();
        let mut second = Ssd::new(SimConfig::default()).unwrap();
        let a = run(&mut first, &options).unwrap();
        let b = run(&mut second, &options).unwrap();

        assert_eq!(a.reads, b.reads);
        assert_eq!(a.writes, b.writes);
        assert_eq!(a.sum_write_latency, b.sum_write_latency);
    }

    #[test]
    fn write_ratio_one_never_reads() {
        let mut ssd = Ssd::new(SimConfig::default()).unwrap();
        let options = PostmarkOptions {
            write_ratio: 1.0,
            ..small_options()
        };

        let report = run(&mut ssd, &options).unwrap();

        assert_eq!(report.reads, 0);
    }
}

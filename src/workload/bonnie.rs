//! Bonnie-equivalent sequential benchmark: one or more sequential write
//! passes over the dataset, then a sequential read sweep. Multiple write
//! passes drive the mapping and garbage collector toward steady-state
//! overwrite behavior before the reads are measured.

use crate::controller::Ssd;
use crate::error::Result;
use crate::event::EventKind;

use super::{dataset_pages, WorkloadReport, ARRIVAL_GAP_US};

pub fn run(ssd: &mut Ssd, dataset_mb: u64, write_passes: u32) -> Result<WorkloadReport> {
    let total_pages = dataset_pages(
        dataset_mb,
        ssd.config().page_size,
        ssd.config().addressable_pages(),
    );
    let write_passes = write_passes.max(1);

    let mut report = WorkloadReport::default();
    let mut now = 0.0;

    for _ in 0..write_passes {
        for lpn in 0..total_pages {
            let latency = ssd.event_arrive(EventKind::Write, lpn, 1, now)?;
            report.record_write(now, latency);
            now += ARRIVAL_GAP_US;
        }
    }

    for lpn in 0..total_pages {
        let latency = ssd.event_arrive(EventKind::Read, lpn, 1, now)?;
        report.record_read(now, latency);
        now += ARRIVAL_GAP_US;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn one_pass_writes_then_reads_every_page() {
        let mut ssd = Ssd::new(SimConfig::default()).unwrap();

        let report = run(&mut ssd, 1, 1).unwrap();

        // 1 MB at 2 KB pages.
        assert_eq!(report.writes, 512);
        assert_eq!(report.reads, 512);
        assert_eq!(ssd.stats().noop_reads, 0);
        assert!(report.avg_write_latency() > report.avg_read_latency());
    }

    #[test]
    fn extra_passes_overwrite_in_place() {
        let mut ssd = Ssd::new(SimConfig::default()).unwrap();

        let report = run(&mut ssd, 1, 2).unwrap();

        assert_eq!(report.writes, 1024);
        assert_eq!(
            ssd.controller().ftl().as_mnftl().mapping().mapped_pages(),
            512
        );
    }
}

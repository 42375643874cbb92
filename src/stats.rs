//! # Operation Statistics
//!
//! Counters accumulated across a run: host-facing FTL operations,
//! garbage-collection traffic, and failures. The FTL engine increments
//! fields directly as events pass through; drivers print the summary at
//! the end of a workload.

use std::io::{self, Write};

/// Counter block for one simulator instance.
#[derive(Debug, Default, Clone)]
pub struct Stats {
    /// Host reads dispatched through the FTL.
    pub ftl_reads: u64,
    /// Host writes dispatched through the FTL.
    pub ftl_writes: u64,
    /// Host TRIMs dispatched through the FTL.
    pub ftl_trims: u64,
    /// Block erases requested by the FTL.
    pub ftl_erases: u64,
    /// Page reads issued while relocating valid pages.
    pub gc_reads: u64,
    /// Page writes issued while relocating valid pages.
    pub gc_writes: u64,
    /// Valid pages copied out of GC victims.
    pub valid_page_copies: u64,
    /// Host reads that completed as noops (never-written data).
    pub noop_reads: u64,
    /// Events that returned failure, by kind.
    pub failed_reads: u64,
    pub failed_writes: u64,
    pub failed_trims: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Write the end-of-run summary table.
    pub fn print_summary(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "==== FTL statistics ====")?;
        writeln!(out, "FTL reads        : {}", self.ftl_reads)?;
        writeln!(out, "  noop reads     : {}", self.noop_reads)?;
        writeln!(out, "FTL writes       : {}", self.ftl_writes)?;
        writeln!(out, "FTL trims        : {}", self.ftl_trims)?;
        writeln!(out, "FTL erases       : {}", self.ftl_erases)?;
        writeln!(out, "GC reads         : {}", self.gc_reads)?;
        writeln!(out, "GC writes        : {}", self.gc_writes)?;
        writeln!(out, "valid page copies: {}", self.valid_page_copies)?;
        let failures = self.failed_reads + self.failed_writes + self.failed_trims;
        if failures > 0 {
            writeln!(
                out,
                "failures         : {} (r={} w={} t={})",
                failures, self.failed_reads, self.failed_writes, self.failed_trims
            )?;
        }
        Ok(())
    }
}

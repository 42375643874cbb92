//! # Controller and SSD Facade
//!
//! The [`Controller`] wires the subsystems together (device model,
//! block pool, FTL engine, counters) and dispatches arriving host
//! events by kind. [`Ssd`] is the public face the drivers talk to: it
//! builds the event record, runs it through the controller, and hands
//! back the accumulated latency.
//!
//! ## Event Flow
//!
//! ```text
//! driver ──> Ssd::event_arrive ──> Controller::event_arrive
//!                                        │
//!                                        ▼
//!                                   Ftl (dispatch)
//!                                   mapping lookup / update
//!                                        │
//!                                        ▼
//!                                   Nand::issue (latency)
//!                                        │
//!                                        ▼
//!                          latency returned to the driver
//! ```
//!
//! Failures are reflected in the per-kind failure counters and
//! propagated to the driver unchanged; the core never retries.

use crate::block_manager::BlockManager;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::event::{Event, EventKind};
use crate::ftl::{Ftl, Mnftl};
use crate::nand::Nand;
use crate::stats::Stats;

/// Owns the simulator subsystems and routes events between them.
#[derive(Debug)]
pub struct Controller {
    nand: Nand,
    block_manager: BlockManager,
    ftl: Ftl,
    stats: Stats,
}

impl Controller {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            nand: Nand::new(config),
            block_manager: BlockManager::new(config),
            ftl: Ftl::Mnftl(Mnftl::new(config)),
            stats: Stats::new(),
        }
    }

    /// Dispatch one host event through the FTL. Erase and merge are
    /// device-internal operations and are rejected at this boundary.
    pub fn event_arrive(&mut self, event: &mut Event) -> Result<()> {
        let result = match event.kind() {
            EventKind::Read => self.ftl.read(&mut self.nand, &mut self.stats, event),
            EventKind::Write => self.ftl.write(
                &mut self.nand,
                &mut self.block_manager,
                &mut self.stats,
                event,
            ),
            EventKind::Trim => self.ftl.trim(&mut self.nand, &mut self.stats, event),
            kind => Err(SimError::DeviceFailure(format!(
                "{:?} events cannot arrive from the host",
                kind
            ))),
        };

        if result.is_err() {
            match event.kind() {
                EventKind::Read => self.stats.failed_reads += 1,
                EventKind::Write => self.stats.failed_writes += 1,
                EventKind::Trim => self.stats.failed_trims += 1,
                _ => {}
            }
        }
        result
    }

    /// Run garbage collection on a specific victim block (the FTL
    /// contract's fourth operation; normally triggered internally by
    /// allocation).
    pub fn cleanup_block(&mut self, event: &mut Event, victim: u32) -> Result<()> {
        self.ftl.cleanup_block(
            &mut self.nand,
            &mut self.block_manager,
            &mut self.stats,
            event,
            victim,
        )
    }

    pub fn nand(&self) -> &Nand {
        &self.nand
    }

    pub fn ftl(&self) -> &Ftl {
        &self.ftl
    }

    pub fn block_manager(&self) -> &BlockManager {
        &self.block_manager
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }
}

/// The simulated drive: public entry point for workload drivers.
#[derive(Debug)]
pub struct Ssd {
    config: SimConfig,
    controller: Controller,
}

impl Ssd {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let controller = Controller::new(&config);
        Ok(Self { config, controller })
    }

    /// Run one host operation and return its total simulated latency in
    /// microseconds.
    pub fn event_arrive(
        &mut self,
        kind: EventKind,
        lpn: u64,
        size: u32,
        start_time: f64,
    ) -> Result<f64> {
        let mut event = Event::new(kind, lpn, size, start_time);
        self.controller.event_arrive(&mut event)?;
        Ok(event.time_taken())
    }

    /// Like [`event_arrive`](Self::event_arrive) but with a data payload
    /// (writes) and access to the completed event (reads carry the page
    /// data back in their payload).
    pub fn event_arrive_with_payload(
        &mut self,
        kind: EventKind,
        lpn: u64,
        size: u32,
        start_time: f64,
        payload: Option<Vec<u8>>,
    ) -> Result<Event> {
        let mut event = Event::new(kind, lpn, size, start_time);
        if let Some(payload) = payload {
            event.set_payload(payload);
        }
        self.controller.event_arrive(&mut event)?;
        Ok(event)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    pub fn stats(&self) -> &Stats {
        self.controller.stats()
    }

    pub fn reset_statistics(&mut self) {
        self.controller.reset_stats();
    }

    pub fn print_statistics(&self, out: &mut impl std::io::Write) -> std::io::Result<()> {
        self.controller.stats().print_summary(out)
    }
}

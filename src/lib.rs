//! # nandsim - NAND Flash FTL Simulator
//!
//! nandsim is a discrete-event simulator for an SSD running an
//! OOB-resident page-mapping flash translation layer. Host reads,
//! writes, and TRIMs walk synchronously through the mapping engine and
//! a hierarchical NAND model, accumulating simulated microseconds; the
//! interesting engineering is in the mapping store, the write-frontier
//! allocator, and the garbage-collection protocol that preserves
//! mapping integrity while valid pages are relocated.
//!
//! ## Quick Start
//!
//! ```ignore
//! use nandsim::{EventKind, SimConfig, Ssd};
//!
//! let mut ssd = Ssd::new(SimConfig::default())?;
//!
//! let write_latency = ssd.event_arrive(EventKind::Write, 0, 1, 0.0)?;
//! let read_latency = ssd.event_arrive(EventKind::Read, 0, 1, 1.0)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Workload Drivers (bonnie, ...)    │
//! ├─────────────────────────────────────┤
//! │         Ssd / Controller            │
//! ├─────────────────────────────────────┤
//! │   FTL Engine (OOB page mapping)     │
//! │  mapping store │ write frontier     │
//! ├────────────────┴────────────────────┤
//! │  Block Manager (pool + victims)     │
//! ├─────────────────────────────────────┤
//! │  NAND Model (blocks, bus, arena)    │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## The Mapping Scheme
//!
//! Each logical block's page map is split into fragments of Q entries.
//! A data write carries the updated image of its fragment in the page's
//! OOB spare area, so data and metadata commit in one program
//! operation. The per-block anchor array (PMD) names, for each
//! fragment, the page whose OOB holds the newest image; reads charge
//! one OOB fetch to consult it. Garbage collection uses a reverse map
//! to re-anchor fragments as valid pages are relocated, and the
//! block-mapping log makes the whole mapping reconstructible by
//! scanning OOB images in write order.
//!
//! ## Simulation Model
//!
//! Single-threaded, cooperative, discrete-event: the driver issues one
//! logical event at a time with explicit start times, and each event
//! runs to completion. Real NAND parallelism appears as per-package bus
//! channels with ready-time contention, not host threads.
//!
//! ## Module Overview
//!
//! - [`config`]: constants and the validated runtime configuration
//! - [`event`]: the event record and latency accounting
//! - [`address`]: hierarchical physical addresses
//! - [`nand`]: the device model (blocks, bus channels, page arena)
//! - [`block_manager`]: free-block pool and victim selection
//! - [`ftl`]: the FTL contract and the OOB page-mapping engine
//! - [`controller`]: subsystem wiring and the public [`Ssd`] facade
//! - [`stats`]: operation counters
//! - [`workload`]: benchmark-equivalent drivers

pub mod address;
pub mod block_manager;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod ftl;
pub mod nand;
pub mod stats;
pub mod workload;

pub use address::{Address, AddressLevel};
pub use config::SimConfig;
pub use controller::{Controller, Ssd};
pub use error::{Result, SimError};
pub use event::{Event, EventKind};
pub use stats::Stats;

//! # FTL Contract
//!
//! The flash translation layer maps host logical pages onto physical
//! NAND pages and hides erase-before-write behind relocation and
//! garbage collection. The controller talks to it through one surface:
//! `read`, `write`, `trim`, and `cleanup_block`, each taking the event
//! being served plus the device and block-pool collaborators.
//!
//! [`Ftl`] is a closed set of mapping schemes with variant dispatch; the
//! OOB-resident page-mapping scheme in [`mnftl`] is the implemented
//! variant. Additional schemes (page-table-in-RAM, log-block hybrids,
//! cached page maps) would slot in as further variants sharing this
//! same surface.

pub mod mnftl;

pub use mnftl::Mnftl;

use crate::block_manager::BlockManager;
use crate::error::Result;
use crate::event::Event;
use crate::nand::Nand;
use crate::stats::Stats;

/// The mapping schemes the controller can drive.
#[derive(Debug)]
pub enum Ftl {
    Mnftl(Mnftl),
}

impl Ftl {
    pub fn read(&mut self, nand: &mut Nand, stats: &mut Stats, event: &mut Event) -> Result<()> {
        match self {
            Ftl::Mnftl(ftl) => ftl.read(nand, stats, event),
        }
    }

    pub fn write(
        &mut self,
        nand: &mut Nand,
        block_manager: &mut BlockManager,
        stats: &mut Stats,
        event: &mut Event,
    ) -> Result<()> {
        match self {
            Ftl::Mnftl(ftl) => ftl.write(nand, block_manager, stats, event),
        }
    }

    pub fn trim(&mut self, nand: &mut Nand, stats: &mut Stats, event: &mut Event) -> Result<()> {
        match self {
            Ftl::Mnftl(ftl) => ftl.trim(nand, stats, event),
        }
    }

    pub fn cleanup_block(
        &mut self,
        nand: &mut Nand,
        block_manager: &mut BlockManager,
        stats: &mut Stats,
        event: &mut Event,
        victim: u32,
    ) -> Result<()> {
        match self {
            Ftl::Mnftl(ftl) => ftl.cleanup_block(nand, block_manager, stats, event, victim),
        }
    }

    /// The concrete scheme, for driver introspection and tests.
    pub fn as_mnftl(&self) -> &Mnftl {
        match self {
            Ftl::Mnftl(ftl) => ftl,
        }
    }
}

//! # Physical Addresses
//!
//! A physical address names a location in the package > die > plane >
//! block > page hierarchy, down to the resolution given by its
//! [`AddressLevel`]. The linear page number is the single source of truth;
//! the hierarchical components are derived from it and the configured
//! geometry at construction time, so the two representations cannot drift
//! apart.
//!
//! The FTL core works almost entirely in linear PPNs; the decomposition
//! exists for the device model, which selects the bus channel by package.

use crate::config::SimConfig;

/// Resolution of an [`Address`]: how deep into the hierarchy it points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AddressLevel {
    None,
    Package,
    Die,
    Plane,
    Block,
    Page,
}

/// A physical NAND address with its hierarchical decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    package: u32,
    die: u32,
    plane: u32,
    /// Block index within its plane.
    block: u32,
    /// Page offset within its block.
    page: u32,
    /// Linear physical page number.
    linear: u64,
    level: AddressLevel,
}

impl Address {
    /// Page-resolution address for a linear PPN.
    pub fn page_level(ppn: u64, config: &SimConfig) -> Self {
        Self::decompose(ppn, AddressLevel::Page, config)
    }

    /// Block-resolution address for a device-wide block id. The linear
    /// address is the block's first page (its physical base).
    pub fn block_level(block_id: u32, config: &SimConfig) -> Self {
        let base = block_id as u64 * config.block_size as u64;
        Self::decompose(base, AddressLevel::Block, config)
    }

    fn decompose(ppn: u64, level: AddressLevel, config: &SimConfig) -> Self {
        let p = config.block_size as u64;
        let page = (ppn % p) as u32;
        let block_global = ppn / p;
        let block = (block_global % config.plane_size as u64) as u32;
        let plane_global = block_global / config.plane_size as u64;
        let plane = (plane_global % config.die_size as u64) as u32;
        let die_global = plane_global / config.die_size as u64;
        let die = (die_global % config.package_size as u64) as u32;
        let package = (die_global / config.package_size as u64) as u32;

        Self {
            package,
            die,
            plane,
            block,
            page,
            linear: ppn,
            level,
        }
    }

    /// Linear physical page number.
    pub fn linear(&self) -> u64 {
        self.linear
    }

    pub fn level(&self) -> AddressLevel {
        self.level
    }

    pub fn package(&self) -> u32 {
        self.package
    }

    pub fn die(&self) -> u32 {
        self.die
    }

    pub fn plane(&self) -> u32 {
        self.plane
    }

    /// Block index within its plane.
    pub fn block(&self) -> u32 {
        self.block
    }

    /// Page offset within its block.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Device-wide block id.
    pub fn block_id(&self, config: &SimConfig) -> u32 {
        (self.linear / config.block_size as u64) as u32
    }

    /// Bus channel serving this address (one channel per package).
    pub fn channel(&self) -> u32 {
        self.package
    }
}

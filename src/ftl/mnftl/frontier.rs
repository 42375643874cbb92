//! # Write Frontier
//!
//! Tracks the currently open physical block (the one sequential writes
//! are allocated into) together with the next free offset, the
//! block-mapping log (BML), and the set of blocks that have passed
//! through the frontier and not yet been reclaimed.
//!
//! ## Sealing
//!
//! A frontier with `current_page_offset == P` is *exhausted*: the block
//! is sealed implicitly and the next allocation must open a new one.
//! Sealed blocks stay in the frontier set until garbage collection
//! victimizes them; the *open* frontier itself must never be chosen as
//! a victim.
//!
//! ## BML
//!
//! The BML records every block opening in order. Because all writes,
//! host and GC alike, flow through one frontier at a time, BML order
//! times page-offset order is the device's total write order, which is
//! what makes the OOB recovery scan possible.

use hashbrown::HashSet;

/// The open-block allocation cursor and its logs.
#[derive(Debug)]
pub struct WriteFrontier {
    pages_per_block: u32,
    current: Option<u32>,
    current_page_offset: u32,
    bml: Vec<u32>,
    current_blocks: HashSet<u32>,
}

impl WriteFrontier {
    pub fn new(pages_per_block: u32) -> Self {
        Self {
            pages_per_block,
            current: None,
            current_page_offset: 0,
            bml: Vec::new(),
            current_blocks: HashSet::new(),
        }
    }

    pub fn has_current(&self) -> bool {
        self.current.is_some()
    }

    /// The open block id, if one is open.
    pub fn current_block(&self) -> Option<u32> {
        self.current
    }

    pub fn current_page_offset(&self) -> u32 {
        self.current_page_offset
    }

    /// True when a new block must be opened before the next allocation.
    pub fn is_exhausted(&self) -> bool {
        match self.current {
            None => true,
            Some(_) => self.current_page_offset == self.pages_per_block,
        }
    }

    /// Open a freshly allocated block as the write frontier.
    pub fn open(&mut self, block_id: u32) {
        self.current = Some(block_id);
        self.current_page_offset = 0;
        self.bml.push(block_id);
        self.current_blocks.insert(block_id);
    }

    /// Account one allocated page. Callers do this exactly once per
    /// successful allocation.
    pub fn advance(&mut self) {
        debug_assert!(
            self.current.is_some() && self.current_page_offset < self.pages_per_block,
            "advance past the end of the frontier block"
        );
        self.current_page_offset += 1;
    }

    /// Block-mapping log: every opening, in write order.
    pub fn bml(&self) -> &[u32] {
        &self.bml
    }

    /// Blocks that have been frontiers and are not yet reclaimed.
    pub fn frontier_set(&self) -> &HashSet<u32> {
        &self.current_blocks
    }

    /// Whether a block is the *open* frontier (the one GC must not touch).
    pub fn is_open_frontier(&self, block_id: u32) -> bool {
        self.current == Some(block_id)
    }

    /// Drop a victimized block from the frontier set so it becomes an
    /// ordinary candidate again once re-allocated.
    pub fn forget(&mut self, block_id: u32) {
        self.current_blocks.remove(&block_id);
        if self.current == Some(block_id) {
            self.current = None;
            self.current_page_offset = 0;
        }
    }
}

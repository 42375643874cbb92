//! # Block Manager
//!
//! Free-block pool and garbage-collection victim selection. The manager
//! owns the *allocation* state of blocks (which ids are in the erased
//! pool) while the device owns their page-level state. It is a plain
//! value held by the controller and handed to the FTL by reference; when
//! the pool runs dry the FTL engine picks a victim here and runs its own
//! cleanup, which returns the erased victim to the pool.
//!
//! ## Victim Policy
//!
//! Greedy cost-based: the live block with the most invalid pages wins,
//! because every invalid page is a page reclaimed without a copy. Blocks
//! with no invalid pages are never picked: relocating a fully-valid
//! block reclaims nothing and burns an erase cycle. The open write
//! frontier is excluded by the caller through the `protected` set.

use hashbrown::HashSet;

use crate::config::SimConfig;
use crate::nand::{BlockState, Nand};

/// Free-block pool over the device's block id space.
#[derive(Debug)]
pub struct BlockManager {
    /// Erased block ids, popped from the back.
    free: Vec<u32>,
}

impl BlockManager {
    pub fn new(config: &SimConfig) -> Self {
        // Reverse so allocation proceeds from block 0 upward.
        Self {
            free: (0..config.total_blocks()).rev().collect(),
        }
    }

    /// Pop a free block, if the pool has one.
    pub fn take_free_block(&mut self) -> Option<u32> {
        self.free.pop()
    }

    /// Return an erased block to the pool.
    pub fn release(&mut self, block_id: u32) {
        debug_assert!(
            !self.free.contains(&block_id),
            "block {} released twice",
            block_id
        );
        self.free.push(block_id);
    }

    pub fn free_blocks(&self) -> usize {
        self.free.len()
    }

    /// Pick the GC victim: the non-free block with the most invalid
    /// pages, excluding `protected` ids. Returns `None` when no block
    /// has anything to reclaim.
    pub fn pick_victim(&self, nand: &Nand, protected: &HashSet<u32>) -> Option<u32> {
        let mut best: Option<(u32, u32)> = None;

        for block_id in 0..nand.block_count() {
            if protected.contains(&block_id) {
                continue;
            }
            let block = nand.block(block_id);
            if block.block_state() == BlockState::Free {
                continue;
            }
            let invalid = block.pages_invalid();
            if invalid == 0 {
                continue;
            }
            match best {
                Some((_, best_invalid)) if best_invalid >= invalid => {}
                _ => best = Some((block_id, invalid)),
            }
        }

        best.map(|(block_id, _)| block_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::event::{Event, EventKind};

    fn small_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.ssd_size = 1;
        config.package_size = 1;
        config.die_size = 1;
        config.plane_size = 4;
        config.block_size = 4;
        config.addressable_blocks = 3;
        config
    }

    fn write(nand: &mut Nand, ppn: u64, replace: Option<u64>) {
        let mut event = Event::new(EventKind::Write, 0, 1, 0.0);
        event.set_address(Address::page_level(ppn, nand.config()));
        if let Some(old) = replace {
            event.set_replace_address(Address::page_level(old, nand.config()));
        }
        nand.issue(&mut event).unwrap();
    }

    #[test]
    fn pool_starts_full_and_allocates_from_zero() {
        let config = small_config();
        let mut manager = BlockManager::new(&config);

        assert_eq!(manager.free_blocks(), 4);
        assert_eq!(manager.take_free_block(), Some(0));
        assert_eq!(manager.take_free_block(), Some(1));
    }

    #[test]
    fn release_returns_a_block_to_the_pool() {
        let config = small_config();
        let mut manager = BlockManager::new(&config);
        for _ in 0..4 {
            manager.take_free_block().unwrap();
        }
        assert_eq!(manager.take_free_block(), None);

        manager.release(2);

        assert_eq!(manager.take_free_block(), Some(2));
    }

    #[test]
    fn victim_is_the_block_with_most_invalid_pages() {
        let config = small_config();
        let mut nand = Nand::new(&config);
        let manager = BlockManager::new(&config);
        // Block 0: two invalid pages; block 1: one invalid page.
        write(&mut nand, 0, None);
        write(&mut nand, 1, None);
        write(&mut nand, 4, None);
        write(&mut nand, 2, Some(0));
        write(&mut nand, 3, Some(1));
        write(&mut nand, 5, Some(4));

        let victim = manager.pick_victim(&nand, &HashSet::new());

        assert_eq!(victim, Some(0));
    }

    #[test]
    fn protected_blocks_are_skipped() {
        let config = small_config();
        let mut nand = Nand::new(&config);
        let manager = BlockManager::new(&config);
        write(&mut nand, 0, None);
        write(&mut nand, 1, Some(0));

        let mut protected = HashSet::new();
        protected.insert(0u32);

        assert_eq!(manager.pick_victim(&nand, &protected), None);
    }

    #[test]
    fn fully_valid_blocks_are_never_victims() {
        let config = small_config();
        let mut nand = Nand::new(&config);
        let manager = BlockManager::new(&config);
        write(&mut nand, 0, None);
        write(&mut nand, 1, None);

        assert_eq!(manager.pick_victim(&nand, &HashSet::new()), None);
    }
}

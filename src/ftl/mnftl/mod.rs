//! # OOB-Resident Page Mapping (MNFTL)
//!
//! A page-level mapping scheme built for small SRAM budgets: instead of
//! keeping the whole LPN->PPN table resident, each logical block's table
//! is split into PMT fragments of Q slots, and every data write carries
//! the updated image of its fragment in the page's OOB area. The page
//! holding the newest image of a fragment is its *anchor*; the PMD array
//! per logical block names the anchors. Reading a page therefore costs
//! one OOB fetch (the fragment) plus the data read: the scheme's
//! defining latency, charged as `oob_read_delay`.
//!
//! ## Write Path
//!
//! Writes allocate sequentially inside one open block, the *frontier*.
//! When it fills, a fresh block is opened (triggering garbage collection
//! when the free pool runs low). Data and mapping metadata share the
//! same program operation, so no separate metadata commit exists
//! anywhere in the scheme.
//!
//! ## Garbage Collection
//!
//! Relocating a valid page must also move its mapping anchor, which is
//! why the store keeps a reverse map. Cleanup walks the victim in
//! ascending page order; every relocation eagerly rewrites the
//! fragment's slot and anchor, so when several slots of one fragment sit
//! in the victim, the last one relocated ends up as the anchor, and its
//! OOB image, encoded after the slot update, is complete at the moment
//! it is written.
//!
//! ## Recovery
//!
//! Because all writes flow through one frontier, the block-mapping log
//! (BML) times page offset is the device's total write order, and the
//! whole mapping can be rebuilt by scanning OOB images in that order;
//! see [`Mnftl::rebuild_mapping`]. TRIMs are RAM-only and do not survive
//! a rebuild.

mod frontier;
mod mapping;
pub mod oob;

pub use frontier::WriteFrontier;
pub use mapping::{Lbn, MapTarget, MappingStore, Ppn, RmapEntry, WriteUndo};

use hashbrown::{HashMap, HashSet};

use crate::address::Address;
use crate::block_manager::BlockManager;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::event::{Event, EventKind};
use crate::nand::{Nand, PageState};
use crate::stats::Stats;

/// Free blocks left in the pool at or below which allocation runs
/// garbage collection before taking one. One block in reserve is enough:
/// a victim never has P valid pages (it would have nothing to reclaim),
/// so its relocations fit the remaining frontier plus one fresh block.
const GC_LOW_WATER: usize = 1;

/// The MNFTL engine: mapping store, write frontier, and the four
/// operations of the FTL contract.
#[derive(Debug)]
pub struct Mnftl {
    pages_per_block: u32,
    pmt_slots: u32,
    num_pmd: u32,
    addressable_pages: u64,
    oob_read_delay: f64,
    mapping: MappingStore,
    frontier: WriteFrontier,
}

impl Mnftl {
    pub fn new(config: &SimConfig) -> Self {
        let pages_per_block = config.pages_per_block();
        let pmt_slots = config.pmt_slots();
        let num_pmd = config.pmd_per_block();

        Self {
            pages_per_block,
            pmt_slots,
            num_pmd,
            addressable_pages: config.addressable_pages(),
            oob_read_delay: config.oob_read_delay,
            mapping: MappingStore::new(num_pmd, pmt_slots),
            frontier: WriteFrontier::new(pages_per_block),
        }
    }

    pub fn mapping(&self) -> &MappingStore {
        &self.mapping
    }

    pub fn frontier(&self) -> &WriteFrontier {
        &self.frontier
    }

    pub fn num_pmd(&self) -> u32 {
        self.num_pmd
    }

    pub fn pmt_slots(&self) -> u32 {
        self.pmt_slots
    }

    /// Split an LPN into its logical block, fragment, and slot.
    pub fn decompose(&self, lpn: u64) -> MapTarget {
        let block_offset = (lpn % self.pages_per_block as u64) as u32;
        MapTarget {
            lbn: lpn / self.pages_per_block as u64,
            pmd_index: block_offset / self.pmt_slots,
            map_slot: block_offset % self.pmt_slots,
        }
    }

    fn check_lpn(&self, lpn: u64) -> Result<()> {
        if lpn >= self.addressable_pages {
            return Err(SimError::InvalidLpn {
                lpn,
                limit: self.addressable_pages,
            });
        }
        Ok(())
    }

    /// Serve a host read: anchor lookup, one OOB fetch for the fragment,
    /// then the data page itself. Reads of never-written (or trimmed)
    /// pages complete as noops rather than errors.
    pub fn read(&mut self, nand: &mut Nand, stats: &mut Stats, event: &mut Event) -> Result<()> {
        stats.ftl_reads += 1;
        self.check_lpn(event.logical_address())?;
        let target = self.decompose(event.logical_address());

        if !self.mapping.has_lbn(target.lbn)
            || self.mapping.anchor(target.lbn, target.pmd_index).is_none()
        {
            return issue_noop(nand, stats, event);
        }

        // The fragment must come out of the anchor's OOB before the slot
        // can be consulted.
        event.incr_time_taken(self.oob_read_delay);

        let Some(ppn) = self.mapping.slot(target) else {
            return issue_noop(nand, stats, event);
        };

        event.set_address(Address::page_level(ppn, nand.config()));
        nand.issue(event)
    }

    /// Serve a host write: allocate the next page of the frontier, point
    /// the slot and anchor at it, and program data plus the updated
    /// fragment image in one operation. The RAM mapping is committed
    /// before the device sees the event; a device failure rolls it back.
    pub fn write(
        &mut self,
        nand: &mut Nand,
        block_manager: &mut BlockManager,
        stats: &mut Stats,
        event: &mut Event,
    ) -> Result<()> {
        stats.ftl_writes += 1;
        self.check_lpn(event.logical_address())?;

        if self.frontier.is_exhausted() {
            self.allocate_new_current_block(nand, block_manager, stats, event, true)?;
        }

        let target = self.decompose(event.logical_address());
        self.mapping.ensure_rows(target.lbn);

        // An existing anchor means the previous fragment image has to be
        // fetched from its OOB before the updated copy can be written.
        if self.mapping.anchor(target.lbn, target.pmd_index).is_some() {
            event.incr_time_taken(self.oob_read_delay);
        }

        let (new_ppn, new_address) = self.alloc_page_in_current_block(nand)?;
        self.frontier.advance();

        if let Some(old_ppn) = self.mapping.slot(target) {
            event.set_replace_address(Address::page_level(old_ppn, nand.config()));
        }

        let undo = self.mapping.commit_write(target, new_ppn);
        event.set_oob(oob::encode(
            target.lbn as u32,
            target.pmd_index as u16,
            self.mapping.fragment_slots(target.lbn, target.pmd_index),
        ));
        event.set_address(new_address);

        if let Err(e) = nand.issue(event) {
            // The allocation itself is not undone: the offset is a pure
            // counter and no second tenant will be handed this PPN.
            self.mapping.undo_write(target, new_ppn, undo);
            return Err(e);
        }
        Ok(())
    }

    /// Drop a logical page from the map. The physical page is left
    /// untouched at the device and reclaimed when its block is next
    /// victimized.
    pub fn trim(&mut self, nand: &mut Nand, stats: &mut Stats, event: &mut Event) -> Result<()> {
        stats.ftl_trims += 1;
        self.check_lpn(event.logical_address())?;
        let target = self.decompose(event.logical_address());

        if !self.mapping.has_lbn(target.lbn) {
            return Ok(());
        }

        self.mapping.clear_slot(target);

        // Issue as a noop so the event still flows through the device's
        // accounting path.
        event.set_noop(true);
        event.set_address(Address::page_level(0, nand.config()));
        nand.issue(event)
    }

    /// Garbage-collect one victim block: relocate every valid page into
    /// the frontier, rewriting slots and anchors through the reverse
    /// map, then erase the victim and return it to the pool. All
    /// sub-event latencies accrue onto the triggering event.
    ///
    /// # Panics
    ///
    /// Panics when `victim` is the open write frontier; victim selection
    /// excluding the frontier is the caller's contract.
    pub fn cleanup_block(
        &mut self,
        nand: &mut Nand,
        block_manager: &mut BlockManager,
        stats: &mut Stats,
        event: &mut Event,
        victim: u32,
    ) -> Result<()> {
        assert!(
            !self.frontier.is_open_frontier(victim),
            "cleanup_block called on the open write frontier (block {})",
            victim
        );

        // Postponed-GC charge: the victim's fragments are materialized
        // from OOB lazily, all at once, when the block is reclaimed.
        event.incr_time_taken(self.num_pmd as f64 * self.oob_read_delay);

        let physical_base = nand.block(victim).physical_base();

        for offset in 0..self.pages_per_block {
            if nand.block(victim).state(offset) != PageState::Valid {
                continue;
            }
            let old_ppn = physical_base + offset as u64;

            let mut read_event =
                Event::new(EventKind::Read, event.logical_address(), 1, event.start_time());
            read_event.set_address(Address::page_level(old_ppn, nand.config()));
            nand.issue(&mut read_event)?;
            stats.gc_reads += 1;

            if self.frontier.is_exhausted() {
                // Never recurse into a second collection while one is in
                // flight; the low-water reserve guarantees a free block.
                self.allocate_new_current_block(nand, block_manager, stats, event, false)?;
            }
            let (new_ppn, new_address) = self.alloc_page_in_current_block(nand)?;
            self.frontier.advance();

            let mut write_event = Event::new(
                EventKind::Write,
                event.logical_address(),
                1,
                event.start_time() + read_event.time_taken(),
            );
            write_event.set_address(new_address);
            write_event.set_replace_address(Address::page_level(old_ppn, nand.config()));
            if let Some(data) = read_event.take_payload() {
                write_event.set_payload(data);
            }

            // A live page's relocated copy becomes its fragment's new
            // anchor, so it carries the post-relocation image. Orphans
            // (trimmed slots) get a blank OOB: no anchor will ever name
            // the copy, and a stale image must not outrank the real one
            // in a recovery scan.
            if let Some(entry) = self.mapping.rmap_lookup(old_ppn) {
                let mut slots = self
                    .mapping
                    .fragment_slots(entry.lbn, entry.pmd_index)
                    .to_vec();
                slots[entry.map_slot as usize] = Some(new_ppn);
                write_event.set_oob(oob::encode(
                    entry.lbn as u32,
                    entry.pmd_index as u16,
                    &slots,
                ));
            }

            nand.issue(&mut write_event)?;
            stats.gc_writes += 1;
            stats.valid_page_copies += 1;
            event.incr_time_taken(read_event.time_taken() + write_event.time_taken());

            self.mapping.relocate(old_ppn, new_ppn);
        }

        let mut erase_event = Event::new(
            EventKind::Erase,
            event.logical_address(),
            1,
            event.current_time(),
        );
        erase_event.set_address(Address::block_level(victim, nand.config()));
        nand.issue(&mut erase_event)?;
        stats.ftl_erases += 1;
        event.incr_time_taken(erase_event.time_taken());

        self.frontier.forget(victim);
        block_manager.release(victim);
        Ok(())
    }

    /// Make the frontier writable again: collect a victim first when the
    /// pool is at its low-water mark and `allow_gc` permits, then open a
    /// fresh block unless the collection already opened one for its
    /// relocations.
    fn allocate_new_current_block(
        &mut self,
        nand: &mut Nand,
        block_manager: &mut BlockManager,
        stats: &mut Stats,
        event: &mut Event,
        allow_gc: bool,
    ) -> Result<()> {
        if allow_gc && block_manager.free_blocks() <= GC_LOW_WATER {
            let mut protected = HashSet::new();
            if let Some(open) = self.frontier.current_block() {
                protected.insert(open);
            }
            if let Some(victim) = block_manager.pick_victim(nand, &protected) {
                self.cleanup_block(nand, block_manager, stats, event, victim)?;
            }
        }

        if self.frontier.is_exhausted() {
            let block_id = block_manager
                .take_free_block()
                .ok_or(SimError::OutOfBlocks)?;
            self.frontier.open(block_id);
        }
        Ok(())
    }

    /// Hand out the next free page of the open frontier. Callers advance
    /// the frontier exactly once per successful call.
    fn alloc_page_in_current_block(&self, nand: &Nand) -> Result<(Ppn, Address)> {
        let block_id = self
            .frontier
            .current_block()
            .expect("page allocation without an open frontier block");

        let offset = nand.get_free_page(block_id).ok_or_else(|| {
            SimError::DeviceFailure(format!("frontier block {} has no free page", block_id))
        })?;
        let ppn = nand.block(block_id).physical_base() + offset as u64;
        Ok((ppn, Address::page_level(ppn, nand.config())))
    }

    /// Reconstruct the mapping from on-device state alone: walk the BML
    /// in write order (each block counted at its most recent opening),
    /// pages in ascending offset, and let the last OOB image seen for
    /// each fragment win. The page carrying that image is the fragment's
    /// anchor. TRIMs do not survive this; they never touch the OOB.
    pub fn rebuild_mapping(&self, nand: &Nand) -> Result<MappingStore> {
        let mut store = MappingStore::new(self.num_pmd, self.pmt_slots);

        let bml = self.frontier.bml();
        let mut last_opening: HashMap<u32, usize> = HashMap::new();
        for (position, &block_id) in bml.iter().enumerate() {
            last_opening.insert(block_id, position);
        }

        for (position, &block_id) in bml.iter().enumerate() {
            if last_opening[&block_id] != position {
                continue; // erased and re-opened later; content belongs there
            }
            let block = nand.block(block_id);
            for offset in 0..self.pages_per_block {
                if block.state(offset) == PageState::Empty {
                    continue;
                }
                let ppn = block.physical_base() + offset as u64;
                if let Some(image) = oob::decode(nand.page_oob(ppn), self.pmt_slots)? {
                    store.restore_fragment(
                        image.lbn as u64,
                        image.pmd_index as u32,
                        &image.slots,
                        ppn,
                    );
                }
            }
        }

        Ok(store)
    }
}

fn issue_noop(nand: &mut Nand, stats: &mut Stats, event: &mut Event) -> Result<()> {
    stats.noop_reads += 1;
    event.set_noop(true);
    event.set_address(Address::page_level(0, nand.config()));
    nand.issue(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimConfig {
        SimConfig::default()
    }

    fn engine() -> (Mnftl, Nand, BlockManager, Stats) {
        let config = config();
        (
            Mnftl::new(&config),
            Nand::new(&config),
            BlockManager::new(&config),
            Stats::new(),
        )
    }

    fn write(
        ftl: &mut Mnftl,
        nand: &mut Nand,
        bm: &mut BlockManager,
        stats: &mut Stats,
        lpn: u64,
        start: f64,
    ) -> Event {
        let mut event = Event::new(EventKind::Write, lpn, 1, start);
        ftl.write(nand, bm, stats, &mut event).unwrap();
        event
    }

    #[test]
    fn decompose_splits_lpn_by_fragment_geometry() {
        let (ftl, ..) = engine();

        // P = 64, Q = 8: LPN 70 -> LBN 1, offset 6 -> fragment 0, slot 6.
        let target = ftl.decompose(70);

        assert_eq!(target.lbn, 1);
        assert_eq!(target.pmd_index, 0);
        assert_eq!(target.map_slot, 6);

        let target = ftl.decompose(64 + 60);
        assert_eq!(target.pmd_index, 7);
        assert_eq!(target.map_slot, 4);
    }

    #[test]
    fn first_write_opens_a_frontier_and_maps_the_page() {
        let (mut ftl, mut nand, mut bm, mut stats) = engine();

        let event = write(&mut ftl, &mut nand, &mut bm, &mut stats, 0, 0.0);

        assert!(ftl.frontier().has_current());
        assert_eq!(ftl.frontier().current_page_offset(), 1);
        assert_eq!(ftl.frontier().bml().len(), 1);
        let target = ftl.decompose(0);
        assert_eq!(ftl.mapping().slot(target), event.address().map(|a| a.linear()));
        assert_eq!(ftl.mapping().anchor(0, 0), ftl.mapping().slot(target));
        ftl.mapping().check_invariants().unwrap();
    }

    #[test]
    fn lpn_outside_addressable_range_is_rejected() {
        let (mut ftl, mut nand, mut bm, mut stats) = engine();
        let limit = config().addressable_pages();

        let mut event = Event::new(EventKind::Write, limit, 1, 0.0);
        let result = ftl.write(&mut nand, &mut bm, &mut stats, &mut event);
        assert!(matches!(result, Err(SimError::InvalidLpn { .. })));

        let mut event = Event::new(EventKind::Read, limit, 1, 0.0);
        let result = ftl.read(&mut nand, &mut stats, &mut event);
        assert!(matches!(result, Err(SimError::InvalidLpn { .. })));
    }

    #[test]
    fn read_of_written_page_charges_one_oob_fetch() {
        let (mut ftl, mut nand, mut bm, mut stats) = engine();
        let written = write(&mut ftl, &mut nand, &mut bm, &mut stats, 5, 0.0);

        // Late enough that the write's channel occupancy has drained.
        let mut read = Event::new(EventKind::Read, 5, 1, 1000.0);
        ftl.read(&mut nand, &mut stats, &mut read).unwrap();

        assert!(!read.noop());
        assert_eq!(read.address(), written.address());
        let device_read = nand.config().bus_ctrl_delay
            + nand.config().bus_data_delay
            + nand.config().page_read_delay;
        assert_eq!(
            read.time_taken(),
            nand.config().oob_read_delay + device_read
        );
    }

    #[test]
    fn read_of_unwritten_page_is_a_noop_with_zero_latency() {
        let (mut ftl, mut nand, _, mut stats) = engine();

        let mut read = Event::new(EventKind::Read, 1000, 1, 0.0);
        ftl.read(&mut nand, &mut stats, &mut read).unwrap();

        assert!(read.noop());
        assert_eq!(read.time_taken(), 0.0);
        assert!(!ftl.mapping().has_lbn(ftl.decompose(1000).lbn));
        assert_eq!(stats.noop_reads, 1);
    }

    #[test]
    fn overwrite_sets_replace_address_and_remaps() {
        let (mut ftl, mut nand, mut bm, mut stats) = engine();
        let first = write(&mut ftl, &mut nand, &mut bm, &mut stats, 5, 0.0);
        let old_ppn = first.address().unwrap().linear();

        let second = write(&mut ftl, &mut nand, &mut bm, &mut stats, 5, 10.0);

        assert_eq!(second.replace_address().unwrap().linear(), old_ppn);
        assert!(ftl.mapping().rmap_lookup(old_ppn).is_none());
        assert_eq!(nand.page_state(old_ppn), PageState::Invalid);
        // Overwrite fetched the previous fragment image from OOB.
        assert!(second.time_taken() > first.time_taken());
        ftl.mapping().check_invariants().unwrap();
    }

    #[test]
    fn sequential_writes_fill_one_block_then_open_another() {
        let (mut ftl, mut nand, mut bm, mut stats) = engine();

        for lpn in 0..64 {
            write(&mut ftl, &mut nand, &mut bm, &mut stats, lpn, lpn as f64);
        }

        assert_eq!(ftl.frontier().current_page_offset(), 64);
        assert_eq!(ftl.frontier().bml().len(), 1);

        write(&mut ftl, &mut nand, &mut bm, &mut stats, 64, 64.0);

        assert_eq!(ftl.frontier().bml().len(), 2);
        assert_eq!(ftl.frontier().current_page_offset(), 1);
    }

    #[test]
    fn trim_clears_the_slot_and_reads_become_noops() {
        let (mut ftl, mut nand, mut bm, mut stats) = engine();
        let written = write(&mut ftl, &mut nand, &mut bm, &mut stats, 7, 0.0);
        let ppn = written.address().unwrap().linear();

        let mut trim = Event::new(EventKind::Trim, 7, 1, 1.0);
        ftl.trim(&mut nand, &mut stats, &mut trim).unwrap();

        assert!(trim.noop());
        assert_eq!(ftl.mapping().slot(ftl.decompose(7)), None);
        assert!(ftl.mapping().rmap_lookup(ppn).is_none());
        // Device-side the page stays valid until its block is victimized.
        assert_eq!(nand.page_state(ppn), PageState::Valid);

        // Second trim is an idempotent success.
        let mut again = Event::new(EventKind::Trim, 7, 1, 2.0);
        ftl.trim(&mut nand, &mut stats, &mut again).unwrap();

        let mut read = Event::new(EventKind::Read, 7, 1, 3.0);
        ftl.read(&mut nand, &mut stats, &mut read).unwrap();
        assert!(read.noop());
    }

    #[test]
    fn cleanup_relocates_valid_pages_and_erases_the_victim() {
        let (mut ftl, mut nand, mut bm, mut stats) = engine();
        // Fill block 0 with LPNs 0..64, then overwrite the first half so
        // block 0 is half invalid.
        for lpn in 0..64 {
            write(&mut ftl, &mut nand, &mut bm, &mut stats, lpn, lpn as f64);
        }
        for lpn in 0..32 {
            write(&mut ftl, &mut nand, &mut bm, &mut stats, lpn, 100.0 + lpn as f64);
        }

        let mut gc = Event::new(EventKind::Write, 0, 1, 500.0);
        ftl.cleanup_block(&mut nand, &mut bm, &mut stats, &mut gc, 0)
            .unwrap();

        for lpn in 32..64u64 {
            let ppn = ftl.mapping().slot(ftl.decompose(lpn)).unwrap();
            assert!(ppn >= 64, "lpn {} still maps into the erased victim", lpn);
            assert_eq!(nand.page_state(ppn), PageState::Valid);
        }
        assert_eq!(nand.block(0).pages_valid(), 0);
        assert_eq!(stats.valid_page_copies, 32);
        assert!(!ftl.frontier().frontier_set().contains(&0));
        ftl.mapping().check_invariants().unwrap();

        let config = nand.config();
        let min_expected = 8.0 * config.oob_read_delay
            + 32.0
                * (config.page_read_delay
                    + config.page_write_delay)
            + config.block_erase_delay;
        assert!(gc.time_taken() >= min_expected);
    }

    #[test]
    #[should_panic(expected = "open write frontier")]
    fn cleanup_of_the_open_frontier_panics() {
        let (mut ftl, mut nand, mut bm, mut stats) = engine();
        write(&mut ftl, &mut nand, &mut bm, &mut stats, 0, 0.0);
        let open = ftl.frontier().current_block().unwrap();

        let mut gc = Event::new(EventKind::Write, 0, 1, 1.0);
        let _ = ftl.cleanup_block(&mut nand, &mut bm, &mut stats, &mut gc, open);
    }

    #[test]
    fn steady_overwrites_trigger_gc_instead_of_running_dry() {
        let mut config = config();
        config.ssd_size = 1;
        config.package_size = 1;
        config.die_size = 1;
        config.plane_size = 8; // 8 blocks of 64 pages
        config.addressable_blocks = 5;
        let mut ftl = Mnftl::new(&config);
        let mut nand = Nand::new(&config);
        let mut bm = BlockManager::new(&config);
        let mut stats = Stats::new();

        // Several times the addressable space worth of overwrites.
        let pages = config.addressable_pages();
        for round in 0..6u64 {
            for lpn in 0..pages {
                let mut event =
                    Event::new(EventKind::Write, lpn, 1, (round * pages + lpn) as f64);
                ftl.write(&mut nand, &mut bm, &mut stats, &mut event).unwrap();
            }
        }

        assert!(stats.valid_page_copies > 0 || stats.ftl_erases > 0);
        assert_eq!(ftl.mapping().mapped_pages(), pages as usize);
        ftl.mapping().check_invariants().unwrap();
    }

    #[test]
    fn rebuild_matches_the_live_mapping() {
        let (mut ftl, mut nand, mut bm, mut stats) = engine();
        for lpn in 0..200 {
            write(&mut ftl, &mut nand, &mut bm, &mut stats, lpn, lpn as f64);
        }
        for lpn in (0..100).step_by(3) {
            write(&mut ftl, &mut nand, &mut bm, &mut stats, lpn, 1000.0 + lpn as f64);
        }

        let rebuilt = ftl.rebuild_mapping(&nand).unwrap();

        rebuilt.check_invariants().unwrap();
        for lpn in 0..200u64 {
            let target = ftl.decompose(lpn);
            assert_eq!(
                rebuilt.slot(target),
                ftl.mapping().slot(target),
                "lpn {} diverged after rebuild",
                lpn
            );
        }
        for lbn in 0..4u64 {
            for i in 0..8 {
                assert_eq!(rebuilt.anchor(lbn, i), ftl.mapping().anchor(lbn, i));
            }
        }
    }
}

//! # NAND Device Model
//!
//! The device executes primitive READ/WRITE/ERASE events against a
//! hierarchical flash geometry and charges their latencies onto the
//! event. It is the only owner of physical page state and page contents;
//! the mapping layers above exchange PPNs and copies of byte ranges.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                      Nand                        │
//! ├──────────────┬──────────────┬────────────────────┤
//! │  Vec<Block>  │     Bus      │     PageArena      │
//! │  page-state  │  per-package │  data + OOB bytes  │
//! │  machines    │  channels    │  per linear PPN    │
//! └──────────────┴──────────────┴────────────────────┘
//! ```
//!
//! The package > die > plane > block hierarchy is kept in the address
//! decomposition, not in nested containers: blocks live in one flat
//! array indexed by device-wide block id, and the bus channel serving a
//! block follows from its package component. This keeps every lookup a
//! single index while preserving the per-channel contention the
//! hierarchy exists to model.
//!
//! ## Latency Model
//!
//! Every primitive operation locks its channel for the bus control
//! cycle, the data transfer (reads and writes), and the cell operation.
//! Time spent waiting for a busy channel is charged to the event as
//! `bus_wait_time` in addition to `time_taken`. Noop events complete
//! immediately and add nothing.
//!
//! ## Write Semantics
//!
//! A WRITE stores the event's payload and OOB image in the same
//! operation and, when a `replace_address` is present, transitions the
//! superseded page Valid -> Invalid atomically with the new page's
//! Empty -> Valid. Programming a non-empty page is a device failure.

mod arena;
mod block;
mod bus;

pub use arena::PageArena;
pub use block::{Block, BlockState, PageState};
pub use bus::{Bus, Channel};

use crate::address::{Address, AddressLevel};
use crate::config::{SimConfig, OOB_TAG_SIZE};
use crate::error::{Result, SimError};
use crate::event::{Event, EventKind};

/// The flash device: block state machines, bus channels, and the page
/// content arena.
#[derive(Debug)]
pub struct Nand {
    config: SimConfig,
    blocks: Vec<Block>,
    bus: Bus,
    arena: PageArena,
}

impl Nand {
    pub fn new(config: &SimConfig) -> Self {
        let pages_per_block = config.block_size;
        let blocks = (0..config.total_blocks())
            .map(|id| {
                Block::new(
                    id as u64 * pages_per_block as u64,
                    pages_per_block,
                    config.block_erases,
                )
            })
            .collect();

        Self {
            config: config.clone(),
            blocks,
            bus: Bus::new(config.ssd_size),
            arena: PageArena::new(
                config.total_pages(),
                config.page_size,
                OOB_TAG_SIZE + config.oob_size as usize,
            ),
        }
    }

    /// Execute one primitive event, accruing its latency. Events flagged
    /// noop complete immediately with zero added time.
    pub fn issue(&mut self, event: &mut Event) -> Result<()> {
        if event.noop() {
            return Ok(());
        }

        match event.kind() {
            EventKind::Read => self.issue_read(event),
            EventKind::Write => self.issue_write(event),
            EventKind::Erase => self.issue_erase(event),
            kind => Err(SimError::DeviceFailure(format!(
                "{:?} is not a primitive device operation",
                kind
            ))),
        }
    }

    fn issue_read(&mut self, event: &mut Event) -> Result<()> {
        let address = required_address(event, AddressLevel::Page)?;
        let ppn = address.linear();
        self.check_ppn(ppn)?;

        let duration =
            self.config.bus_ctrl_delay + self.config.bus_data_delay + self.config.page_read_delay;
        self.lock_channel(address.channel(), event, duration);

        event.set_payload(self.arena.data(ppn).to_vec());
        Ok(())
    }

    fn issue_write(&mut self, event: &mut Event) -> Result<()> {
        let address = required_address(event, AddressLevel::Page)?;
        let ppn = address.linear();
        self.check_ppn(ppn)?;

        let block_id = address.block_id(&self.config);
        let offset = address.page();
        self.blocks[block_id as usize].write_page(offset)?;

        if let Some(replace) = event.replace_address() {
            let old_ppn = replace.linear();
            self.check_ppn(old_ppn)?;
            let old_block = replace.block_id(&self.config);
            let old_offset = replace.page();
            self.blocks[old_block as usize].invalidate_page(old_offset)?;
        }

        if let Some(payload) = event.payload() {
            self.arena.write_data(ppn, payload);
        }
        if let Some(oob) = event.oob() {
            self.arena.write_oob(ppn, oob);
        }

        let duration =
            self.config.bus_ctrl_delay + self.config.bus_data_delay + self.config.page_write_delay;
        self.lock_channel(address.channel(), event, duration);
        Ok(())
    }

    fn issue_erase(&mut self, event: &mut Event) -> Result<()> {
        let address = event.address().ok_or_else(|| {
            SimError::DeviceFailure("erase event carries no address".to_string())
        })?;
        let block_id = address.block_id(&self.config);
        if block_id >= self.blocks.len() as u32 {
            return Err(SimError::DeviceFailure(format!(
                "block {} out of range ({} blocks)",
                block_id,
                self.blocks.len()
            )));
        }

        let duration = self.config.bus_ctrl_delay + self.config.block_erase_delay;
        self.lock_channel(address.channel(), event, duration);

        let block = &mut self.blocks[block_id as usize];
        block.erase(event.current_time())?;
        self.arena
            .erase_pages(block.physical_base(), self.config.block_size);
        Ok(())
    }

    fn lock_channel(&mut self, channel: u32, event: &mut Event, duration: f64) {
        let wait = self
            .bus
            .channel_mut(channel)
            .lock(event.current_time(), duration);
        event.incr_bus_wait_time(wait);
        event.incr_time_taken(wait + duration);
    }

    fn check_ppn(&self, ppn: u64) -> Result<()> {
        if ppn >= self.config.total_pages() {
            return Err(SimError::DeviceFailure(format!(
                "page {} out of range ({} pages)",
                ppn,
                self.config.total_pages()
            )));
        }
        Ok(())
    }

    /// Next erased page offset inside a block, if any.
    pub fn get_free_page(&self, block_id: u32) -> Option<u32> {
        self.blocks[block_id as usize].next_free_page()
    }

    pub fn page_state(&self, ppn: u64) -> PageState {
        let block_id = (ppn / self.config.block_size as u64) as usize;
        let offset = (ppn % self.config.block_size as u64) as u32;
        self.blocks[block_id].state(offset)
    }

    pub fn block(&self, block_id: u32) -> &Block {
        &self.blocks[block_id as usize]
    }

    pub fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }

    pub fn page_data(&self, ppn: u64) -> &[u8] {
        self.arena.data(ppn)
    }

    pub fn page_oob(&self, ppn: u64) -> &[u8] {
        self.arena.oob(ppn)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

fn required_address(event: &Event, level: AddressLevel) -> Result<Address> {
    let address = event.address().ok_or_else(|| {
        SimError::DeviceFailure(format!("{:?} event carries no address", event.kind()))
    })?;
    if address.level() < level {
        return Err(SimError::DeviceFailure(format!(
            "{:?} event needs a {:?}-level address, got {:?}",
            event.kind(),
            level,
            address.level()
        )));
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nand() -> Nand {
        Nand::new(&SimConfig::default())
    }

    fn write_event(ppn: u64, start: f64, nand: &Nand) -> Event {
        let mut event = Event::new(EventKind::Write, 0, 1, start);
        event.set_address(Address::page_level(ppn, nand.config()));
        event
    }

    #[test]
    fn write_then_read_round_trips_payload() {
        let mut nand = nand();
        let mut write = write_event(7, 0.0, &nand);
        write.set_payload(b"hello".to_vec());
        nand.issue(&mut write).unwrap();

        let mut read = Event::new(EventKind::Read, 0, 1, 100.0);
        read.set_address(Address::page_level(7, nand.config()));
        nand.issue(&mut read).unwrap();

        assert_eq!(nand.page_state(7), PageState::Valid);
        assert_eq!(&read.payload().unwrap()[..5], b"hello");
        assert!(read.time_taken() > 0.0);
    }

    #[test]
    fn noop_event_adds_no_latency() {
        let mut nand = nand();
        let mut event = Event::new(EventKind::Read, 0, 1, 0.0);
        event.set_address(Address::page_level(0, nand.config()));
        event.set_noop(true);

        nand.issue(&mut event).unwrap();

        assert_eq!(event.time_taken(), 0.0);
        assert_eq!(event.bus_wait_time(), 0.0);
    }

    #[test]
    fn write_with_replace_invalidates_old_page() {
        let mut nand = nand();
        let mut first = write_event(0, 0.0, &nand);
        nand.issue(&mut first).unwrap();

        let mut second = write_event(1, 10.0, &nand);
        second.set_replace_address(Address::page_level(0, nand.config()));
        nand.issue(&mut second).unwrap();

        assert_eq!(nand.page_state(0), PageState::Invalid);
        assert_eq!(nand.page_state(1), PageState::Valid);
    }

    #[test]
    fn double_program_is_a_device_failure() {
        let mut nand = nand();
        let mut first = write_event(3, 0.0, &nand);
        nand.issue(&mut first).unwrap();

        let mut again = write_event(3, 1.0, &nand);
        let result = nand.issue(&mut again);

        assert!(matches!(result, Err(SimError::DeviceFailure(_))));
    }

    #[test]
    fn erase_frees_every_page_of_the_block() {
        let mut nand = nand();
        for i in 0..4 {
            let mut w = write_event(i, i as f64, &nand);
            w.set_payload(vec![0xAB; 16]);
            nand.issue(&mut w).unwrap();
        }

        // Start late enough that the channel is idle again.
        let mut erase = Event::new(EventKind::Erase, 0, 1, 5000.0);
        erase.set_address(Address::block_level(0, nand.config()));
        nand.issue(&mut erase).unwrap();

        assert_eq!(nand.block(0).block_state(), BlockState::Free);
        assert_eq!(nand.page_state(0), PageState::Empty);
        assert_eq!(nand.page_data(0), vec![0u8; nand.config().page_size].as_slice());
        assert_eq!(erase.time_taken(), 2.0 + 1500.0);
        assert_eq!(erase.bus_wait_time(), 0.0);
    }

    #[test]
    fn same_channel_events_queue_behind_each_other() {
        let mut nand = nand();
        let mut first = write_event(0, 0.0, &nand);
        nand.issue(&mut first).unwrap();

        // Same package, arriving while the first transfer is in flight.
        let mut second = write_event(1, 1.0, &nand);
        nand.issue(&mut second).unwrap();

        assert!(second.bus_wait_time() > 0.0);
    }

    #[test]
    fn different_channels_do_not_contend() {
        let mut nand = nand();
        let pages_per_package =
            nand.config().blocks_per_package() as u64 * nand.config().block_size as u64;

        let mut first = write_event(0, 0.0, &nand);
        nand.issue(&mut first).unwrap();
        let mut second = write_event(pages_per_package, 1.0, &nand);
        nand.issue(&mut second).unwrap();

        assert_eq!(second.bus_wait_time(), 0.0);
    }

    #[test]
    fn get_free_page_tracks_programming() {
        let mut nand = nand();
        assert_eq!(nand.get_free_page(0), Some(0));

        let mut w = write_event(0, 0.0, &nand);
        nand.issue(&mut w).unwrap();

        assert_eq!(nand.get_free_page(0), Some(1));
    }
}

//! # Event Record
//!
//! Host reads and writes, TRIMs, and the primitive sub-events garbage
//! collection spawns are all carried by an [`Event`] as they flow through
//! the simulator. The event accumulates simulated latency as
//! it walks through the FTL and the device model; adding to
//! `time_taken` is the *only* way simulation time advances inside the
//! core.
//!
//! ## Lifecycle
//!
//! The driver constructs an event with a logical address and a start
//! time. The FTL annotates it with a physical [`Address`] (and, for
//! overwrites, a `replace_address` naming the page the device must
//! invalidate), then issues it to the device, which adds bus and cell
//! latencies. An event flagged `noop` completes without touching the
//! device; this is how reads of never-written data are represented.
//!
//! ## Payload and OOB
//!
//! `payload` carries page data bytes; `oob` carries the mapping-table
//! image written to the page's spare area in the same program operation
//! as the data. That single-write coupling of data and metadata is the
//! property that lets the mapping scheme skip separate metadata commits.

use crate::address::Address;

/// The primitive operation an [`Event`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Read,
    Write,
    Erase,
    Merge,
    Trim,
}

/// One in-flight operation and its accumulated accounting.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    logical_address: u64,
    size: u32,
    start_time: f64,
    time_taken: f64,
    bus_wait_time: f64,
    address: Option<Address>,
    replace_address: Option<Address>,
    payload: Option<Vec<u8>>,
    oob: Option<Vec<u8>>,
    noop: bool,
}

impl Event {
    pub fn new(kind: EventKind, logical_address: u64, size: u32, start_time: f64) -> Self {
        Self {
            kind,
            logical_address,
            size,
            start_time,
            time_taken: 0.0,
            bus_wait_time: 0.0,
            address: None,
            replace_address: None,
            payload: None,
            oob: None,
            noop: false,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn logical_address(&self) -> u64 {
        self.logical_address
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn time_taken(&self) -> f64 {
        self.time_taken
    }

    pub fn bus_wait_time(&self) -> f64 {
        self.bus_wait_time
    }

    /// Simulated wall-clock position of this event: start plus everything
    /// accrued so far.
    pub fn current_time(&self) -> f64 {
        self.start_time + self.time_taken
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn replace_address(&self) -> Option<Address> {
        self.replace_address
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn oob(&self) -> Option<&[u8]> {
        self.oob.as_deref()
    }

    pub fn noop(&self) -> bool {
        self.noop
    }

    pub fn set_address(&mut self, address: Address) {
        self.address = Some(address);
    }

    pub fn set_replace_address(&mut self, address: Address) {
        self.replace_address = Some(address);
    }

    pub fn set_noop(&mut self, noop: bool) {
        self.noop = noop;
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = Some(payload);
    }

    pub fn take_payload(&mut self) -> Option<Vec<u8>> {
        self.payload.take()
    }

    pub fn set_oob(&mut self, oob: Vec<u8>) {
        self.oob = Some(oob);
    }

    /// Accrue simulated latency; returns the new total.
    pub fn incr_time_taken(&mut self, delta: f64) -> f64 {
        debug_assert!(delta >= 0.0, "time cannot run backwards");
        self.time_taken += delta;
        self.time_taken
    }

    /// Accrue bus contention wait; returns the new total.
    pub fn incr_bus_wait_time(&mut self, delta: f64) -> f64 {
        debug_assert!(delta >= 0.0, "time cannot run backwards");
        self.bus_wait_time += delta;
        self.bus_wait_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_has_zeroed_accounting() {
        let event = Event::new(EventKind::Read, 42, 1, 10.0);

        assert_eq!(event.kind(), EventKind::Read);
        assert_eq!(event.logical_address(), 42);
        assert_eq!(event.size(), 1);
        assert_eq!(event.start_time(), 10.0);
        assert_eq!(event.time_taken(), 0.0);
        assert_eq!(event.bus_wait_time(), 0.0);
        assert!(event.address().is_none());
        assert!(event.replace_address().is_none());
        assert!(!event.noop());
    }

    #[test]
    fn time_accrues_monotonically() {
        let mut event = Event::new(EventKind::Write, 0, 1, 5.0);

        assert_eq!(event.incr_time_taken(1.5), 1.5);
        assert_eq!(event.incr_time_taken(2.5), 4.0);
        assert_eq!(event.current_time(), 9.0);
    }

    #[test]
    fn bus_wait_tracked_separately() {
        let mut event = Event::new(EventKind::Read, 0, 1, 0.0);

        event.incr_bus_wait_time(3.0);
        event.incr_time_taken(3.0);

        assert_eq!(event.bus_wait_time(), 3.0);
        assert_eq!(event.time_taken(), 3.0);
    }
}

//! # Mapping Store
//!
//! RAM image of the OOB-resident mapping state, per logical block:
//!
//! - **PMD**: the anchor array. `pmd[lbn][i]` names the PPN whose spare
//!   area holds the authoritative snapshot of PMT fragment `i`.
//! - **PMT**: the slot grids. `pmt[lbn][i][s]` is the PPN currently
//!   holding that logical page, mirroring in RAM what is physically in
//!   the anchor's OOB. The RAM copy is authoritative for simulation.
//! - **rmap**: the reverse map PPN -> (LBN, fragment, slot), maintained
//!   so garbage collection can rewrite the forward map after relocating
//!   a valid page without scanning every grid.
//!
//! ## Invariants
//!
//! After every operation returns:
//!
//! 1. `rmap[ppn] == (l, i, s)` iff `pmt[l][i][s] == ppn` (exact inverse)
//! 2. an anchor, when set, equals some live slot of its own fragment
//! 3. no PPN appears in two distinct slots
//!
//! [`MappingStore::check_invariants`] verifies all three; the test
//! suites call it after every mutation sequence.
//!
//! ## Lifecycle
//!
//! Rows are created lazily on the first write to any LPN of a logical
//! block and never deleted; TRIM only clears slots. `commit_write`
//! returns the state it replaced so a failed device write can be undone
//! exactly ([`MappingStore::undo_write`]).

use hashbrown::HashMap;
use smallvec::SmallVec;

/// Logical block number.
pub type Lbn = u64;
/// Physical page number.
pub type Ppn = u64;

/// Where an LPN lives in the mapping grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapTarget {
    pub lbn: Lbn,
    pub pmd_index: u32,
    pub map_slot: u32,
}

/// Reverse-map entry: which slot a physical page currently represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RmapEntry {
    pub lbn: Lbn,
    pub pmd_index: u32,
    pub map_slot: u32,
}

/// Snapshot returned by [`MappingStore::commit_write`], sufficient to
/// undo the mutation if the device subsequently fails the write.
#[derive(Debug, Clone, Copy)]
pub struct WriteUndo {
    pub prev_slot: Option<Ppn>,
    pub prev_anchor: Option<Ppn>,
}

type PmdRow = SmallVec<[Option<Ppn>; 8]>;

/// PMD anchors, PMT grids, and the reverse map for every logical block
/// touched so far.
#[derive(Debug)]
pub struct MappingStore {
    num_pmd: u32,
    q: u32,
    pmd: HashMap<Lbn, PmdRow>,
    pmt: HashMap<Lbn, Vec<Box<[Option<Ppn>]>>>,
    rmap: HashMap<Ppn, RmapEntry>,
}

impl MappingStore {
    pub fn new(num_pmd: u32, q: u32) -> Self {
        Self {
            num_pmd,
            q,
            pmd: HashMap::new(),
            pmt: HashMap::new(),
            rmap: HashMap::new(),
        }
    }

    pub fn num_pmd(&self) -> u32 {
        self.num_pmd
    }

    pub fn pmt_slots(&self) -> u32 {
        self.q
    }

    /// Whether any LPN of this logical block has ever been written.
    pub fn has_lbn(&self, lbn: Lbn) -> bool {
        self.pmd.contains_key(&lbn)
    }

    /// The anchor PPN of a fragment, if the row exists and is mapped.
    pub fn anchor(&self, lbn: Lbn, pmd_index: u32) -> Option<Ppn> {
        self.pmd.get(&lbn).and_then(|row| row[pmd_index as usize])
    }

    /// The PPN a slot currently maps to.
    pub fn slot(&self, target: MapTarget) -> Option<Ppn> {
        self.pmt
            .get(&target.lbn)
            .and_then(|grid| grid[target.pmd_index as usize][target.map_slot as usize])
    }

    /// Reverse lookup: which slot a PPN represents.
    pub fn rmap_lookup(&self, ppn: Ppn) -> Option<RmapEntry> {
        self.rmap.get(&ppn).copied()
    }

    /// Live mapping entries (equals the count of distinct mapped LPNs).
    pub fn mapped_pages(&self) -> usize {
        self.rmap.len()
    }

    /// The Q slots of one fragment. Row must exist.
    pub fn fragment_slots(&self, lbn: Lbn, pmd_index: u32) -> &[Option<Ppn>] {
        &self.pmt[&lbn][pmd_index as usize]
    }

    /// Create the PMD row and PMT grid for a logical block if absent.
    pub fn ensure_rows(&mut self, lbn: Lbn) {
        let num_pmd = self.num_pmd as usize;
        let q = self.q as usize;
        self.pmd
            .entry(lbn)
            .or_insert_with(|| std::iter::repeat(None).take(num_pmd).collect());
        self.pmt.entry(lbn).or_insert_with(|| {
            (0..num_pmd)
                .map(|_| vec![None; q].into_boxed_slice())
                .collect()
        });
    }

    /// Point a slot (and its fragment's anchor) at a freshly programmed
    /// page. Creates the rows if needed. Returns the displaced state for
    /// rollback; the caller is responsible for invalidating the old PPN
    /// at the device via the event's replace address.
    pub fn commit_write(&mut self, target: MapTarget, new_ppn: Ppn) -> WriteUndo {
        self.ensure_rows(target.lbn);

        let grid = self.pmt.get_mut(&target.lbn).unwrap();
        let slot = &mut grid[target.pmd_index as usize][target.map_slot as usize];
        let prev_slot = slot.replace(new_ppn);

        let row = self.pmd.get_mut(&target.lbn).unwrap();
        let prev_anchor = std::mem::replace(&mut row[target.pmd_index as usize], Some(new_ppn));

        if let Some(old) = prev_slot {
            self.rmap.remove(&old);
        }
        self.rmap.insert(
            new_ppn,
            RmapEntry {
                lbn: target.lbn,
                pmd_index: target.pmd_index,
                map_slot: target.map_slot,
            },
        );

        WriteUndo {
            prev_slot,
            prev_anchor,
        }
    }

    /// Reverse a [`commit_write`](Self::commit_write) after a device
    /// failure. Lazily created rows are left in place; empty rows are
    /// indistinguishable from never-written ones.
    pub fn undo_write(&mut self, target: MapTarget, new_ppn: Ppn, undo: WriteUndo) {
        let grid = self.pmt.get_mut(&target.lbn).unwrap();
        grid[target.pmd_index as usize][target.map_slot as usize] = undo.prev_slot;

        let row = self.pmd.get_mut(&target.lbn).unwrap();
        row[target.pmd_index as usize] = undo.prev_anchor;

        self.rmap.remove(&new_ppn);
        if let Some(old) = undo.prev_slot {
            self.rmap.insert(
                old,
                RmapEntry {
                    lbn: target.lbn,
                    pmd_index: target.pmd_index,
                    map_slot: target.map_slot,
                },
            );
        }
    }

    /// Clear a slot (TRIM). Returns the orphaned PPN, if the slot was
    /// mapped. Anchors are left untouched: the anchor page still carries
    /// the fragment snapshot even when this slot no longer points at it.
    pub fn clear_slot(&mut self, target: MapTarget) -> Option<Ppn> {
        let grid = self.pmt.get_mut(&target.lbn)?;
        let slot = &mut grid[target.pmd_index as usize][target.map_slot as usize];
        let old = slot.take();
        if let Some(ppn) = old {
            self.rmap.remove(&ppn);
        }
        old
    }

    /// Rewrite the mapping after garbage collection moved a valid page
    /// from `old_ppn` to `new_ppn`: forward slot, fragment anchor, and
    /// reverse map all follow. Returns the entry when the page was live,
    /// `None` for orphans (e.g. TRIMmed pages), which need no rewrite.
    pub fn relocate(&mut self, old_ppn: Ppn, new_ppn: Ppn) -> Option<RmapEntry> {
        let entry = self.rmap.remove(&old_ppn)?;

        let grid = self.pmt.get_mut(&entry.lbn).unwrap();
        grid[entry.pmd_index as usize][entry.map_slot as usize] = Some(new_ppn);

        let row = self.pmd.get_mut(&entry.lbn).unwrap();
        row[entry.pmd_index as usize] = Some(new_ppn);

        self.rmap.insert(new_ppn, entry);
        Some(entry)
    }

    /// Install a fragment snapshot wholesale (recovery scan). Existing
    /// slots of the fragment are dropped from the reverse map first, so
    /// a newer image fully supersedes an older one.
    pub fn restore_fragment(
        &mut self,
        lbn: Lbn,
        pmd_index: u32,
        slots: &[Option<Ppn>],
        anchor_ppn: Ppn,
    ) {
        debug_assert_eq!(slots.len(), self.q as usize);
        self.ensure_rows(lbn);

        let grid = self.pmt.get_mut(&lbn).unwrap();
        let row = &mut grid[pmd_index as usize];
        for slot in row.iter().flatten() {
            self.rmap.remove(slot);
        }
        for (s, slot) in slots.iter().enumerate() {
            row[s] = *slot;
            if let Some(ppn) = slot {
                self.rmap.insert(
                    *ppn,
                    RmapEntry {
                        lbn,
                        pmd_index,
                        map_slot: s as u32,
                    },
                );
            }
        }

        let anchors = self.pmd.get_mut(&lbn).unwrap();
        anchors[pmd_index as usize] = Some(anchor_ppn);
    }

    /// Verify the store's internal invariants; returns a description of
    /// the first violation found. Test support.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let mut seen: HashMap<Ppn, RmapEntry> = HashMap::new();

        for (&lbn, grid) in &self.pmt {
            for (i, row) in grid.iter().enumerate() {
                for (s, slot) in row.iter().enumerate() {
                    let Some(ppn) = slot else { continue };
                    let entry = RmapEntry {
                        lbn,
                        pmd_index: i as u32,
                        map_slot: s as u32,
                    };
                    if let Some(first) = seen.insert(*ppn, entry) {
                        return Err(format!(
                            "ppn {} mapped twice: {:?} and {:?}",
                            ppn, first, entry
                        ));
                    }
                    match self.rmap.get(ppn) {
                        Some(back) if *back == entry => {}
                        other => {
                            return Err(format!(
                                "rmap for ppn {} is {:?}, slot says {:?}",
                                ppn, other, entry
                            ))
                        }
                    }
                }
            }
        }

        for (&ppn, entry) in &self.rmap {
            if seen.get(&ppn) != Some(entry) {
                return Err(format!("stale rmap entry {} -> {:?}", ppn, entry));
            }
        }

        for (&lbn, row) in &self.pmd {
            for (i, anchor) in row.iter().enumerate() {
                let Some(anchor_ppn) = anchor else { continue };
                let fragment = &self.pmt[&lbn][i];
                let anchor_live = fragment.iter().any(|slot| slot == anchor);
                if !anchor_live && !self.rmap.contains_key(anchor_ppn) {
                    continue; // fragment fully trimmed; anchor page is merely stale
                }
                if !anchor_live {
                    return Err(format!(
                        "anchor {} of lbn {} fragment {} matches no live slot",
                        anchor_ppn, lbn, i
                    ));
                }
            }
        }

        Ok(())
    }
}

//! # Default Configuration Constants
//!
//! Default geometry and timing values, grouped so that interdependent
//! constants are co-located. When changing any constant, check whether a
//! dependent constant needs adjustment.
//!
//! ## Dependency Graph
//!
//! ```text
//! DEFAULT_BLOCK_SIZE (P, 64 pages per block)
//!       │
//!       └─> DEFAULT_PMD_PER_BLOCK (derived: ceil(P / Q))
//!
//! DEFAULT_OOB_SIZE (64 bytes)
//!       │
//!       ├─> DEFAULT_PMT_SLOTS (Q, derived: OOB_SIZE / ENTRY_SIZE)
//!       │     Entry size must divide the OOB size exactly, or slots
//!       │     would straddle the end of the spare area.
//!       │
//!       └─> OOB header bytes are carried in addition to the PMT area
//!           (the spare-area tag naming the fragment; see ftl::mnftl::oob)
//! ```
//!
//! ## Critical Invariants
//!
//! Enforced by compile-time assertions below:
//!
//! 1. `DEFAULT_ENTRY_SIZE` divides `DEFAULT_OOB_SIZE` exactly
//! 2. `DEFAULT_PMT_SLOTS == DEFAULT_OOB_SIZE / DEFAULT_ENTRY_SIZE`
//! 3. `DEFAULT_PMD_PER_BLOCK` covers every page of a block
//!
//! ## Timing Units
//!
//! All delays are simulated microseconds. Time advances only by adding
//! these values to an event's accumulated time.

// ============================================================================
// GEOMETRY DEFAULTS
// Hierarchy: package > die > plane > block > page
// ============================================================================

/// Bytes per NAND page.
pub const DEFAULT_PAGE_SIZE: usize = 2048;

/// Pages per physical block (P).
pub const DEFAULT_BLOCK_SIZE: u32 = 64;

/// Packages on the SSD (one bus channel per package).
pub const DEFAULT_SSD_SIZE: u32 = 4;

/// Dies per package.
pub const DEFAULT_PACKAGE_SIZE: u32 = 2;

/// Planes per die.
pub const DEFAULT_DIE_SIZE: u32 = 2;

/// Blocks per plane.
pub const DEFAULT_PLANE_SIZE: u32 = 32;

/// Blocks exposed to the host. The remainder of the physical blocks is
/// over-provisioning that keeps the free pool from starving under GC.
pub const DEFAULT_ADDRESSABLE_BLOCKS: u32 = 460;

/// Erase cycles a block survives before the device reports failure.
pub const DEFAULT_BLOCK_ERASES: u64 = 100_000;

// ============================================================================
// MAPPING LAYOUT
// These determine how much of the LPN->PPN map one OOB snapshot carries
// ============================================================================

/// Bytes of each page's OOB area reserved for the PMT fragment image.
pub const DEFAULT_OOB_SIZE: u32 = 64;

/// Bytes per PMT entry in the OOB image (one signed 64-bit PPN).
pub const DEFAULT_ENTRY_SIZE: u32 = 8;

/// PMT slots per OOB region (Q).
pub const DEFAULT_PMT_SLOTS: u32 = DEFAULT_OOB_SIZE / DEFAULT_ENTRY_SIZE;

/// PMT fragments per logical block (NUM_PMD = ceil(P / Q)).
pub const DEFAULT_PMD_PER_BLOCK: u32 =
    (DEFAULT_BLOCK_SIZE + DEFAULT_PMT_SLOTS - 1) / DEFAULT_PMT_SLOTS;

/// Spare-area bytes per page carried in addition to the PMT image: the
/// tag naming which fragment the snapshot belongs to. Must match the
/// fragment tag header layout in `ftl::mnftl::oob`.
pub const OOB_TAG_SIZE: usize = 8;

const _: () = assert!(
    DEFAULT_OOB_SIZE % DEFAULT_ENTRY_SIZE == 0,
    "DEFAULT_ENTRY_SIZE must divide DEFAULT_OOB_SIZE exactly"
);

const _: () = assert!(
    DEFAULT_PMT_SLOTS == DEFAULT_OOB_SIZE / DEFAULT_ENTRY_SIZE,
    "DEFAULT_PMT_SLOTS derivation mismatch"
);

const _: () = assert!(
    DEFAULT_PMD_PER_BLOCK * DEFAULT_PMT_SLOTS >= DEFAULT_BLOCK_SIZE,
    "DEFAULT_PMD_PER_BLOCK must cover every page of a block"
);

// ============================================================================
// TIMING DEFAULTS (microseconds)
// ============================================================================

/// Cost of fetching one PMT fragment from a page's OOB area. This is the
/// defining cost of the OOB-resident mapping scheme.
pub const DEFAULT_OOB_READ_DELAY: f64 = 1.7;

/// SRAM access cost.
pub const DEFAULT_RAM_READ_DELAY: f64 = 0.01;

/// NAND page read latency.
pub const DEFAULT_PAGE_READ_DELAY: f64 = 25.0;

/// NAND page program latency.
pub const DEFAULT_PAGE_WRITE_DELAY: f64 = 200.0;

/// Block erase latency.
pub const DEFAULT_BLOCK_ERASE_DELAY: f64 = 1500.0;

/// Bus control-cycle overhead per primitive event.
pub const DEFAULT_BUS_CTRL_DELAY: f64 = 2.0;

/// Bus data-transfer time for one page.
pub const DEFAULT_BUS_DATA_DELAY: f64 = 10.0;

// ============================================================================
// SHARED FTL CONFIG
// ============================================================================

/// Cached mapping entries for the DFTL family. Recognized so shared config
/// files load cleanly; the OOB-resident scheme keeps no SRAM cache.
pub const DEFAULT_CACHE_DFTL_LIMIT: u32 = 64;

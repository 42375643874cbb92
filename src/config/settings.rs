//! # Runtime Settings
//!
//! [`SimConfig`] holds every option the simulator recognizes, loaded once
//! at startup and constant for the duration of a run. Everything downstream
//! copies the derived values it needs at construction time; nothing mutates
//! the config afterwards.
//!
//! ## File Format
//!
//! Config files are line-oriented `KEY value` pairs:
//!
//! ```text
//! # geometry
//! BLOCK_SIZE 64
//! PLANE_SIZE 32
//!
//! # timing (microseconds)
//! PAGE_READ_DELAY 25.0
//! OOB_READ_DELAY 1.7
//! ```
//!
//! Blank lines and `#` comments are ignored. Unknown keys are rejected so
//! a typo cannot silently fall back to a default.

use std::path::Path;

use crate::config::constants::*;
use crate::error::{Result, SimError};

/// Validated simulator configuration.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Bytes per NAND page.
    pub page_size: usize,
    /// Pages per physical block (P).
    pub block_size: u32,
    /// Packages (bus channels).
    pub ssd_size: u32,
    /// Dies per package.
    pub package_size: u32,
    /// Planes per die.
    pub die_size: u32,
    /// Blocks per plane.
    pub plane_size: u32,
    /// Blocks exposed to the host.
    pub addressable_blocks: u32,
    /// Erase cycles per block before the device fails the erase.
    pub block_erases: u64,
    /// OOB bytes reserved for the PMT fragment image.
    pub oob_size: u32,
    /// Bytes per PMT entry in the OOB image.
    pub entry_size: u32,
    /// PMT fragment fetch cost from OOB (µs).
    pub oob_read_delay: f64,
    /// SRAM access cost (µs).
    pub ram_read_delay: f64,
    /// Page read latency (µs).
    pub page_read_delay: f64,
    /// Page program latency (µs).
    pub page_write_delay: f64,
    /// Block erase latency (µs).
    pub block_erase_delay: f64,
    /// Bus control-cycle overhead (µs).
    pub bus_ctrl_delay: f64,
    /// Bus page-transfer time (µs).
    pub bus_data_delay: f64,
    /// SRAM mapping-cache entries for the DFTL family; recognized but
    /// unused by the OOB-resident scheme.
    pub cache_dftl_limit: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            ssd_size: DEFAULT_SSD_SIZE,
            package_size: DEFAULT_PACKAGE_SIZE,
            die_size: DEFAULT_DIE_SIZE,
            plane_size: DEFAULT_PLANE_SIZE,
            addressable_blocks: DEFAULT_ADDRESSABLE_BLOCKS,
            block_erases: DEFAULT_BLOCK_ERASES,
            oob_size: DEFAULT_OOB_SIZE,
            entry_size: DEFAULT_ENTRY_SIZE,
            oob_read_delay: DEFAULT_OOB_READ_DELAY,
            ram_read_delay: DEFAULT_RAM_READ_DELAY,
            page_read_delay: DEFAULT_PAGE_READ_DELAY,
            page_write_delay: DEFAULT_PAGE_WRITE_DELAY,
            block_erase_delay: DEFAULT_BLOCK_ERASE_DELAY,
            bus_ctrl_delay: DEFAULT_BUS_CTRL_DELAY,
            bus_data_delay: DEFAULT_BUS_DATA_DELAY,
            cache_dftl_limit: DEFAULT_CACHE_DFTL_LIMIT,
        }
    }
}

impl SimConfig {
    /// Load a config file, apply it over the defaults, and validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SimError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_str_checked(&text)
    }

    /// Parse config text, apply it over the defaults, and validate.
    pub fn from_str_checked(text: &str) -> Result<Self> {
        let mut config = Self::default();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.split_whitespace();
            let key = parts.next().unwrap_or("");
            let value = parts.next().ok_or_else(|| {
                SimError::Config(format!("line {}: '{}' has no value", line_no + 1, key))
            })?;
            if parts.next().is_some() {
                return Err(SimError::Config(format!(
                    "line {}: trailing tokens after '{} {}'",
                    line_no + 1,
                    key,
                    value
                )));
            }

            config.apply(key, value, line_no + 1)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str, line_no: usize) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str, line_no: usize) -> Result<T> {
            value.parse().map_err(|_| {
                SimError::Config(format!(
                    "line {}: invalid value '{}' for {}",
                    line_no, value, key
                ))
            })
        }

        match key {
            "PAGE_SIZE" => self.page_size = parse(key, value, line_no)?,
            "BLOCK_SIZE" => self.block_size = parse(key, value, line_no)?,
            "SSD_SIZE" => self.ssd_size = parse(key, value, line_no)?,
            "PACKAGE_SIZE" => self.package_size = parse(key, value, line_no)?,
            "DIE_SIZE" => self.die_size = parse(key, value, line_no)?,
            "PLANE_SIZE" => self.plane_size = parse(key, value, line_no)?,
            "NUMBER_OF_ADDRESSABLE_BLOCKS" => {
                self.addressable_blocks = parse(key, value, line_no)?
            }
            "BLOCK_ERASES" => self.block_erases = parse(key, value, line_no)?,
            "MNFTL_OOB_SIZE" => self.oob_size = parse(key, value, line_no)?,
            "MNFTL_ENTRY_SIZE" => self.entry_size = parse(key, value, line_no)?,
            "OOB_READ_DELAY" => self.oob_read_delay = parse(key, value, line_no)?,
            "RAM_READ_DELAY" => self.ram_read_delay = parse(key, value, line_no)?,
            "PAGE_READ_DELAY" => self.page_read_delay = parse(key, value, line_no)?,
            "PAGE_WRITE_DELAY" => self.page_write_delay = parse(key, value, line_no)?,
            "BLOCK_ERASE_DELAY" => self.block_erase_delay = parse(key, value, line_no)?,
            "BUS_CTRL_DELAY" => self.bus_ctrl_delay = parse(key, value, line_no)?,
            "BUS_DATA_DELAY" => self.bus_data_delay = parse(key, value, line_no)?,
            "CACHE_DFTL_LIMIT" => self.cache_dftl_limit = parse(key, value, line_no)?,
            _ => {
                return Err(SimError::Config(format!(
                    "line {}: unrecognized option '{}'",
                    line_no, key
                )))
            }
        }
        Ok(())
    }

    /// Check cross-field consistency. Called by the loaders; call directly
    /// after building a config by hand.
    pub fn validate(&self) -> Result<()> {
        fn ensure(cond: bool, msg: impl Into<String>) -> Result<()> {
            if cond {
                Ok(())
            } else {
                Err(SimError::Config(msg.into()))
            }
        }

        ensure(self.page_size > 0, "PAGE_SIZE must be non-zero")?;
        ensure(self.block_size > 0, "BLOCK_SIZE must be non-zero")?;
        ensure(
            self.ssd_size > 0
                && self.package_size > 0
                && self.die_size > 0
                && self.plane_size > 0,
            "geometry dimensions must all be non-zero",
        )?;
        ensure(self.entry_size > 0, "MNFTL_ENTRY_SIZE must be non-zero")?;
        ensure(
            self.oob_size % self.entry_size == 0,
            format!(
                "MNFTL_ENTRY_SIZE {} must divide MNFTL_OOB_SIZE {}",
                self.entry_size, self.oob_size
            ),
        )?;
        ensure(
            self.oob_size / self.entry_size > 0,
            "OOB area must hold at least one PMT entry",
        )?;
        ensure(
            self.addressable_blocks <= self.total_blocks(),
            format!(
                "NUMBER_OF_ADDRESSABLE_BLOCKS {} exceeds {} physical blocks",
                self.addressable_blocks,
                self.total_blocks()
            ),
        )?;
        ensure(self.addressable_blocks > 0, "addressable range is empty")?;

        for (name, delay) in [
            ("OOB_READ_DELAY", self.oob_read_delay),
            ("RAM_READ_DELAY", self.ram_read_delay),
            ("PAGE_READ_DELAY", self.page_read_delay),
            ("PAGE_WRITE_DELAY", self.page_write_delay),
            ("BLOCK_ERASE_DELAY", self.block_erase_delay),
            ("BUS_CTRL_DELAY", self.bus_ctrl_delay),
            ("BUS_DATA_DELAY", self.bus_data_delay),
        ] {
            ensure(
                delay.is_finite() && delay >= 0.0,
                format!("{} must be finite and non-negative", name),
            )?;
        }

        Ok(())
    }

    /// Pages per physical block (P).
    pub fn pages_per_block(&self) -> u32 {
        self.block_size
    }

    /// PMT slots per OOB region (Q).
    pub fn pmt_slots(&self) -> u32 {
        self.oob_size / self.entry_size
    }

    /// PMT fragments per logical block (NUM_PMD).
    pub fn pmd_per_block(&self) -> u32 {
        let q = self.pmt_slots();
        (self.block_size + q - 1) / q
    }

    /// Physical blocks on the device.
    pub fn total_blocks(&self) -> u32 {
        self.ssd_size * self.package_size * self.die_size * self.plane_size
    }

    /// Physical pages on the device.
    pub fn total_pages(&self) -> u64 {
        self.total_blocks() as u64 * self.block_size as u64
    }

    /// Logical pages the host may address.
    pub fn addressable_pages(&self) -> u64 {
        self.addressable_blocks as u64 * self.block_size as u64
    }

    /// Blocks per package (the channel-selection divisor).
    pub fn blocks_per_package(&self) -> u32 {
        self.package_size * self.die_size * self.plane_size
    }
}

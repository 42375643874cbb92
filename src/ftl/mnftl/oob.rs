//! # OOB Fragment Image
//!
//! The byte layout of one PMT fragment as written to a page's spare
//! area. Every data write carries the updated image of its fragment, so
//! the page whose OOB holds the newest snapshot (the anchor) is always
//! the most recently written page of that fragment, and the whole
//! mapping can be rebuilt by scanning pages in write order.
//!
//! ## Layout
//!
//! ```text
//! Offset  Size  Field      Description
//! ------  ----  ---------  --------------------------------------
//! 0       2     magic      0x4D50 ("PM"), marks a written image
//! 2       2     pmd_index  Fragment index within the logical block
//! 4       4     lbn        Logical block number
//! 8       8*Q   entries    Signed PPNs, little-endian, -1 = unmapped
//! ```
//!
//! The 8-byte tag rides in the spare-area bytes reserved beyond the
//! configured PMT image size (`OOB_TAG_SIZE`); the entries fill the PMT
//! area itself. An erased page's OOB is all zeros and fails the magic
//! check, which is how the recovery scan tells blank spare areas from
//! written ones.

use zerocopy::little_endian::{I64, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::config::OOB_TAG_SIZE;
use crate::error::{Result, SimError};

/// Marks a spare area that carries a fragment image.
pub const OOB_MAGIC: u16 = 0x4D50;

/// Sentinel for an unmapped slot in the fixed-width on-device image.
const UNMAPPED: i64 = -1;

/// Spare-area tag naming the fragment a PMT snapshot belongs to.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FragmentTag {
    magic: U16,
    pmd_index: U16,
    lbn: U32,
}

const _: () = assert!(
    size_of::<FragmentTag>() == OOB_TAG_SIZE,
    "FragmentTag layout must match the spare-area tag reservation"
);

impl FragmentTag {
    pub fn new(lbn: u32, pmd_index: u16) -> Self {
        Self {
            magic: U16::new(OOB_MAGIC),
            pmd_index: U16::new(pmd_index),
            lbn: U32::new(lbn),
        }
    }

    pub fn is_written(&self) -> bool {
        self.magic.get() == OOB_MAGIC
    }

    pub fn lbn(&self) -> u32 {
        self.lbn.get()
    }

    pub fn pmd_index(&self) -> u16 {
        self.pmd_index.get()
    }
}

/// A decoded fragment snapshot: which fragment, and its Q slots.
#[derive(Debug, PartialEq, Eq)]
pub struct FragmentImage {
    pub lbn: u32,
    pub pmd_index: u16,
    pub slots: Vec<Option<u64>>,
}

/// Encode a fragment image: tag followed by Q fixed-width entries.
pub fn encode(lbn: u32, pmd_index: u16, slots: &[Option<u64>]) -> Vec<u8> {
    let tag = FragmentTag::new(lbn, pmd_index);
    let mut bytes = Vec::with_capacity(OOB_TAG_SIZE + slots.len() * size_of::<I64>());
    bytes.extend_from_slice(tag.as_bytes());
    for slot in slots {
        let entry = I64::new(slot.map_or(UNMAPPED, |ppn| ppn as i64));
        bytes.extend_from_slice(entry.as_bytes());
    }
    bytes
}

/// Decode a spare area into a fragment image. Returns `Ok(None)` for a
/// blank (never-written) spare area.
pub fn decode(bytes: &[u8], q: u32) -> Result<Option<FragmentImage>> {
    let needed = OOB_TAG_SIZE + q as usize * size_of::<I64>();
    if bytes.len() < needed {
        return Err(SimError::DeviceFailure(format!(
            "spare area too small for fragment image: {} < {}",
            bytes.len(),
            needed
        )));
    }

    let tag = FragmentTag::ref_from_bytes(&bytes[..OOB_TAG_SIZE])
        .map_err(|e| SimError::DeviceFailure(format!("bad fragment tag: {:?}", e)))?;
    if !tag.is_written() {
        return Ok(None);
    }

    let mut slots = Vec::with_capacity(q as usize);
    for i in 0..q as usize {
        let offset = OOB_TAG_SIZE + i * size_of::<I64>();
        let entry = I64::ref_from_bytes(&bytes[offset..offset + size_of::<I64>()])
            .map_err(|e| SimError::DeviceFailure(format!("bad fragment entry: {:?}", e)))?;
        let raw = entry.get();
        slots.push(if raw == UNMAPPED {
            None
        } else {
            Some(raw as u64)
        });
    }

    Ok(Some(FragmentImage {
        lbn: tag.lbn(),
        pmd_index: tag.pmd_index(),
        slots,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_tag_is_8_bytes() {
        assert_eq!(size_of::<FragmentTag>(), 8);
    }

    #[test]
    fn encode_decode_round_trip() {
        let slots = vec![Some(10), None, Some(0), Some(4095)];

        let bytes = encode(7, 3, &slots);
        let image = decode(&bytes, 4).unwrap().unwrap();

        assert_eq!(image.lbn, 7);
        assert_eq!(image.pmd_index, 3);
        assert_eq!(image.slots, slots);
    }

    #[test]
    fn blank_spare_area_decodes_to_none() {
        let bytes = vec![0u8; 8 + 4 * 8];

        let image = decode(&bytes, 4).unwrap();

        assert!(image.is_none());
    }

    #[test]
    fn truncated_spare_area_is_rejected() {
        let bytes = vec![0u8; 8];

        let result = decode(&bytes, 4);

        assert!(result.is_err());
    }

    #[test]
    fn unmapped_slots_use_the_sentinel() {
        let bytes = encode(0, 0, &[None]);

        assert_eq!(&bytes[8..16], &(-1i64).to_le_bytes());
    }
}

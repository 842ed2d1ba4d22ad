//! Page-span math for physical mappings.
//!
//! The driver maps whole pages. A span carries the page-aligned base,
//! the offset of the requested address inside the first page, and the
//! padded mapping length that covers the full request.

/// Mapping granularity of the driver.
pub const PAGE_SIZE: u64 = 4096;

const PAGE_MASK: u64 = PAGE_SIZE - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    /// Page-aligned physical base of the mapping.
    pub base: u64,
    /// Offset of the requested address within the mapping.
    pub offset: usize,
    /// Page-multiple mapping length covering the whole request.
    pub map_len: u64,
}

impl PageSpan {
    /// Smallest page-aligned span covering `len` bytes at `addr`.
    pub fn covering(addr: u64, len: u64) -> Self {
        let offset = addr & PAGE_MASK;
        Self {
            base: addr & !PAGE_MASK,
            offset: offset as usize,
            map_len: (len + offset + PAGE_MASK) & !PAGE_MASK,
        }
    }
}

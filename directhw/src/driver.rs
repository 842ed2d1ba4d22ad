//! The privileged-service boundary.
//!
//! [`DriverPort`] is the seam between the marshaling code and whatever
//! actually executes the request: the IOKit connection to the kext on
//! macOS, or [`crate::mock::MockPort`] everywhere in tests. Transport
//! failures are reported as [`Error::CallFailed`] carrying the raw
//! status, so callers that care (the mapping path) can classify them.

use std::ptr;

use crate::error::{Error, Result};
use crate::wire::Selector;

/// A handle-based struct-call transport to the driver.
pub trait DriverPort {
    /// One synchronous round trip: send `request`, fill `reply` completely.
    fn call(&mut self, selector: Selector, request: &[u8], reply: &mut [u8]) -> Result<()>;

    /// Map a prepared physical range into the process.
    ///
    /// Only valid after a successful `Selector::PrepareMap` call for the
    /// same range.
    fn map_view(&mut self, addr: u64, len: u64) -> Result<MappedRegion>;
}

/// A physical address range mapped into the process.
///
/// Accessors go through volatile loads and stores since the backing pages
/// are device or reserved memory that can change underneath the process.
/// Dropping a region releases nothing: the driver interface defines unmap
/// as a no-op, and the pages stay mapped for the life of the process.
#[derive(Debug)]
pub struct MappedRegion {
    base: *mut u8,
    len: usize,
}

// The region is plain memory owned by nobody else in this process; the
// raw pointer is only non-Send by default because rustc cannot know that.
unsafe impl Send for MappedRegion {}

impl MappedRegion {
    pub(crate) fn from_raw(base: *mut u8, len: usize) -> Self {
        Self { base, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.base
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        if offset.checked_add(len).map_or(true, |end| end > self.len) {
            return Err(Error::OutOfBounds { offset, len, size: self.len });
        }
        Ok(())
    }

    /// Copy `buf.len()` bytes out of the region starting at `offset`.
    pub fn read_bytes(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        self.check(offset, buf.len())?;
        for (i, slot) in buf.iter_mut().enumerate() {
            // SAFETY: bounds checked above; the mapping outlives `self`.
            *slot = unsafe { ptr::read_volatile(self.base.add(offset + i)) };
        }
        Ok(())
    }

    /// Store `bytes` into the region starting at `offset`.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.check(offset, bytes.len())?;
        for (i, b) in bytes.iter().enumerate() {
            // SAFETY: bounds checked above; the mapping outlives `self`.
            unsafe { ptr::write_volatile(self.base.add(offset + i), *b) };
        }
        Ok(())
    }

    /// Read one native-endian dword at `offset` (no alignment required).
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_bytes(offset, &mut bytes)?;
        Ok(u32::from_ne_bytes(bytes))
    }
}

/// Placeholder port for platforms without the kext; every call fails.
#[cfg(not(target_os = "macos"))]
pub struct UnsupportedPort;

#[cfg(not(target_os = "macos"))]
impl DriverPort for UnsupportedPort {
    fn call(&mut self, _selector: Selector, _request: &[u8], _reply: &mut [u8]) -> Result<()> {
        Err(Error::UnsupportedPlatform)
    }

    fn map_view(&mut self, _addr: u64, _len: u64) -> Result<MappedRegion> {
        Err(Error::UnsupportedPlatform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_bounds_are_enforced() {
        let mut backing = vec![0u8; 16];
        let region = MappedRegion::from_raw(backing.as_mut_ptr(), backing.len());

        let mut buf = [0u8; 4];
        assert!(region.read_bytes(12, &mut buf).is_ok());
        assert!(matches!(
            region.read_bytes(13, &mut buf),
            Err(Error::OutOfBounds { offset: 13, len: 4, size: 16 })
        ));
        assert!(region.read_u32(usize::MAX).is_err());
    }

    #[test]
    fn region_write_then_read() {
        let mut backing = vec![0u8; 32];
        let mut region = MappedRegion::from_raw(backing.as_mut_ptr(), backing.len());

        region.write_bytes(8, &[0xde, 0xad, 0xbe, 0xef]).unwrap();
        let mut buf = [0u8; 4];
        region.read_bytes(8, &mut buf).unwrap();
        assert_eq!(buf, [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(region.read_u32(8).unwrap(), u32::from_ne_bytes(buf));
    }
}

//! In-process stand-in for the kernel extension.
//!
//! `MockPort` speaks the same wire format as the real kext: it decodes
//! the request structs, acts on latched port values, per-(cpu, index)
//! MSR cells and registered physical regions, and encodes replies. It
//! also counts round trips, so tests can assert that a request was
//! rejected *before* the driver was contacted.

use std::collections::HashMap;

use crate::driver::{DriverPort, MappedRegion};
use crate::error::{Error, Result, KIO_BAD_ARGUMENT, KIO_NOT_OPEN};
use crate::wire::{IoMessage, MapMessage, MsrMessage, Selector};

struct MockRegion {
    base: u64,
    // Leaked on purpose: mappings are never released by the real driver
    // either, and a stable address lets `MappedRegion` outlive `&mut self`
    // borrows of the port.
    data: &'static mut [u8],
}

/// Emulated driver endpoint backed by plain process memory.
#[derive(Default)]
pub struct MockPort {
    ports: HashMap<u32, u32>,
    msrs: HashMap<(u32, u32), (u32, u32)>,
    regions: Vec<MockRegion>,
    calls: u32,
    closed: bool,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of struct-call round trips the port has seen.
    pub fn calls(&self) -> u32 {
        self.calls
    }

    /// Make every subsequent call fail like a driver that was never opened.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Pre-load a port latch.
    pub fn set_port(&mut self, offset: u32, value: u32) {
        self.ports.insert(offset, value);
    }

    /// Pre-load an MSR cell for one logical CPU.
    pub fn set_msr(&mut self, cpu: u32, index: u32, hi: u32, lo: u32) {
        self.msrs.insert((cpu, index), (hi, lo));
    }

    /// Current MSR cell contents, if any write or preload touched it.
    pub fn msr(&self, cpu: u32, index: u32) -> Option<(u32, u32)> {
        self.msrs.get(&(cpu, index)).copied()
    }

    /// Register backing memory for a physical range starting at `base`.
    pub fn add_region(&mut self, base: u64, data: Vec<u8>) {
        self.regions.push(MockRegion { base, data: Box::leak(data.into_boxed_slice()) });
    }

    /// Register a zero-filled page-sized region with `data` at its start.
    pub fn add_page(&mut self, base: u64, data: &[u8]) {
        let mut page = vec![0u8; crate::phys::PAGE_SIZE as usize];
        page[..data.len()].copy_from_slice(data);
        self.add_region(base, page);
    }

    /// Snapshot `len` bytes of backing memory at physical `addr`.
    pub fn region_bytes(&self, addr: u64, len: usize) -> Option<Vec<u8>> {
        self.regions.iter().find_map(|r| {
            let end = r.base + r.data.len() as u64;
            if addr >= r.base && addr + len as u64 <= end {
                let start = (addr - r.base) as usize;
                Some(r.data[start..start + len].to_vec())
            } else {
                None
            }
        })
    }

    fn find_region(&mut self, addr: u64, len: u64) -> Option<&mut MockRegion> {
        self.regions
            .iter_mut()
            .find(|r| addr >= r.base && addr + len <= r.base + r.data.len() as u64)
    }

    fn fail(selector: Selector, status: i32) -> Error {
        Error::CallFailed { selector, status }
    }
}

fn width_mask(width: u32) -> u32 {
    match width {
        1 => 0xff,
        2 => 0xffff,
        _ => u32::MAX,
    }
}

impl DriverPort for MockPort {
    fn call(&mut self, selector: Selector, request: &[u8], reply: &mut [u8]) -> Result<()> {
        self.calls += 1;
        if self.closed {
            return Err(Self::fail(selector, KIO_NOT_OPEN));
        }

        match selector {
            Selector::ReadIo => {
                let mut msg = IoMessage::decode(request)?;
                let latch = self.ports.get(&msg.offset).copied().unwrap_or(0);
                msg.data = latch & width_mask(msg.width);
                reply.copy_from_slice(&msg.encode());
            }
            Selector::WriteIo => {
                let msg = IoMessage::decode(request)?;
                self.ports.insert(msg.offset, msg.data & width_mask(msg.width));
                reply.copy_from_slice(&msg.encode());
            }
            Selector::PrepareMap => {
                let msg = MapMessage::decode(request)?;
                if self.find_region(msg.addr, msg.size).is_none() {
                    return Err(Self::fail(selector, KIO_BAD_ARGUMENT));
                }
                reply.copy_from_slice(&msg.encode());
            }
            Selector::ReadMsr => {
                let mut msg = MsrMessage::decode(request)?;
                match self.msrs.get(&(msg.core, msg.index)) {
                    Some(&(hi, lo)) => {
                        msg.hi = hi;
                        msg.lo = lo;
                    }
                    None => return Err(Self::fail(selector, KIO_BAD_ARGUMENT)),
                }
                reply.copy_from_slice(&msg.encode());
            }
            Selector::WriteMsr => {
                let msg = MsrMessage::decode(request)?;
                self.msrs.insert((msg.core, msg.index), (msg.hi, msg.lo));
                reply.copy_from_slice(&msg.encode());
            }
        }
        Ok(())
    }

    fn map_view(&mut self, addr: u64, len: u64) -> Result<MappedRegion> {
        match self.find_region(addr, len) {
            Some(region) => {
                let offset = (addr - region.base) as usize;
                Ok(MappedRegion::from_raw(
                    unsafe { region.data.as_mut_ptr().add(offset) },
                    len as usize,
                ))
            }
            None => Err(Self::fail(Selector::PrepareMap, KIO_BAD_ARGUMENT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_latch_masks_to_width() {
        let mut port = MockPort::new();
        port.set_port(0x80, 0xaabb_ccdd);

        let req = IoMessage { offset: 0x80, width: 1, data: 0 };
        let mut reply = [0u8; IoMessage::LEN];
        port.call(Selector::ReadIo, &req.encode(), &mut reply).unwrap();
        assert_eq!(IoMessage::decode(&reply).unwrap().data, 0xdd);
    }

    #[test]
    fn closed_port_reports_not_open() {
        let mut port = MockPort::new();
        port.close();

        let req = IoMessage { offset: 0, width: 1, data: 0 };
        let mut reply = [0u8; IoMessage::LEN];
        let err = port.call(Selector::ReadIo, &req.encode(), &mut reply).unwrap_err();
        assert!(matches!(err, Error::CallFailed { status: KIO_NOT_OPEN, .. }));
    }

    #[test]
    fn prepare_map_requires_a_registered_region() {
        let mut port = MockPort::new();
        let req = MapMessage { addr: 0x1000, size: 0x1000 };
        let mut reply = [0u8; MapMessage::LEN];
        let err = port.call(Selector::PrepareMap, &req.encode(), &mut reply).unwrap_err();
        assert!(matches!(err, Error::CallFailed { status: KIO_BAD_ARGUMENT, .. }));

        port.add_region(0x1000, vec![0u8; 0x1000]);
        port.call(Selector::PrepareMap, &req.encode(), &mut reply).unwrap();
        assert_eq!(MapMessage::decode(&reply).unwrap(), req);
    }
}

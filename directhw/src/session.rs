//! Driver session: the context object every operation hangs off.
//!
//! A session owns one driver connection and the currently selected
//! logical CPU (default 0). Port and MSR operations are a single
//! marshal → struct call → unmarshal round trip; mapping adds the
//! IOKit map step on top of the prepare call.

use log::debug;

use crate::driver::{DriverPort, MappedRegion};
use crate::error::{classify_map_status, Error, Result};
use crate::wire::{IoMessage, MapMessage, MsrMessage, Selector, INVALID_MSR_HI, INVALID_MSR_LO};

/// A 64-bit MSR value split into its architectural halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsrValue {
    pub hi: u32,
    pub lo: u32,
}

impl MsrValue {
    /// The sentinel pair the kext reports for a failed read.
    pub const INVALID: Self = Self { hi: INVALID_MSR_HI, lo: INVALID_MSR_LO };

    pub fn from_u64(value: u64) -> Self {
        Self { hi: (value >> 32) as u32, lo: value as u32 }
    }

    pub fn as_u64(self) -> u64 {
        (u64::from(self.hi) << 32) | u64::from(self.lo)
    }

    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

/// One connection to the privileged driver plus the selected CPU.
pub struct Session<D: DriverPort> {
    driver: D,
    cpu: u32,
}

impl<D: DriverPort> Session<D> {
    pub fn new(driver: D) -> Self {
        Self { driver, cpu: 0 }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Scope subsequent MSR operations to logical CPU `cpu`.
    ///
    /// Takes effect on the next MSR call; earlier calls keep the target
    /// they were issued with.
    pub fn select_cpu(&mut self, cpu: u32) {
        self.cpu = cpu;
    }

    pub fn selected_cpu(&self) -> u32 {
        self.cpu
    }

    /// Read `width` bytes (1, 2 or 4) from I/O port `offset`.
    ///
    /// The width is validated before the driver is contacted.
    pub fn io_read(&mut self, offset: u16, width: u32) -> Result<u32> {
        check_width(width)?;
        let request = IoMessage { offset: offset.into(), width, data: 0 };
        let mut reply = [0u8; IoMessage::LEN];
        self.driver.call(Selector::ReadIo, &request.encode(), &mut reply)?;
        Ok(IoMessage::decode(&reply)?.data & width_mask(width))
    }

    /// Write the low `width` bytes of `value` to I/O port `offset`.
    pub fn io_write(&mut self, offset: u16, width: u32, value: u32) -> Result<()> {
        check_width(width)?;
        let request = IoMessage { offset: offset.into(), width, data: value & width_mask(width) };
        let mut reply = [0u8; IoMessage::LEN];
        self.driver.call(Selector::WriteIo, &request.encode(), &mut reply)?;
        Ok(())
    }

    pub fn inb(&mut self, port: u16) -> Result<u8> {
        Ok(self.io_read(port, 1)? as u8)
    }

    pub fn inw(&mut self, port: u16) -> Result<u16> {
        Ok(self.io_read(port, 2)? as u16)
    }

    pub fn inl(&mut self, port: u16) -> Result<u32> {
        self.io_read(port, 4)
    }

    pub fn outb(&mut self, port: u16, value: u8) -> Result<()> {
        self.io_write(port, 1, value.into())
    }

    pub fn outw(&mut self, port: u16, value: u16) -> Result<()> {
        self.io_write(port, 2, value.into())
    }

    pub fn outl(&mut self, port: u16, value: u32) -> Result<()> {
        self.io_write(port, 4, value)
    }

    /// Read MSR `index` on the currently selected CPU.
    pub fn rdmsr(&mut self, index: u32) -> Result<MsrValue> {
        let request = MsrMessage { core: self.cpu, index, hi: 0, lo: 0 };
        let mut reply = [0u8; MsrMessage::LEN];
        self.driver.call(Selector::ReadMsr, &request.encode(), &mut reply)?;
        let msg = MsrMessage::decode(&reply)?;
        Ok(MsrValue { hi: msg.hi, lo: msg.lo })
    }

    /// Write MSR `index` on the currently selected CPU.
    pub fn wrmsr(&mut self, index: u32, value: MsrValue) -> Result<()> {
        let request = MsrMessage { core: self.cpu, index, hi: value.hi, lo: value.lo };
        let mut reply = [0u8; MsrMessage::LEN];
        self.driver.call(Selector::WriteMsr, &request.encode(), &mut reply)?;
        Ok(())
    }

    /// Map the physical range `addr..addr + len` into the process.
    ///
    /// `addr` and `len` should be page-aligned (see [`crate::PageSpan`]);
    /// the driver rejects ranges it cannot prepare.
    pub fn map_physical(&mut self, addr: u64, len: u64) -> Result<MappedRegion> {
        debug!("map_physical: phys {addr:#010x} len {len:#x}");
        let request = MapMessage { addr, size: len };
        let mut reply = [0u8; MapMessage::LEN];
        if let Err(err) = self.driver.call(Selector::PrepareMap, &request.encode(), &mut reply) {
            return Err(match err {
                Error::CallFailed { selector, status } => classify_map_status(selector, status),
                other => other,
            });
        }
        let region = self.driver.map_view(addr, len)?;
        debug!("map_physical: virt {:p} len {:#x}", region.as_ptr(), region.len());
        Ok(region)
    }
}

fn check_width(width: u32) -> Result<()> {
    if matches!(width, 1 | 2 | 4) {
        Ok(())
    } else {
        Err(Error::UnsupportedWidth(width))
    }
}

fn width_mask(width: u32) -> u32 {
    match width {
        1 => 0xff,
        2 => 0xffff,
        _ => u32::MAX,
    }
}

//! Fixed-layout messages exchanged with the kernel extension.
//!
//! The kext consumes and produces raw C structs over the IOKit struct-call
//! interface. Layouts here must match the kernel side byte for byte, so
//! every message has an explicit encode/decode pair with a fixed length
//! instead of relying on `repr(C)` transmutes. Fields are native-endian,
//! as the structs never leave the machine.

use crate::error::{Error, Result};

/// Method selectors understood by the driver, in kext declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Selector {
    ReadIo = 0,
    WriteIo = 1,
    PrepareMap = 2,
    ReadMsr = 3,
    WriteMsr = 4,
}

impl Selector {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Sentinel MSR halves the kext reports when a register read fails
/// (ASCII "Dire" / "ctHW").
pub const INVALID_MSR_HI: u32 = 0x4469_7265;
pub const INVALID_MSR_LO: u32 = 0x6374_4857;

/// Port I/O request/response: `{ u32 offset; u32 width; u32 data; }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoMessage {
    /// Port address.
    pub offset: u32,
    /// Access width in bytes: 1, 2 or 4.
    pub width: u32,
    /// Payload, right-aligned in the low `width` bytes.
    pub data: u32,
}

impl IoMessage {
    pub const LEN: usize = 12;

    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.offset.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.width.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.data.to_ne_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; Self::LEN] = bytes
            .try_into()
            .map_err(|_| Error::ShortReply { expected: Self::LEN, got: bytes.len() })?;
        Ok(Self {
            offset: u32::from_ne_bytes(bytes[0..4].try_into().unwrap()),
            width: u32::from_ne_bytes(bytes[4..8].try_into().unwrap()),
            data: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
        })
    }
}

/// Memory-map request/response: `{ u64 addr; u64 size; }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapMessage {
    /// Physical base address of the range to prepare.
    pub addr: u64,
    /// Length of the range in bytes.
    pub size: u64,
}

impl MapMessage {
    pub const LEN: usize = 16;

    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..8].copy_from_slice(&self.addr.to_ne_bytes());
        buf[8..16].copy_from_slice(&self.size.to_ne_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; Self::LEN] = bytes
            .try_into()
            .map_err(|_| Error::ShortReply { expected: Self::LEN, got: bytes.len() })?;
        Ok(Self {
            addr: u64::from_ne_bytes(bytes[0..8].try_into().unwrap()),
            size: u64::from_ne_bytes(bytes[8..16].try_into().unwrap()),
        })
    }
}

/// MSR request/response: `{ u32 core; u32 index; u32 hi; u32 lo; }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsrMessage {
    /// Target logical CPU.
    pub core: u32,
    /// Architectural MSR index.
    pub index: u32,
    /// High 32 bits of the register value.
    pub hi: u32,
    /// Low 32 bits of the register value.
    pub lo: u32,
}

impl MsrMessage {
    pub const LEN: usize = 16;

    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.core.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.index.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.hi.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.lo.to_ne_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; Self::LEN] = bytes
            .try_into()
            .map_err(|_| Error::ShortReply { expected: Self::LEN, got: bytes.len() })?;
        Ok(Self {
            core: u32::from_ne_bytes(bytes[0..4].try_into().unwrap()),
            index: u32::from_ne_bytes(bytes[4..8].try_into().unwrap()),
            hi: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
            lo: u32::from_ne_bytes(bytes[12..16].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_codes_match_kext_declaration_order() {
        assert_eq!(Selector::ReadIo.code(), 0);
        assert_eq!(Selector::WriteIo.code(), 1);
        assert_eq!(Selector::PrepareMap.code(), 2);
        assert_eq!(Selector::ReadMsr.code(), 3);
        assert_eq!(Selector::WriteMsr.code(), 4);
    }

    #[test]
    fn io_message_roundtrip() {
        let msg = IoMessage { offset: 0xcf8, width: 4, data: 0x8000_0000 };
        let bytes = msg.encode();
        assert_eq!(bytes.len(), 12);
        assert_eq!(IoMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn map_message_roundtrip() {
        let msg = MapMessage { addr: 0xfed1_0000, size: 0x1000 };
        let bytes = msg.encode();
        assert_eq!(bytes.len(), 16);
        assert_eq!(MapMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn msr_message_roundtrip() {
        let msg = MsrMessage { core: 3, index: 0x1b, hi: 0xdead, lo: 0xfee0_0900 };
        let bytes = msg.encode();
        assert_eq!(bytes.len(), 16);
        assert_eq!(MsrMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn truncated_reply_is_rejected() {
        let err = IoMessage::decode(&[0u8; 8]).unwrap_err();
        match err {
            Error::ShortReply { expected, got } => {
                assert_eq!(expected, 12);
                assert_eq!(got, 8);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

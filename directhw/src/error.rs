//! Error taxonomy for driver operations.
//!
//! The kext reports failures as IOKit `kern_return_t` values. The two
//! codes the mapping path can act on (bad argument, device not open) are
//! pulled out into their own variants; everything else stays a generic
//! `CallFailed` carrying the raw status.

use thiserror::Error;

use crate::wire::Selector;

pub type Result<T> = std::result::Result<T, Error>;

/// `kIOReturnBadArgument` (embedded code 0x2c2).
pub const KIO_BAD_ARGUMENT: i32 = 0xe000_02c2_u32 as i32;
/// `kIOReturnNotOpen` (embedded code 0x2cd).
pub const KIO_NOT_OPEN: i32 = 0xe000_02cd_u32 as i32;

#[derive(Debug, Error)]
pub enum Error {
    #[error("operation requires root privileges")]
    PrivilegeDenied,

    #[error("driver service `{0}` is not loaded")]
    ServiceUnavailable(String),

    #[error("could not open a driver connection (status {0:#010x})")]
    ConnectFailed(i32),

    #[error("raw hardware access is not supported on this platform")]
    UnsupportedPlatform,

    #[error("unsupported I/O width {0} (expected 1, 2 or 4)")]
    UnsupportedWidth(u32),

    #[error("driver rejected the request: invalid argument")]
    InvalidArgument,

    #[error("driver device is not open")]
    DeviceNotOpen,

    #[error("driver call {selector:?} failed (status {status:#010x})")]
    CallFailed { selector: Selector, status: i32 },

    #[error("short reply from driver: expected {expected} bytes, got {got}")]
    ShortReply { expected: usize, got: usize },

    #[error("region access out of bounds: offset {offset:#x} + {len:#x} > {size:#x}")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// System field of a `kern_return_t` (bits 26..32).
pub fn err_system(status: i32) -> u32 {
    ((status >> 26) & 0x3f) as u32
}

/// Subsystem field of a `kern_return_t` (bits 14..26).
pub fn err_sub(status: i32) -> u32 {
    ((status >> 14) & 0xfff) as u32
}

/// Code field of a `kern_return_t` (bits 0..14).
pub fn err_code(status: i32) -> u32 {
    (status & 0x3fff) as u32
}

/// Classify a failed mapping call by its embedded status code.
///
/// Codes other than bad-argument/not-open stay generic, matching what the
/// caller can actually distinguish.
pub fn classify_map_status(selector: Selector, status: i32) -> Error {
    match err_code(status) {
        0x2c2 => Error::InvalidArgument,
        0x2cd => Error::DeviceNotOpen,
        _ => Error::CallFailed { selector, status },
    }
}

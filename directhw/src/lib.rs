//! Userspace access to raw I/O ports, MSRs and physical memory on macOS.
//!
//! All actual hardware access happens inside a privileged kernel extension
//! (service name `DirectHWService` by default). This crate is the userspace
//! half: it packs fixed-size request structures, pushes them through the
//! IOKit struct-call interface, unpacks the fixed-size replies, and maps
//! physical address ranges into the calling process.
//!
//! Key responsibilities:
//! - Open exactly one connection to the driver service per [`Session`].
//! - Marshal port-I/O, MSR and memory-map requests ([`wire`]).
//! - Classify driver failures into a typed error taxonomy ([`Error`]).
//! - Provide a deterministic in-process driver stand-in ([`MockPort`]) so
//!   everything above the IOKit boundary is testable on any platform.
//!
//! The driver connection and the selected logical CPU live in a [`Session`]
//! rather than process globals, so independent sessions can coexist and
//! every operation takes `&mut self`.

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod mock;
pub mod pci;
pub mod phys;
pub mod session;
pub mod util;
pub mod wire;

#[cfg(target_os = "macos")]
pub mod iokit;

pub use config::DriverConfig;
pub use driver::{DriverPort, MappedRegion};
pub use error::{Error, Result};
pub use mock::MockPort;
pub use phys::PageSpan;
pub use session::{MsrValue, Session};

/// Open a session against the platform driver, configured from the
/// environment (`DIRECTHW_SERVICE`, `DIRECTHW_SETTLE_US`, `DIRECTHW_LOG`).
#[cfg(target_os = "macos")]
pub fn open() -> Result<Session<iokit::IoKitPort>> {
    open_with(&DriverConfig::from_env())
}

/// Open a session against the platform driver with an explicit config.
#[cfg(target_os = "macos")]
pub fn open_with(config: &DriverConfig) -> Result<Session<iokit::IoKitPort>> {
    Ok(Session::new(iokit::IoKitPort::open(config)?))
}

#[cfg(not(target_os = "macos"))]
pub fn open() -> Result<Session<driver::UnsupportedPort>> {
    Err(Error::UnsupportedPlatform)
}

#[cfg(not(target_os = "macos"))]
pub fn open_with(_config: &DriverConfig) -> Result<Session<driver::UnsupportedPort>> {
    Err(Error::UnsupportedPlatform)
}

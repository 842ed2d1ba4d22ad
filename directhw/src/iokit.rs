//! IOKit transport to the kernel extension.
//!
//! Opens one `IOServiceOpen` connection to the kext's user client and
//! forwards every request through `IOConnectCallStructMethod`. Mapping
//! goes through `IOConnectMapMemory64` after the prepare call.
//!
//! The kernel module enforces the real security boundary; the euid
//! check here only exists to fail fast with a readable error.

use std::ffi::CString;
use std::ffi::c_void;
use std::thread;
use std::time::Duration;

use io_kit_sys::types::{io_connect_t, io_service_t, IOOptionBits};
use io_kit_sys::{
    kIOMasterPortDefault, IOConnectCallStructMethod, IOConnectMapMemory64, IOObjectRelease,
    IOServiceClose, IOServiceGetMatchingService, IOServiceMatching, IOServiceOpen,
};
use log::{debug, error};
use mach2::kern_return::KERN_SUCCESS;
use mach2::traps::mach_task_self;
use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t};

use crate::config::DriverConfig;
use crate::driver::{DriverPort, MappedRegion};
use crate::error::{classify_map_status, err_code, err_sub, err_system, Error, Result};
use crate::wire::Selector;

// IOConnectMapMemory64 option bits (IOKit/IOTypes.h).
const K_IO_MAP_ANYWHERE: IOOptionBits = 0x0000_0001;
const K_IO_MAP_INHIBIT_CACHE: IOOptionBits = 0x0000_0100;

/// Live connection to the kext's user client.
pub struct IoKitPort {
    connection: io_connect_t,
    settle: Duration,
}

impl IoKitPort {
    /// Locate the driver service and open a connection to it.
    ///
    /// Fails with [`Error::PrivilegeDenied`] before touching IOKit when
    /// the process is not running as root.
    pub fn open(config: &DriverConfig) -> Result<Self> {
        if unsafe { libc::geteuid() } != 0 {
            return Err(Error::PrivilegeDenied);
        }

        let name = CString::new(config.service_name.as_str())
            .map_err(|_| Error::Config("service name contains a NUL byte".to_string()))?;
        let service: io_service_t = unsafe {
            IOServiceGetMatchingService(kIOMasterPortDefault, IOServiceMatching(name.as_ptr()))
        };
        if service == 0 {
            return Err(Error::ServiceUnavailable(config.service_name.clone()));
        }

        let mut connection: io_connect_t = 0;
        let status = unsafe { IOServiceOpen(service, mach_task_self(), 0, &mut connection) };
        unsafe { IOObjectRelease(service) };
        if status != KERN_SUCCESS {
            return Err(Error::ConnectFailed(status));
        }

        debug!("opened connection to {}", config.service_name);
        Ok(Self { connection, settle: config.settle() })
    }
}

impl DriverPort for IoKitPort {
    fn call(&mut self, selector: Selector, request: &[u8], reply: &mut [u8]) -> Result<()> {
        let mut reply_len = reply.len();
        let status = unsafe {
            IOConnectCallStructMethod(
                self.connection,
                selector.code(),
                request.as_ptr() as *const c_void,
                request.len(),
                reply.as_mut_ptr() as *mut c_void,
                &mut reply_len,
            )
        };
        if status != KERN_SUCCESS {
            return Err(Error::CallFailed { selector, status });
        }
        if reply_len != reply.len() {
            return Err(Error::ShortReply { expected: reply.len(), got: reply_len });
        }
        Ok(())
    }

    fn map_view(&mut self, addr: u64, len: u64) -> Result<MappedRegion> {
        let mut vaddr: mach_vm_address_t = 0;
        let mut vsize: mach_vm_size_t = 0;
        let status = unsafe {
            IOConnectMapMemory64(
                self.connection,
                0,
                mach_task_self(),
                &mut vaddr,
                &mut vsize,
                K_IO_MAP_ANYWHERE | K_IO_MAP_INHIBIT_CACHE,
            )
        };

        // The kext finishes the mapping asynchronously; touching the range
        // straight away can fault. Give it a moment before use.
        thread::sleep(self.settle);

        if status != KERN_SUCCESS {
            error!(
                "IOConnectMapMemory64: system {:#x} subsystem {:#x} code {:#x} \
                 physical {addr:#010x}[{len:#x}]",
                err_system(status),
                err_sub(status),
                err_code(status),
            );
            return Err(classify_map_status(Selector::PrepareMap, status));
        }

        Ok(MappedRegion::from_raw(vaddr as *mut u8, vsize as usize))
    }
}

impl Drop for IoKitPort {
    fn drop(&mut self) {
        unsafe {
            IOServiceClose(self.connection);
        }
    }
}

//! Probe PCI configuration space through the ECAM window.
//!
//! Computes the enhanced-configuration physical address for a
//! bus/slot/function, maps the covering pages and prints the 256-byte
//! config space as `address=value` dword lines.

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use directhw::driver::DriverPort;
use directhw::pci::{ecam_address, CONFIG_SPACE_LEN};
use directhw::{DriverConfig, PageSpan, Session};

#[derive(Parser, Debug)]
#[command(name = "rdpci", about = "Dump PCI configuration space via ECAM")]
struct Args {
    /// PCI bus number (0..=255).
    #[arg(value_parser = directhw::util::parse_u32)]
    bus: u32,

    /// PCI slot/device number (0..=31).
    #[arg(value_parser = directhw::util::parse_u32)]
    slot: u32,

    /// PCI function number (0..=7).
    #[arg(value_parser = directhw::util::parse_u32)]
    func: u32,

    /// Starting register offset, dword-aligned.
    #[arg(default_value = "0", value_parser = directhw::util::parse_u32)]
    reg: u32,
}

fn run<D: DriverPort>(
    session: &mut Session<D>,
    bus: u32,
    slot: u32,
    func: u32,
    reg: u32,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let addr = ecam_address(bus, slot, func, reg);
    let span = PageSpan::covering(addr.into(), CONFIG_SPACE_LEN as u64);
    let region = session
        .map_physical(span.base, span.map_len)
        .with_context(|| format!("mapping config space at {addr:#010x}"))?;

    for i in (0..CONFIG_SPACE_LEN).step_by(4) {
        let value = region.read_u32(span.offset + i)?;
        writeln!(out, "{:08x}={:08x}", addr as usize + i, value)?;
    }
    Ok(())
}

fn real_main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = DriverConfig::from_env();
    directhw::logging::init(config.level_filter()).context("logging setup")?;

    let mut session = directhw::open_with(&config).context("opening driver")?;
    log::debug!("probing {:02x}:{:02x}.{} reg {:#x}", args.bus, args.slot, args.func, args.reg);
    let mut stdout = std::io::stdout().lock();
    run(&mut session, args.bus, args.slot, args.func, args.reg, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn main() {
    if let Err(err) = real_main() {
        eprintln!("rdpci: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directhw::MockPort;

    fn config_page() -> Vec<u8> {
        // Plausible header: vendor/device id in the first dword, then a
        // recognizable pattern per dword.
        let mut page = vec![0u8; 0x1000];
        page[0..4].copy_from_slice(&0xa33c_8086u32.to_ne_bytes());
        for i in (4..CONFIG_SPACE_LEN).step_by(4) {
            page[i..i + 4].copy_from_slice(&(i as u32).to_ne_bytes());
        }
        page
    }

    #[test]
    fn root_function_dump_starts_at_the_ecam_base() {
        let mut port = MockPort::new();
        port.add_region(0xe000_0000, config_page());
        let mut session = Session::new(port);

        let mut out = Vec::new();
        run(&mut session, 0, 0, 0, 0, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), CONFIG_SPACE_LEN / 4);
        assert_eq!(lines[0], "e0000000=a33c8086");
        assert_eq!(lines[1], "e0000004=00000004");
        assert_eq!(lines[63], "e00000fc=000000fc");
    }

    #[test]
    fn bus_slot_func_select_a_different_window() {
        let addr = ecam_address(2, 3, 1, 0);
        let mut page = vec![0u8; 0x1000];
        page[0..4].copy_from_slice(&0x1234_abcdu32.to_ne_bytes());
        let mut port = MockPort::new();
        port.add_region(addr.into(), page);
        let mut session = Session::new(port);

        let mut out = Vec::new();
        run(&mut session, 2, 3, 1, 0, &mut out).unwrap();
        let first = String::from_utf8(out).unwrap().lines().next().unwrap().to_string();
        assert_eq!(first, format!("{addr:08x}=1234abcd"));
    }

    #[test]
    fn absent_device_window_is_fatal() {
        let mut session = Session::new(MockPort::new());
        let mut out = Vec::new();
        assert!(run(&mut session, 0, 0, 0, 0, &mut out).is_err());
    }
}

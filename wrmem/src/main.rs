//! Write stdin to arbitrary physical memory locations.
//!
//! WARNING: this is a dangerous tool. It can and will crash or corrupt
//! the system if pointed at the wrong locations.
//!
//! Reads exactly `len` bytes from stdin, maps the covering pages and
//! stores the bytes at the requested physical address.

use std::io::Read;

use anyhow::Context;
use clap::Parser;
use directhw::driver::DriverPort;
use directhw::{DriverConfig, PageSpan, Session};

#[derive(Parser, Debug)]
#[command(name = "wrmem", about = "Write stdin to physical memory")]
struct Args {
    /// Physical address to write to (0x prefix for hex).
    #[arg(value_parser = directhw::util::parse_u64)]
    addr: u64,

    /// Number of bytes to copy from stdin.
    #[arg(value_parser = directhw::util::parse_u64)]
    len: u64,
}

fn run<D: DriverPort>(
    session: &mut Session<D>,
    addr: u64,
    len: u64,
    input: &mut impl Read,
) -> anyhow::Result<()> {
    let mut buf = vec![0u8; len as usize];
    input.read_exact(&mut buf).context("reading payload from stdin")?;

    let span = PageSpan::covering(addr, len);
    let mut region = session
        .map_physical(span.base, span.map_len)
        .with_context(|| format!("mapping {:#x} bytes at {:#010x}", span.map_len, span.base))?;

    region.write_bytes(span.offset, &buf)?;
    log::info!("wrote {len:#x} bytes at {addr:#010x}");
    Ok(())
}

fn real_main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = DriverConfig::from_env();
    directhw::logging::init(config.level_filter()).context("logging setup")?;

    let mut session = directhw::open_with(&config).context("opening driver")?;
    let mut stdin = std::io::stdin().lock();
    run(&mut session, args.addr, args.len, &mut stdin)
}

fn main() {
    if let Err(err) = real_main() {
        eprintln!("wrmem: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directhw::MockPort;
    use std::io::Cursor;

    #[test]
    fn stdin_bytes_land_at_the_physical_address() {
        let mut port = MockPort::new();
        port.add_page(0x1000, &[0u8; 0]);
        let mut session = Session::new(port);

        let mut input = Cursor::new(b"\x01\x02\x03\x04".to_vec());
        run(&mut session, 0x1010, 4, &mut input).unwrap();

        let bytes = session.driver().region_bytes(0x1010, 4).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn short_stdin_is_fatal_before_any_mapping() {
        let mut session = Session::new(MockPort::new());
        let mut input = Cursor::new(b"ab".to_vec());
        assert!(run(&mut session, 0x1000, 8, &mut input).is_err());
        assert_eq!(session.driver().calls(), 0);
    }

    #[test]
    fn unbacked_address_is_fatal() {
        let mut session = Session::new(MockPort::new());
        let mut input = Cursor::new(vec![0u8; 4]);
        assert!(run(&mut session, 0x9000, 4, &mut input).is_err());
    }
}

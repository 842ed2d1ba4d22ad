//! Dump a physical memory range to stdout.
//!
//! Maps the covering pages through the driver, copies the requested
//! bytes and writes them raw to stdout (or as a hex dump with `-x`).
//! Run as root with the kext loaded.

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use directhw::driver::DriverPort;
use directhw::{DriverConfig, PageSpan, Session};

#[derive(Parser, Debug)]
#[command(name = "rdmem", about = "Dump physical memory to stdout")]
struct Args {
    /// Physical address to read from (0x prefix for hex).
    #[arg(value_parser = directhw::util::parse_u64)]
    addr: u64,

    /// Number of bytes to read.
    #[arg(value_parser = directhw::util::parse_u64)]
    len: u64,

    /// Print a hex dump instead of raw bytes.
    #[arg(short = 'x', long)]
    hexdump: bool,
}

fn run<D: DriverPort>(
    session: &mut Session<D>,
    addr: u64,
    len: u64,
    hexdump: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let span = PageSpan::covering(addr, len);
    let region = session
        .map_physical(span.base, span.map_len)
        .with_context(|| format!("mapping {:#x} bytes at {:#010x}", span.map_len, span.base))?;

    let mut buf = vec![0u8; len as usize];
    region.read_bytes(span.offset, &mut buf)?;

    if hexdump {
        write_hexdump(out, addr, &buf)?;
    } else {
        out.write_all(&buf)?;
    }
    Ok(())
}

/// 16 bytes per line: address, hex bytes, printable-ASCII gutter.
fn write_hexdump(out: &mut impl Write, base: u64, bytes: &[u8]) -> std::io::Result<()> {
    for (i, chunk) in bytes.chunks(16).enumerate() {
        write!(out, "{:08x} ", base + (i * 16) as u64)?;
        for col in 0..16 {
            match chunk.get(col) {
                Some(b) => write!(out, " {b:02x}")?,
                None => write!(out, "   ")?,
            }
        }
        write!(out, "  |")?;
        for b in chunk {
            let c = if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' };
            write!(out, "{c}")?;
        }
        writeln!(out, "|")?;
    }
    Ok(())
}

fn real_main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = DriverConfig::from_env();
    directhw::logging::init(config.level_filter()).context("logging setup")?;

    let mut session = directhw::open_with(&config).context("opening driver")?;
    log::debug!("reading {:#x} bytes at {:#010x}", args.len, args.addr);
    let mut stdout = std::io::stdout().lock();
    run(&mut session, args.addr, args.len, args.hexdump, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn main() {
    if let Err(err) = real_main() {
        eprintln!("rdmem: {err:#}");
        std::process::exit(1);
    }
}

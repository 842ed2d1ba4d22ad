//! Structured stderr logging for the CLI tools.

use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;

/// Install a timestamped stderr logger at `level`.
///
/// Tools log to stderr only; stdout is reserved for payload bytes.
pub fn init(level: LevelFilter) -> Result<(), fern::InitError> {
    Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                msg
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

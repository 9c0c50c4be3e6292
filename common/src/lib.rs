use anyhow::Context;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};

pub mod file_format;
pub mod float_ext;
pub mod serde;

/// Starts file + console logging. The returned handle must be kept alive for
/// file output to be flushed.
pub fn setup_logging(base_level: &str) -> anyhow::Result<LoggerHandle> {
    let handle = Logger::try_with_str(base_level)
        .with_context(|| format!("Invalid log specification '{}'", base_level))?
        .log_to_file(FileSpec::default().directory("logs").basename("wellplate"))
        .duplicate_to_stderr(Duplicate::Warn)
        .duplicate_to_stdout(Duplicate::All)
        .rotate(
            Criterion::Size(1024 * 1024), //1MB
            Naming::Timestamps,
            Cleanup::KeepLogFiles(5),
        )
        .start()
        .context("Logger initialization failed")?;
    Ok(handle)
}

use std::path::Path;

use flexi_logger::{Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming};

const LOG_BASENAME: &str = "go_policy_net";
const ROTATE_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_FILES: usize = 3;

/// Starts the global logger from `RUST_LOG`, falling back to `info`.
///
/// Without a directory, colored lines go to stderr. With one, plain lines go to
/// numbered files rotated every 10 MB. The returned handle must stay alive for
/// the duration of the program.
pub fn setup_logging(dir: Option<&Path>) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_env_or_str("info")?;
    match dir {
        None => logger.format(flexi_logger::colored_default_format).start(),
        Some(dir) => logger
            .log_to_file(FileSpec::default().directory(dir).basename(LOG_BASENAME))
            .format(flexi_logger::detailed_format)
            .rotate(
                Criterion::Size(ROTATE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(KEEP_FILES),
            )
            .start(),
    }
}

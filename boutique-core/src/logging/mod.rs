//! Logging built on the standard `log` facade
//!
//! Library code only uses `log::warn!`, `log::debug!` and friends. Binaries call
//! [`init_logging`] once with the `[logging]` section of the configuration to get
//! human, JSON or logfmt lines on stdout or stderr.
//!
//! ```rust,no_run
//! use boutique_core::logging::{init_logging, LoggingConfig};
//!
//! init_logging(&LoggingConfig::production().with_context_field("service", "storefront"))?;
//! log::info!("listing ready");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod destinations;
pub mod formatter;

pub use config::{LogLevel, LoggingConfig};
pub use destinations::{LogEntry, LogOutput};
pub use formatter::LogFormat;

use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the global logger. Later calls are no-ops.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = log::set_boxed_logger(Box::new(BoutiqueLogger::new(config.clone())))
            .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e));
        log::set_max_level(config.level.to_level_filter());
    });
    result
}

struct BoutiqueLogger {
    config: LoggingConfig,
}

impl BoutiqueLogger {
    fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        match self.config.output {
            LogOutput::Stdout => writeln!(std::io::stdout().lock(), "{}", line),
            LogOutput::Stderr => writeln!(std::io::stderr().lock(), "{}", line),
        }
    }
}

impl log::Log for BoutiqueLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::from(self.config.level)
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = LogEntry::from_log_record(record, &self.config);
        let _ = self.write_line(&self.config.format.format_entry(&entry));
    }

    fn flush(&self) {
        let _ = match self.config.output {
            LogOutput::Stdout => std::io::stdout().flush(),
            LogOutput::Stderr => std::io::stderr().flush(),
        };
    }
}

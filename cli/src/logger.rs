use log::{Level, LevelFilter, Metadata, Record};

/// Console logger printing the level as a prefix, e.g. `INFO: ...`.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => eprintln!("ERROR: {}", record.args()),
            Level::Warn => eprintln!("WARNING: {}", record.args()),
            Level::Info => println!("INFO: {}", record.args()),
            Level::Debug | Level::Trace => println!("DEBUG: {}", record.args()),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

pub fn init(debug: bool) -> anyhow::Result<()> {
    log::set_logger(&LOGGER).map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;
    log::set_max_level(if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    Ok(())
}

use log::{LevelFilter, Log, Metadata, Record};

/// Writes records to stderr as `[time LEVEL module] message`.
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timepoint = chrono::Local::now().naive_local();
        let thread = std::thread::current();
        eprintln!(
            "[{} {:<5} {}{}] {}",
            timepoint.format("%H:%M:%S%.3f"),
            record.level(),
            record.module_path().unwrap_or("?"),
            thread
                .name()
                .filter(|name| *name != "main")
                .map(|name| format!(" ({name})"))
                .unwrap_or_default(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Warnings are always shown; each `-v` adds a level.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init(verbosity: u8) {
    let level = level_for(verbosity);
    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}

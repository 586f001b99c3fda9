//! Logger backend: routes the `log` facade into stderr and a rolling text
//! file. Log targets name the group: `program`, `system`, or `graphics`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

use log::{LevelFilter, Metadata, Record};

struct Logger {
    start: Instant,
    stderr_level: LevelFilter,
    file: Option<Mutex<File>>,
}

fn group(target: &str) -> &'static str {
    // Module paths from dependencies land in the default group.
    match target {
        "graphics" => "graphics",
        "system" => "system",
        _ => "program",
    }
}

impl log::Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let elapsed = self.start.elapsed();
        let line = format!(
            "[{:9.3}s] [{}] {}: {}",
            elapsed.as_secs_f64(),
            group(record.target()),
            record.level().as_str().to_lowercase(),
            record.args()
        );

        if record.level() <= self.stderr_level {
            eprintln!("{line}");
        }
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    fn flush(&self) {}
}

/// Install the logger: `stderr_level` caps what reaches the terminal, the
/// file at `path` receives everything (appending across sessions).
pub fn init_logging(path: &str, stderr_level: LevelFilter) {
    let file = OpenOptions::new().create(true).append(true).open(path).ok();
    if let Some(file) = &file {
        let mut file = file;
        let _ = writeln!(
            file,
            "-------------------------------- session --------------------------------"
        );
    }

    let logger = Logger {
        start: Instant::now(),
        stderr_level,
        file: file.map(Mutex::new),
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_targets_fall_into_the_program_group() {
        assert_eq!(group("graphics"), "graphics");
        assert_eq!(group("system"), "system");
        assert_eq!(group("ember_renderer::stages"), "program");
        assert_eq!(group(""), "program");
    }
}

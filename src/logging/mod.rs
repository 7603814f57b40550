use std::{
    fmt::Write as _,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use chrono::{format::DelayedFormat, DateTime, Local};
use concat_string::concat_string;
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;
use strum_macros::Display;

pub mod rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));
/// true 時 info_console 改寫到 stderr，讓 stdout 只留給輸出資料
static CONSOLE_TO_STDERR: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Copy, Clone, PartialEq, Display)]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

pub struct Logger {
    writer: Sender<LogMessage>,
}

impl Logger {
    /// Starts a writer thread for `log/<date>-<log_name>.log`.
    pub fn new(log_name: &str) -> Self {
        let (tx, rx) = unbounded::<LogMessage>();
        let pattern = concat_string!("log/%Y-%m-%d-", log_name, ".log");

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut rotate = rotate::Rotate::new(pattern);
            let mut line = String::with_capacity(4096);

            for received in &rx {
                if writeln!(
                    &mut line,
                    "{} {} {}",
                    received.created_at.format("%F %X%.6f"),
                    received.level,
                    received.msg
                )
                .is_err()
                {
                    continue;
                }

                if rx.is_empty() || line.len() >= 4096 {
                    if let Err(why) = rotate.write_msg(received.created_at, line.as_bytes()) {
                        error_console(format!(
                            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
                            why, line
                        ));
                    }

                    rotate.flush();
                    line.clear();
                }
            }
        });

        Logger { writer: tx }
    }

    pub fn info(&self, log: String) {
        self.send(Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(Level::Error, log);
    }

    pub fn debug(&self, log: String) {
        self.send(Level::Debug, log);
    }

    fn send(&self, level: Level, msg: String) {
        if let Err(why) = self.writer.send(LogMessage::new(level, msg)) {
            error_console(why.to_string());
        }
    }
}

pub struct LogMessage {
    pub level: Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

/// Sends `info_console` lines to stderr, keeping stdout for data output.
pub fn console_to_stderr(enabled: bool) {
    CONSOLE_TO_STDERR.store(enabled, Ordering::Relaxed);
}

pub fn is_console_to_stderr() -> bool {
    CONSOLE_TO_STDERR.load(Ordering::Relaxed)
}

pub fn info_console(log: String) {
    let line = format!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );

    if is_console_to_stderr() {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_to_stderr() {
        assert!(!is_console_to_stderr());

        console_to_stderr(true);
        assert!(is_console_to_stderr());
        info_console("goes to stderr".to_string());

        console_to_stderr(false);
        assert!(!is_console_to_stderr());
    }
}

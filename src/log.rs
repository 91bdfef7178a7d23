//! File logger for the vigil monitor host.
//!
//! Lines go to `~/.vigil/vigil.log`, which every run truncates.
//!
//! Levels:
//! - ERROR: the host cannot start
//! - WARN: a monitor task failed, overran its timeout, or a report was lost
//! - INFO: run lifecycle
//! - DEBUG: per-cycle summaries
//! - TRACE: per-task launch and settlement
//!
//! Code running under [`scoped`] gets the run tag stamped on every line,
//! e.g. `[12:00:01.250] [WARN] [run 1f3a9c2e] cycle 4 task updates rejected: feed 503`.
//!
//! `--debug` or `VIGIL_DEBUG=1` lowers the threshold to DEBUG.

use std::fmt;
use std::fs::OpenOptions;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();
static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

tokio::task_local! {
    static RUN_TAG: String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl Level {
    const ALL: [Level; 5] = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    fn from_u8(v: u8) -> Self {
        Self::ALL.get(v as usize).copied().unwrap_or(Level::Trace)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        })
    }
}

/// Open the log file and set the threshold.
pub fn init(debug: bool) {
    let debug = debug || env_flag("VIGIL_DEBUG");
    set_max_level(if debug { Level::Debug } else { Level::Info });

    let Some(dir) = dirs::home_dir().map(|h| h.join(".vigil")) else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let path = dir.join("vigil.log");
    if std::fs::write(&path, "").is_ok() {
        LOG_FILE.set(path).ok();
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn set_max_level(level: Level) {
    MAX_LEVEL.store(level as u8, Ordering::SeqCst);
}

pub fn enabled(level: Level) -> bool {
    level <= Level::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

/// Run `fut` with `tag` attached to every line it logs.
///
/// The tag is task-local: tokio tasks spawned from inside `fut` do not
/// inherit it.
pub async fn scoped<F: Future>(tag: impl Into<String>, fut: F) -> F::Output {
    RUN_TAG.scope(tag.into(), fut).await
}

/// The tag set by the enclosing [`scoped`] call, if any.
pub fn run_tag() -> Option<String> {
    RUN_TAG.try_with(|tag| tag.clone()).ok()
}

fn format_line(timestamp: &str, level: Level, tag: Option<&str>, msg: &str) -> String {
    match tag {
        Some(tag) => format!("[{timestamp}] [{level}] [run {tag}] {msg}"),
        None => format!("[{timestamp}] [{level}] {msg}"),
    }
}

/// Append one line. A no-op until [`init`] has found a log file.
pub fn write(level: Level, msg: &str) {
    let Some(path) = LOG_FILE.get() else {
        return;
    };
    let timestamp = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
    let line = format_line(&timestamp, level, run_tag().as_deref(), msg);
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{line}");
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __vlog_at {
    ($level:expr, $($arg:tt)*) => {
        if $crate::log::enabled($level) {
            $crate::log::write($level, &format!($($arg)*))
        }
    };
}

/// Log at INFO.
#[macro_export]
macro_rules! vlog {
    ($($arg:tt)*) => { $crate::__vlog_at!($crate::log::Level::Info, $($arg)*) };
}

#[macro_export]
macro_rules! vlog_error {
    ($($arg:tt)*) => { $crate::__vlog_at!($crate::log::Level::Error, $($arg)*) };
}

#[macro_export]
macro_rules! vlog_warn {
    ($($arg:tt)*) => { $crate::__vlog_at!($crate::log::Level::Warn, $($arg)*) };
}

/// Log at DEBUG; formatting is skipped unless debug mode is on.
#[macro_export]
macro_rules! vlog_debug {
    ($($arg:tt)*) => { $crate::__vlog_at!($crate::log::Level::Debug, $($arg)*) };
}

#[macro_export]
macro_rules! vlog_trace {
    ($($arg:tt)*) => { $crate::__vlog_at!($crate::log::Level::Trace, $($arg)*) };
}

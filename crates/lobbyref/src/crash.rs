//! Crash record.
//!
//! A panic hook appends what happened (message, location, backtrace) to the
//! crash record file before the panic unwinds to the top level.

use std::backtrace::Backtrace;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Installs a panic hook writing to `path`, chained before the default one.
pub fn install(path: PathBuf) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let message = panic_message(info);
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let backtrace = Backtrace::force_capture();
        if let Err(e) = append(&path, &message, &location, &backtrace.to_string()) {
            eprintln!("cannot write crash record {}: {e}", path.display());
        }
        default_hook(info);
    }));
}

/// The panic payload as text.
pub fn panic_message(info: &PanicHookInfo<'_>) -> String {
    payload_message(info.payload())
}

/// Text of a panic payload from `catch_unwind` or a hook.
pub fn payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Appends one entry to the crash record.
pub fn append(path: &Path, message: &str, location: &str, backtrace: &str) -> std::io::Result<()> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "=== crash at unix time {secs} ===")?;
    writeln!(file, "panic: {message}")?;
    if !location.is_empty() {
        writeln!(file, "at: {location}")?;
    }
    writeln!(file)?;
    writeln!(file, "{backtrace}")?;
    Ok(())
}

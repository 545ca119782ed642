//! Panic reporting through the `log` facade.
//!
//! The default hook writes straight to stderr, which bypasses `main.log`.
//! The replacement formats location, payload and (when `RUST_BACKTRACE`
//! enables it) a backtrace into one `error` record.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::{self, Location};

/// Replace the process panic hook with one that logs.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let mut report = panic_report(info.location(), info.payload());
        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            report.push_str(&format!("\nbacktrace:\n{}", backtrace));
        }
        log::error!("{}", report);
    }));
}

/// `panicked at <file>:<line>:<col>: <message>`.
pub fn panic_report(location: Option<&Location<'_>>, payload: &(dyn Any + Send)) -> String {
    let message = panic_message(payload);
    match location {
        Some(loc) => format!(
            "panicked at {}:{}:{}: {}",
            loc.file(),
            loc.line(),
            loc.column(),
            message
        ),
        None => format!("panicked at unknown location: {}", message),
    }
}

/// Text of a panic payload, if it carries any.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

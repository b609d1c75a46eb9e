//! Logging facilities.
//!
//! The macros expect a component exposing `time()` and `name()` methods. Every record is
//! written with the component name as its target and prefixed with `[time LEVEL component]`.

use std::fmt::Debug;

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::error;

use crate::event::Event;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_prefixed {
    ($level:ident, $label:literal, $color:ident, $ctx:expr, $($arg:tt)+) => (
        log::$level!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::log::get_colored($label, $crate::colored::Color::$color),
            $ctx.name(),
            format_args!($($arg)+)
        )
    );
}

/// Logs a message at the info level.
///
/// # Examples
///
/// ```rust
/// use flowsim_core::log_info;
///
/// struct Router {
///     clock: f64,
/// }
///
/// impl Router {
///     fn time(&self) -> f64 {
///         self.clock
///     }
///
///     fn name(&self) -> &str {
///         "router"
///     }
/// }
///
/// let router = Router { clock: 1.5 };
/// log_info!(router, "routed {} flows", 3);
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::log_prefixed!(info, "INFO ", Green, $ctx, $($arg)+));
}

/// Logs a message at the debug level, see [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::log_prefixed!(debug, "DEBUG", Blue, $ctx, $($arg)+));
}

/// Logs a message at the trace level, see [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::log_prefixed!(trace, "TRACE", BrightBlack, $ctx, $($arg)+));
}

// Events scheduled into the past are reported right before the kernel panics.
pub(crate) fn log_incorrect_event<T: Debug>(event: &Event<T>, msg: &str) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] Incorrect event ({}): {:?}",
        event.time,
        get_colored("ERROR", Color::Red),
        msg,
        event.data
    );
}

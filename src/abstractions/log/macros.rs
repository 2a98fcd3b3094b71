//! Macros for generating log messages.
//!
//! Every public macro defers to `log_event!`, which makes sure the subscriber is installed and attaches the
//! `threshold` field the filter layer reads. A threshold is a literal followed by the format string, so a leading
//! format string with arguments is never taken for a threshold.

#[doc(hidden)]
#[macro_export]
macro_rules! log_event {
    ($level:expr, critical, $threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $level,
                critical = true,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
    ($level:expr, $threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $level,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! critical {
    ($threshold:literal, $fmt:literal $($arg:tt)*) => {
        $crate::log_event!($crate::tracing::Level::ERROR, critical, $threshold, $fmt $($arg)*)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::ERROR, critical, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($threshold:literal, $fmt:literal $($arg:tt)*) => {
        $crate::log_event!($crate::tracing::Level::ERROR, $threshold, $fmt $($arg)*)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::ERROR, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($threshold:literal, $fmt:literal $($arg:tt)*) => {
        $crate::log_event!($crate::tracing::Level::WARN, $threshold, $fmt $($arg)*)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::WARN, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($threshold:literal, $fmt:literal $($arg:tt)*) => {
        $crate::log_event!($crate::tracing::Level::INFO, $threshold, $fmt $($arg)*)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::INFO, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($threshold:literal, $fmt:literal $($arg:tt)*) => {
        $crate::log_event!($crate::tracing::Level::DEBUG, $threshold, $fmt $($arg)*)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::DEBUG, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! trace {
    ($threshold:literal, $fmt:literal $($arg:tt)*) => {
        $crate::log_event!($crate::tracing::Level::TRACE, $threshold, $fmt $($arg)*)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::TRACE, 0, $($arg)+)
    };
}


// The following makes the macros importable directly from the `log` module.
pub use crate::{critical, error, warning, info, debug, trace};

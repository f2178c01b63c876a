#![allow(dead_code)]
#![macro_use]

macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!(target: $target, $($arg)+);
        #[cfg(not(feature = "logging"))]
        { let _ = ($target, format_args!($($arg)+)); }
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!($($arg)+);
        #[cfg(not(feature = "logging"))]
        { let _ = format_args!($($arg)+); }
    )
}

macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!(target: $target, $($arg)+);
        #[cfg(not(feature = "logging"))]
        { let _ = ($target, format_args!($($arg)+)); }
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!($($arg)+);
        #[cfg(not(feature = "logging"))]
        { let _ = format_args!($($arg)+); }
    )
}

macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::warn!(target: $target, $($arg)+);
        #[cfg(not(feature = "logging"))]
        { let _ = ($target, format_args!($($arg)+)); }
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::warn!($($arg)+);
        #[cfg(not(feature = "logging"))]
        { let _ = format_args!($($arg)+); }
    )
}

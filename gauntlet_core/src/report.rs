//! Status reporting.
//!
//! Every user-facing message from the core goes through [`note!`]: one line
//! on stderr, prefixed with the harness tag. Stdout stays reserved for the
//! programs under test.

/// Writes one prefixed status line to stderr.
#[macro_export]
macro_rules! note {
    ($($arg:tt)*) => {
        eprintln!("[gauntlet] {}", format_args!($($arg)*))
    };
}

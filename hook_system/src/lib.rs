//! Hook system for query lifecycle callbacks
//!
//! This crate provides ordered before/after callback chains that run
//! around a single named operation in the Persisthaus ecosystem.

#[cfg(feature = "debug-logging")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod chain;
pub mod phase;
pub mod prelude;
pub mod types;

pub use chain::HookChain;
pub use phase::{HookError, HookPhase};
pub use types::{Hook, HookFuture};

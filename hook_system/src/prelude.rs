//! Convenience re-exports for common hook-system usage

pub use crate::chain::HookChain;
pub use crate::phase::{HookError, HookPhase};
pub use crate::types::{Hook, HookFuture};

// Common external dependencies
pub use futures::future::BoxFuture;

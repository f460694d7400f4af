//! Type definitions for hook callbacks

use futures::future::BoxFuture;
use std::sync::Arc;

/// Future returned by a hook, borrowing the parameters it was given
pub type HookFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// Async hook callback that may mutate the shared parameters
pub type Hook<P> = Arc<dyn for<'a> Fn(&'a mut P) -> HookFuture<'a> + Send + Sync>;

use crate::phase::HookPhase;
use crate::types::{Hook, HookFuture};
use std::sync::{Arc, PoisonError, RwLock};

/// Ordered before/after callbacks scoped to one named operation
///
/// Registration is additive and ordered. `run` works on a snapshot of the
/// selected sequence, so an `add` or `flush` racing with an in-flight run may or
/// may not be observed by that run.
pub struct HookChain<P> {
    before: RwLock<Vec<Hook<P>>>,
    after: RwLock<Vec<Hook<P>>>,
}

impl<P> std::fmt::Debug for HookChain<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookChain")
            .field("before", &self.len(HookPhase::Before))
            .field("after", &self.len(HookPhase::After))
            .finish()
    }
}

impl<P> HookChain<P> {
    pub fn new() -> Self {
        Self {
            before: RwLock::new(Vec::new()),
            after: RwLock::new(Vec::new()),
        }
    }

    fn sequence(&self, phase: HookPhase) -> &RwLock<Vec<Hook<P>>> {
        match phase {
            HookPhase::Before => &self.before,
            HookPhase::After => &self.after,
        }
    }

    /// Add an async hook; `None` appends it to both sequences
    pub fn add<F>(&self, when: Option<HookPhase>, hook: F)
    where
        F: for<'a> Fn(&'a mut P) -> HookFuture<'a> + Send + Sync + 'static,
    {
        self.add_hook(when, Arc::new(hook));
    }

    /// Add a synchronous hook
    pub fn add_sync<F>(&self, when: Option<HookPhase>, hook: F)
    where
        F: Fn(&mut P) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add(when, move |params| {
            let result = hook(params);
            Box::pin(futures::future::ready(result))
        });
    }

    /// Append an already shared hook to the tail of the selected sequence(s)
    pub fn add_hook(&self, when: Option<HookPhase>, hook: Hook<P>) {
        for phase in HookPhase::selected(when) {
            self.sequence(*phase)
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Arc::clone(&hook));
        }
    }

    /// Clear the selected sequence(s)
    pub fn flush(&self, when: Option<HookPhase>) {
        for phase in HookPhase::selected(when) {
            self.sequence(*phase)
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }

    /// Number of hooks registered for a phase
    pub fn len(&self, phase: HookPhase) -> usize {
        self.sequence(phase)
            .read()
            .map(|hooks| hooks.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        HookPhase::ALL.iter().all(|phase| self.len(*phase) == 0)
    }

    fn snapshot(&self, phase: HookPhase) -> Vec<Hook<P>> {
        self.sequence(phase)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<P: Send> HookChain<P> {
    /// Run the selected sequence(s) in insertion order
    ///
    /// With `None`, every before-hook completes before the first after-hook starts.
    /// The first failing hook aborts the rest of the chain and its error is
    /// returned unchanged.
    pub async fn run(&self, when: Option<HookPhase>, params: &mut P) -> anyhow::Result<()> {
        for phase in HookPhase::selected(when) {
            self.run_phase(*phase, params).await?;
        }
        Ok(())
    }

    async fn run_phase(&self, phase: HookPhase, params: &mut P) -> anyhow::Result<()> {
        let hooks = self.snapshot(phase);
        trace_log!("Running {} {} hook(s)", hooks.len(), phase);

        for (_index, hook) in hooks.iter().enumerate() {
            if let Err(e) = hook(&mut *params).await {
                trace_log!("{} hook #{} failed: {}", phase, _index, e);
                return Err(e);
            }
        }

        Ok(())
    }
}

impl<P> Default for HookChain<P> {
    fn default() -> Self {
        Self::new()
    }
}

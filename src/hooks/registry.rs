use std::cmp::Reverse;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// A plugin listener that may rewrite a payload of type `P`.
#[async_trait]
pub trait FilterHook<P: Send + 'static>: Send + Sync {
    /// Identifier used in logs and error context.
    fn name(&self) -> &'static str;

    /// Listener ordering (higher runs first).
    fn priority(&self) -> i32 {
        0
    }

    /// Transform the payload. The returned value is trusted as-is.
    ///
    /// # Errors
    ///
    /// Errors propagate to whoever fired the hook.
    async fn filter(&self, payload: P) -> Result<P>;
}

/// Ordered listeners for one filter event.
pub struct HookRegistry<P: Send + 'static> {
    event: &'static str,
    hooks: Vec<Box<dyn FilterHook<P>>>,
}

impl<P: Send + 'static> HookRegistry<P> {
    /// Create an empty registry for `event`.
    #[must_use]
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            hooks: Vec::new(),
        }
    }

    #[must_use]
    pub const fn event(&self) -> &'static str {
        self.event
    }

    /// Register a listener.
    pub fn register(&mut self, hook: Box<dyn FilterHook<P>>) {
        self.hooks.push(hook);
        // Stable sort keeps registration order within a priority
        self.hooks.sort_by_key(|h| Reverse(h.priority()));
    }

    #[must_use]
    pub fn has_listeners(&self) -> bool {
        !self.hooks.is_empty()
    }

    /// Pass `payload` through every listener in order. With no listeners
    /// the payload comes back unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first listener error.
    pub async fn fire(&self, payload: P) -> Result<P> {
        let mut payload = payload;
        for hook in &self.hooks {
            payload = hook
                .filter(payload)
                .await
                .with_context(|| format!("filter:{} listener {} failed", self.event, hook.name()))?;
        }
        Ok(payload)
    }
}

//! Live-updatable policy shared by many engines.
//!
//! Each logical request gets its own [`DecisionEngine`](crate::DecisionEngine), but a host
//! usually wants one policy for all of them and the ability to retune it without rebuilding
//! engines. `SharedPolicy` wraps the policy in an `ArcSwap`: reads are lock-free snapshots,
//! writes replace the whole policy atomically, and a decision in flight keeps the snapshot it
//! started with.

use crate::EnginePolicy;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Cloneable handle to a policy that can be replaced at runtime.
#[derive(Debug, Clone)]
pub struct SharedPolicy {
    inner: Arc<ArcSwap<EnginePolicy>>,
}

impl SharedPolicy {
    pub fn new(policy: EnginePolicy) -> Self {
        Self { inner: Arc::new(ArcSwap::from_pointee(policy)) }
    }

    /// Snapshot the current policy.
    pub fn get(&self) -> Arc<EnginePolicy> {
        self.inner.load_full()
    }

    /// Replace the policy for every engine holding this handle.
    pub fn set(&self, policy: EnginePolicy) {
        self.inner.store(Arc::new(policy));
        tracing::info!("engine policy replaced");
    }

    /// Derive a new policy from the current one.
    pub fn update<F>(&self, f: F)
    where
        F: Fn(&EnginePolicy) -> EnginePolicy,
    {
        self.inner.rcu(|current| f(current));
        tracing::info!("engine policy updated");
    }
}

impl Default for SharedPolicy {
    fn default() -> Self {
        Self::new(EnginePolicy::default())
    }
}

impl From<EnginePolicy> for SharedPolicy {
    fn from(policy: EnginePolicy) -> Self {
        Self::new(policy)
    }
}

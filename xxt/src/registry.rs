//! Process-local handle registry
//!
//! Handle ids are checked for agreement across the communicator, so every
//! process must issue them in the same collective order. One registry per
//! process, shared by all handles it creates.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use xxt_core::Hypercube;

use crate::handle::XxtSolver;

#[derive(Debug, Default)]
struct RegistryState {
    issued: AtomicU64,
    outstanding: AtomicUsize,
}

/// Issues handle ids and counts live handles
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    state: Arc<RegistryState>,
}

impl HandleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty solver handle bound to `comm`
    pub fn create<C: Hypercube>(&self, comm: C) -> XxtSolver<C> {
        XxtSolver::new(self, comm)
    }

    /// Issue the next id (ids start at 1)
    pub(crate) fn issue(&self) -> u64 {
        self.state.outstanding.fetch_add(1, Ordering::SeqCst);
        self.state.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Return a handle's slot
    pub(crate) fn release(&self) {
        self.state.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of ids issued so far
    pub fn issued(&self) -> u64 {
        self.state.issued.load(Ordering::SeqCst)
    }

    /// Number of handles not yet dropped
    pub fn outstanding(&self) -> usize {
        self.state.outstanding.load(Ordering::SeqCst)
    }
}

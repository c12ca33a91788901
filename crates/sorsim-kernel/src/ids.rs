//! Sequential actor-id allocation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sorsim_protocol::ActorId;

/// Hands out process-unique actor ids, starting at 1. Id 0 is never issued.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: Arc<AtomicU64>,
}

impl IdAllocator {
    pub fn new() -> IdAllocator {
        IdAllocator::default()
    }

    pub fn next(&self) -> ActorId {
        ActorId::from_u64(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_shared() {
        let alloc = IdAllocator::new();
        let clone = alloc.clone();
        assert_eq!(alloc.next(), ActorId::from_u64(1));
        assert_eq!(clone.next(), ActorId::from_u64(2));
        assert_eq!(alloc.next(), ActorId::from_u64(3));
    }
}

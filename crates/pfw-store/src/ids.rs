//! Sources of unique identifiers.
//!
//! Machine identifiers and scratch file names come from an [`IdSource`] so
//! tests can substitute a deterministic sequence.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

pub trait IdSource: Send + Sync {
    fn next_id(&self) -> Uuid;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// `00000000-0000-0000-0000-000000000000`, then `…0001`, and so on.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.next.fetch_add(1, Ordering::SeqCst)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new();
        assert_eq!(ids.next_id().to_string(), "00000000-0000-0000-0000-000000000000");
        assert_eq!(ids.next_id().to_string(), "00000000-0000-0000-0000-000000000001");
    }

    #[test]
    fn random_ids_differ() {
        assert_ne!(RandomIds.next_id(), RandomIds.next_id());
    }
}

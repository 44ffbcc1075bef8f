use std::sync::Arc;

use dashmap::DashSet;
use uuid::Uuid;

/// Identity of a work item the reconciliation worker may be processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InFlightKey {
    Order(Uuid),
    Message(Uuid),
}

/// Process-local set of items currently being processed. Two overlapping ticks that list the
/// same item race on [`InFlightSet::try_acquire`] and exactly one of them wins.
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    keys: Arc<DashSet<InFlightKey>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic insert-if-absent. The returned guard removes the key when dropped, including
    /// when the owning task panics or is cancelled.
    pub fn try_acquire(&self, key: InFlightKey) -> Option<InFlightGuard> {
        self.keys.insert(key).then(|| InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    #[cfg(test)]
    pub fn contains(&self, key: &InFlightKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<DashSet<InFlightKey>>,
    key: InFlightKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn second_acquire_fails_until_guard_dropped() {
        let set = InFlightSet::new();
        let key = InFlightKey::Order(Uuid::new_v4());

        let guard = set.try_acquire(key).unwrap();
        assert!(set.try_acquire(key).is_none());
        assert!(set.contains(&key));

        drop(guard);
        assert!(!set.contains(&key));
        assert!(set.try_acquire(key).is_some());
    }

    #[test]
    fn order_and_message_keys_do_not_collide() {
        let set = InFlightSet::new();
        let id = Uuid::new_v4();

        let _order = set.try_acquire(InFlightKey::Order(id)).unwrap();
        let _message = set.try_acquire(InFlightKey::Message(id)).unwrap();

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn guard_released_when_holder_panics() {
        let set = InFlightSet::new();
        let key = InFlightKey::Message(Uuid::new_v4());

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = set.try_acquire(key).unwrap();
            if set.contains(&key) {
                panic!("boom");
            }
        }));

        assert!(result.is_err());
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn guard_released_when_task_panics() {
        let set = InFlightSet::new();
        let key = InFlightKey::Order(Uuid::new_v4());

        let task_set = set.clone();
        let joined = tokio::spawn(async move {
            let _guard = task_set.try_acquire(key).unwrap();
            if task_set.contains(&key) {
                panic!("boom");
            }
        })
        .await;

        assert!(joined.unwrap_err().is_panic());
        assert!(!set.contains(&key));
    }
}

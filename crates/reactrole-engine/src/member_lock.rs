//! Per-member mutual exclusion
//!
//! Direct reconciliation and toggle settlement for one member never run
//! concurrently. Both take the member's lock: reaction events wait for it,
//! settlements only try it and retry after another window.

use std::sync::Arc;

use dashmap::DashMap;
use reactrole_types::MemberKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async locks keyed by member
#[derive(Default)]
pub struct MemberLocks {
    locks: DashMap<MemberKey, Arc<Mutex<()>>>,
}

/// Holds a member's lock; the slot is dropped once nobody else wants it
pub struct MemberGuard<'a> {
    locks: &'a MemberLocks,
    member: MemberKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl MemberLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, member: MemberKey) -> Arc<Mutex<()>> {
        self.locks.entry(member).or_default().clone()
    }

    fn guard(&self, member: MemberKey, guard: OwnedMutexGuard<()>) -> MemberGuard<'_> {
        MemberGuard {
            locks: self,
            member,
            guard: Some(guard),
        }
    }

    /// Take the lock if the member is idle.
    pub fn try_acquire(&self, member: MemberKey) -> Option<MemberGuard<'_>> {
        let guard = self.slot(member).try_lock_owned().ok()?;
        Some(self.guard(member, guard))
    }

    /// Wait for the lock. The flag is true if another holder had to finish
    /// first, meaning anything read about the member before may be stale.
    pub async fn acquire(&self, member: MemberKey) -> (MemberGuard<'_>, bool) {
        let slot = self.slot(member);
        match slot.clone().try_lock_owned() {
            Ok(guard) => (self.guard(member, guard), false),
            Err(_) => {
                let guard = slot.lock_owned().await;
                (self.guard(member, guard), true)
            }
        }
    }

    pub fn is_held(&self, member: MemberKey) -> bool {
        self.locks
            .get(&member)
            .is_some_and(|slot| slot.try_lock().is_err())
    }

    /// Members with a live slot
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for MemberGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .locks
            .remove_if(&self.member, |_, slot| Arc::strong_count(slot) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactrole_types::{GuildId, UserId};
    use std::time::Duration;

    fn key(user: u64) -> MemberKey {
        MemberKey::new(GuildId::new(1), UserId::new(user))
    }

    #[test]
    fn test_try_acquire_excludes_same_member() {
        let locks = MemberLocks::new();

        let guard = locks.try_acquire(key(2));
        assert!(guard.is_some());
        assert!(locks.is_held(key(2)));
        assert!(locks.try_acquire(key(2)).is_none());
        assert!(locks.try_acquire(key(3)).is_some());

        drop(guard);
        assert!(!locks.is_held(key(2)));
        assert!(locks.try_acquire(key(2)).is_some());
    }

    #[test]
    fn test_released_slots_are_dropped() {
        let locks = MemberLocks::new();
        {
            let _a = locks.try_acquire(key(2));
            let _b = locks.try_acquire(key(3));
            assert_eq!(locks.len(), 2);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_holder() {
        let locks = Arc::new(MemberLocks::new());

        let (first, waited) = locks.acquire(key(2)).await;
        assert!(!waited);

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let (_guard, waited) = locks.acquire(key(2)).await;
                waited
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(first);
        assert!(contender.await.unwrap());
        assert!(locks.is_empty());
    }
}

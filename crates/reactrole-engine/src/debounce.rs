//! Toggle settlement with debouncing
//!
//! A member flicking between options of a toggle group produces a burst of
//! reactions. Each grant request schedules a settlement after the debounce
//! window; a newer request for the same (member, message) supersedes the
//! pending one. A settlement holds the member's lock from
//! [`MemberLocks`](crate::member_lock::MemberLocks), so it never overlaps
//! another settlement or a direct reaction of the same member. One that
//! finds the member busy retries after another window, and is abandoned
//! after the configured number of attempts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reactrole_types::{Action, Binding, BindingId, ChannelId, MemberKey, MessageId};
use tracing::{debug, instrument, warn};

use crate::platform::Member;
use crate::policy::{Admission, RolePolicy};

/// One pending settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceTask {
    pub member: MemberKey,
    pub channel: ChannelId,
    pub message: MessageId,
    /// Binding the member should end up holding; `None` only clears the group
    pub candidate: Option<BindingId>,
}

impl DebounceTask {
    pub fn for_candidate(member: MemberKey, binding: &Binding) -> Self {
        Self {
            member,
            channel: binding.channel,
            message: binding.message,
            candidate: Some(binding.id.clone()),
        }
    }
}

/// Observable state of a (member, message) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Scheduled,
    Running,
}

/// Marks the (member, message) whose settlement is executing
struct RunningMark<'a> {
    running: &'a DashMap<MemberKey, MessageId>,
    member: MemberKey,
}

impl<'a> RunningMark<'a> {
    fn set(running: &'a DashMap<MemberKey, MessageId>, member: MemberKey, message: MessageId) -> Self {
        running.insert(member, message);
        Self { running, member }
    }
}

impl Drop for RunningMark<'_> {
    fn drop(&mut self) {
        self.running.remove(&self.member);
    }
}

/// Debounced settlement of toggle groups
pub struct ToggleDebouncer {
    policy: Arc<RolePolicy>,
    window: Duration,
    max_attempts: u32,
    /// Latest generation scheduled per (member, message)
    pending: DashMap<(MemberKey, MessageId), u64>,
    running: DashMap<MemberKey, MessageId>,
    generation: AtomicU64,
    settled: AtomicU64,
    abandoned: AtomicU64,
}

impl ToggleDebouncer {
    pub fn new(policy: Arc<RolePolicy>, window: Duration, max_attempts: u32) -> Self {
        Self {
            policy,
            window,
            max_attempts: max_attempts.max(1),
            pending: DashMap::new(),
            running: DashMap::new(),
            generation: AtomicU64::new(0),
            settled: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
        }
    }

    /// Schedule a settlement, superseding any pending one for the same
    /// member and message.
    pub fn schedule(self: &Arc<Self>, task: DebounceTask) {
        let key = (task.member, task.message);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if self.pending.insert(key, generation).is_some() {
            debug!(member = %task.member, message = %task.message, "Superseding pending settlement");
        }

        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(task, generation).await });
    }

    pub fn state(&self, member: MemberKey, message: MessageId) -> DebounceState {
        if self.running.get(&member).is_some_and(|m| *m == message) {
            DebounceState::Running
        } else if self.pending.contains_key(&(member, message)) {
            DebounceState::Scheduled
        } else {
            DebounceState::Idle
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Settlements that ran to completion
    pub fn settled_count(&self) -> u64 {
        self.settled.load(Ordering::Relaxed)
    }

    /// Settlements given up because the member stayed busy
    pub fn abandoned_count(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    fn is_current(&self, key: &(MemberKey, MessageId), generation: u64) -> bool {
        self.pending.get(key).is_some_and(|g| *g == generation)
    }

    async fn run(&self, task: DebounceTask, generation: u64) {
        let key = (task.member, task.message);
        let mut attempt = 0;

        loop {
            tokio::time::sleep(self.window).await;

            if !self.is_current(&key, generation) {
                debug!(member = %task.member, generation, "Settlement superseded");
                return;
            }

            if let Some(_serial) = self.policy.member_locks().try_acquire(task.member) {
                if self
                    .pending
                    .remove_if(&key, |_, g| *g == generation)
                    .is_none()
                {
                    return;
                }
                let _running = RunningMark::set(&self.running, task.member, task.message);
                self.settle(&task).await;
                self.settled.fetch_add(1, Ordering::Relaxed);
                return;
            }

            attempt += 1;
            if attempt >= self.max_attempts {
                warn!(
                    member = %task.member,
                    message = %task.message,
                    attempts = attempt,
                    "Member still busy, abandoning toggle settlement"
                );
                self.pending.remove_if(&key, |_, g| *g == generation);
                self.abandoned.fetch_add(1, Ordering::Relaxed);
                return;
            }
            debug!(member = %task.member, attempt, "Member busy, retrying settlement");
        }
    }

    /// Leave the member holding at most the candidate's roles within the group.
    #[instrument(skip(self, task), fields(member = %task.member, message = %task.message))]
    async fn settle(&self, task: &DebounceTask) {
        let policy = &self.policy;
        let mut member = match policy
            .platform()
            .resolve_member(task.member.guild, task.member.user)
            .await
        {
            Ok(Some(member)) => member,
            Ok(None) => {
                debug!("Member left the guild, nothing to settle");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to resolve member for settlement");
                return;
            }
        };

        let group = policy.registry().toggle_group(task.message);
        for other in group
            .iter()
            .filter(|b| Some(&b.id) != task.candidate.as_ref())
        {
            self.release(other, &mut member).await;
        }

        let Some(candidate) = task
            .candidate
            .as_ref()
            .and_then(|id| policy.registry().get_enabled(id))
        else {
            return;
        };

        match policy
            .platform()
            .has_reacted(candidate.channel, candidate.message, &candidate.emoji, member.user)
            .await
        {
            Ok(true) => self.claim(&candidate, &mut member).await,
            Ok(false) => debug!(binding = %candidate.id, "Candidate reaction withdrawn, not granting"),
            Err(e) => warn!(binding = %candidate.id, error = %e, "Failed to confirm candidate reaction"),
        }
    }

    /// Revoke another option of the group and clear the member's reaction on it.
    async fn release(&self, binding: &Binding, member: &mut Member) {
        let policy = &self.policy;
        if binding.roles.iter().any(|r| member.has_role(*r)) {
            let roles = policy
                .guard()
                .filter_authorized(Action::Revoke, binding, member)
                .await;
            policy.revoke(binding, member, &roles).await;
        } else {
            policy.forget_winner(binding, member.user);
        }
        policy.remove_reaction(binding, member.user).await;
    }

    async fn claim(&self, binding: &Binding, member: &mut Member) {
        let policy = &self.policy;
        let roles = policy
            .guard()
            .filter_authorized(Action::Grant, binding, member)
            .await;
        if roles.is_empty() {
            return;
        }

        // Capacity may have been reached while the settlement was pending
        let current = policy.registry().get(&binding.id).unwrap_or_else(|| binding.clone());
        if policy.admit(&current, member).await != Admission::Admitted {
            return;
        }

        policy.grant(&current, member, &roles).await;
    }
}

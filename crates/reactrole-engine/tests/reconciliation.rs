//! Reaction reconciliation: kinds, capacity, requirements and authorization.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::*;
use reactrole_engine::{
    BindingSpec, DispatchOutcome, EngineConfig, IgnoreReason, Member, Outcome, PlatformCall,
    ReactRoleEngine, RoleHooks,
};
use reactrole_store::InMemoryBindingStore;
use reactrole_types::{
    Action, Binding, BindingKind, ChannelId, EmojiId, MessageId, ReactRoleEvent, RequirementKind,
    Requirements, RoleId,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn granted(roles: usize) -> DispatchOutcome {
    DispatchOutcome::Reconciled(Outcome::Granted { roles })
}

fn revoked(roles: usize) -> DispatchOutcome {
    DispatchOutcome::Reconciled(Outcome::Revoked { roles })
}

struct VetoGrant(RoleId);

#[async_trait]
impl RoleHooks for VetoGrant {
    fn name(&self) -> &str {
        "veto-grant"
    }

    async fn pre_grant(&self, _binding: &Binding, _member: &Member, role: RoleId) -> bool {
        role != self.0
    }
}

// ---------------------------------------------------------------------------
// Normal bindings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reaction_grants_and_withdrawal_revokes() {
    let h = Harness::new();
    let binding = h.bind_simple("✅", vec![role(1)]).await;
    let alice = h.join(1);
    let mut rx = h.engine.subscribe();

    assert_eq!(h.react(alice, "✅").await, granted(1));
    assert_eq!(h.roles(alice), vec![role(1)]);
    assert_eq!(h.winners(&binding), vec![alice]);

    assert_eq!(h.unreact(alice, "✅").await, revoked(1));
    assert!(h.roles(alice).is_empty());
    assert!(h.winners(&binding).is_empty());

    let events = drain(&mut rx);
    assert!(matches!(events[0], ReactRoleEvent::RoleGranted { role: r, .. } if r == role(1)));
    assert!(matches!(events[1], ReactRoleEvent::RoleRevoked { role: r, .. } if r == role(1)));

    h.engine.flush().await;
    let stored = h.store.snapshot(&binding.id).unwrap();
    assert!(stored.winners.is_empty());
}

#[tokio::test]
async fn repeated_grant_is_idempotent() {
    let h = Harness::new();
    let binding = h.bind_simple("✅", vec![role(1), role(2)]).await;
    let alice = h.join(1);
    h.platform.clear_calls();

    assert_eq!(h.react(alice, "✅").await, granted(2));
    assert_eq!(h.react(alice, "✅").await, granted(0));

    let adds = h
        .platform
        .calls()
        .into_iter()
        .filter(|c| matches!(c, PlatformCall::AddRole { .. }))
        .count();
    assert_eq!(adds, 2);
    assert_eq!(h.winners(&binding), vec![alice]);
}

#[tokio::test]
async fn member_already_holding_roles_is_not_recorded_as_winner() {
    let h = Harness::new();
    let binding = h.bind_simple("✅", vec![role(1)]).await;
    h.platform
        .add_member(Member::new(GUILD, user(1)).with_roles([role(1)]));

    assert_eq!(h.react(user(1), "✅").await, granted(0));
    assert!(h.winners(&binding).is_empty());
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn capacity_limits_concurrent_winners() {
    let h = Harness::new();
    let binding = h
        .bind(BindingSpec::new(CHANNEL, MESSAGE, "🎟️", vec![role(1)]).with_max(1))
        .await;
    let (a, b, c) = (h.join(1), h.join(2), h.join(3));

    assert_eq!(h.react(a, "🎟️").await, granted(1));

    assert_eq!(
        h.react(b, "🎟️").await,
        DispatchOutcome::Reconciled(Outcome::AtCapacity)
    );
    assert!(!h.reacted(b, "🎟️"));
    assert!(h.roles(b).is_empty());
    // The removal comes back as a withdrawal, which must not disturb anyone
    assert_eq!(h.pump().await, vec![revoked(0)]);

    assert_eq!(h.unreact(a, "🎟️").await, revoked(1));
    assert_eq!(h.react(c, "🎟️").await, granted(1));

    assert_eq!(h.winners(&binding), vec![c]);
    assert!(h.roles(a).is_empty());
}

// ---------------------------------------------------------------------------
// Requirements
// ---------------------------------------------------------------------------

#[tokio::test]
async fn boost_requirement_gates_grant() {
    let h = Harness::new();
    let binding = h
        .bind(
            BindingSpec::new(CHANNEL, MESSAGE, "💎", vec![role(1)]).with_requirements(
                Requirements {
                    boost: true,
                    verified_developer: false,
                },
            ),
        )
        .await;
    let plain = h.join(1);
    h.platform
        .add_member(Member::new(GUILD, user(2)).boosting());
    let mut rx = h.engine.subscribe();

    assert_eq!(
        h.react(plain, "💎").await,
        DispatchOutcome::Reconciled(Outcome::Ineligible(RequirementKind::Boost))
    );
    assert!(!h.reacted(plain, "💎"));
    assert!(h.roles(plain).is_empty());
    assert_eq!(
        drain(&mut rx),
        vec![ReactRoleEvent::MissingRequirement {
            kind: RequirementKind::Boost,
            member: plain,
            binding: binding.id.clone(),
        }]
    );

    assert_eq!(h.react(user(2), "💎").await, granted(1));
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_roles_are_skipped_and_reported_once() {
    let h = Harness::new();
    let binding = h.bind_simple("✅", vec![role(1), role(2)]).await;
    h.platform.deny_role(role(2));
    let alice = h.join(1);
    let mut rx = h.engine.subscribe();

    assert_eq!(h.react(alice, "✅").await, granted(1));
    assert_eq!(h.unreact(alice, "✅").await, revoked(1));
    assert_eq!(h.react(alice, "✅").await, granted(1));
    assert_eq!(h.roles(alice), vec![role(1)]);

    let warnings: Vec<ReactRoleEvent> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, ReactRoleEvent::MissingAuthorization { .. }))
        .collect();
    assert_eq!(
        warnings,
        vec![ReactRoleEvent::MissingAuthorization {
            action: Action::Grant,
            member: alice,
            roles: vec![role(2)],
            binding: binding.id.clone(),
        }]
    );
}

#[tokio::test]
async fn fully_unauthorized_binding_does_nothing() {
    let h = Harness::new();
    h.bind_simple("✅", vec![role(1)]).await;
    h.platform.deny_role(role(1));
    let alice = h.join(1);

    assert_eq!(
        h.react(alice, "✅").await,
        DispatchOutcome::Reconciled(Outcome::Unauthorized)
    );
    assert!(h.roles(alice).is_empty());
}

// ---------------------------------------------------------------------------
// Kind flags
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reversed_binding_inverts_actions() {
    let h = Harness::new();
    h.bind(BindingSpec::new(CHANNEL, MESSAGE, "🔁", vec![role(1)]).with_kind(BindingKind::REVERSED))
        .await;
    h.platform
        .add_member(Member::new(GUILD, user(1)).with_roles([role(1)]));

    assert_eq!(h.react(user(1), "🔁").await, revoked(1));
    assert!(h.roles(user(1)).is_empty());

    assert_eq!(h.unreact(user(1), "🔁").await, granted(1));
    assert_eq!(h.roles(user(1)), vec![role(1)]);
}

#[tokio::test]
async fn just_win_keeps_roles_after_withdrawal() {
    let h = Harness::new();
    h.bind(BindingSpec::new(CHANNEL, MESSAGE, "🏆", vec![role(1)]).with_kind(BindingKind::JUST_WIN))
        .await;
    let alice = h.join(1);

    assert_eq!(h.react(alice, "🏆").await, granted(1));
    assert_eq!(
        h.unreact(alice, "🏆").await,
        DispatchOutcome::Reconciled(Outcome::Kept)
    );
    assert_eq!(h.roles(alice), vec![role(1)]);
}

#[tokio::test]
async fn just_lose_removes_reaction_then_revokes() {
    let h = Harness::new();
    h.bind(BindingSpec::new(CHANNEL, MESSAGE, "🚪", vec![role(1)]).with_kind(BindingKind::JUST_LOSE))
        .await;
    h.platform
        .add_member(Member::new(GUILD, user(1)).with_roles([role(1)]));

    assert_eq!(
        h.react(user(1), "🚪").await,
        DispatchOutcome::Reconciled(Outcome::ReactionRemoved)
    );
    assert!(!h.reacted(user(1), "🚪"));
    assert_eq!(h.roles(user(1)), vec![role(1)]);

    assert_eq!(h.pump().await, vec![revoked(1)]);
    assert!(h.roles(user(1)).is_empty());
}

// ---------------------------------------------------------------------------
// Hooks and filtering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hooks_can_veto_individual_roles() {
    init_tracing();
    let platform = platform();
    let engine = ReactRoleEngine::builder()
        .with_platform(platform.clone())
        .with_store(Arc::new(InMemoryBindingStore::new()))
        .with_hooks(Arc::new(VetoGrant(role(2))))
        .with_config(EngineConfig::default())
        .build()
        .unwrap();
    engine
        .register(BindingSpec::new(CHANNEL, MESSAGE, "✅", vec![role(1), role(2)]))
        .await
        .unwrap();
    platform.add_member(Member::new(GUILD, user(1)));

    let event = platform.react(MESSAGE, &EmojiId::new("✅"), user(1));
    assert_eq!(engine.dispatch(event).await, granted(1));
    assert_eq!(platform.member_roles(GUILD, user(1)), vec![role(1)]);
}

#[tokio::test]
async fn bots_direct_messages_and_strangers_are_ignored() {
    let h = Harness::new();
    h.bind_simple("✅", vec![role(1)]).await;
    h.platform
        .add_member(Member::new(GUILD, user(9)).bot());
    h.platform.add_direct_message(ChannelId::new(900), MessageId::new(901));

    assert_eq!(
        h.react(BOT, "✅").await,
        DispatchOutcome::Ignored(IgnoreReason::OwnReaction)
    );
    assert_eq!(
        h.react(user(9), "✅").await,
        DispatchOutcome::Ignored(IgnoreReason::BotAccount)
    );
    assert_eq!(
        h.react(user(1), "✅").await,
        DispatchOutcome::Ignored(IgnoreReason::MemberUnavailable)
    );
    h.join(2);
    assert_eq!(
        h.react(user(2), "❌").await,
        DispatchOutcome::Ignored(IgnoreReason::NoBinding)
    );

    let dm = h
        .platform
        .react(MessageId::new(901), &EmojiId::new("✅"), user(2));
    assert_eq!(
        h.engine.dispatch(dm).await,
        DispatchOutcome::Ignored(IgnoreReason::NotInGuild)
    );
    assert!(h.roles(user(9)).is_empty());
}

//! Toggle groups: debounced settlement and per-member serialization.

mod common;

use std::time::Duration;

use common::*;
use reactrole_engine::{BindingSpec, DebounceState, DispatchOutcome, EngineConfig, Outcome};
use reactrole_types::{Binding, BindingKind, EmojiId, MemberKey, MessageId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn toggle_group(h: &Harness) -> (Binding, Binding, Binding) {
    let mut bindings = Vec::new();
    for (n, emoji) in ["🍎", "🍌", "🍒"].into_iter().enumerate() {
        let spec = BindingSpec::new(CHANNEL, MESSAGE, emoji, vec![role(n as u64 + 1)])
            .with_kind(BindingKind::TOGGLE);
        bindings.push(h.bind(spec).await);
    }
    let c = bindings.pop().unwrap();
    let b = bindings.pop().unwrap();
    let a = bindings.pop().unwrap();
    (a, b, c)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn toggle_grant_is_deferred_until_window_elapses() {
    let h = Harness::new();
    let (apple, _, _) = toggle_group(&h).await;
    let alice = h.join(1);

    assert_eq!(
        h.react(alice, "🍎").await,
        DispatchOutcome::Reconciled(Outcome::Deferred)
    );
    assert!(h.roles(alice).is_empty());
    assert_eq!(
        h.engine.toggle_state(MemberKey::new(GUILD, alice), MESSAGE),
        DebounceState::Scheduled
    );

    h.settle().await;
    assert_eq!(h.roles(alice), vec![role(1)]);
    assert_eq!(h.winners(&apple), vec![alice]);
    assert_eq!(
        h.engine.toggle_state(MemberKey::new(GUILD, alice), MESSAGE),
        DebounceState::Idle
    );
}

#[tokio::test(start_paused = true)]
async fn rapid_toggling_converges_on_last_choice() {
    let h = Harness::new();
    let (apple, banana, cherry) = toggle_group(&h).await;
    let alice = h.join(1);

    h.react(alice, "🍎").await;
    h.react(alice, "🍌").await;
    h.react(alice, "🍒").await;
    h.settle().await;

    assert_eq!(h.roles(alice), vec![role(3)]);
    assert!(!h.reacted(alice, "🍎"));
    assert!(!h.reacted(alice, "🍌"));
    assert!(h.reacted(alice, "🍒"));
    assert!(h.winners(&apple).is_empty());
    assert!(h.winners(&banana).is_empty());
    assert_eq!(h.winners(&cherry), vec![alice]);
}

#[tokio::test(start_paused = true)]
async fn switching_option_moves_the_role() {
    let h = Harness::new();
    let (apple, banana, _) = toggle_group(&h).await;
    let alice = h.join(1);

    h.react(alice, "🍎").await;
    h.settle().await;
    assert_eq!(h.roles(alice), vec![role(1)]);

    h.react(alice, "🍌").await;
    h.settle().await;

    assert_eq!(h.roles(alice), vec![role(2)]);
    assert!(!h.reacted(alice, "🍎"));
    assert!(h.winners(&apple).is_empty());
    assert_eq!(h.winners(&banana), vec![alice]);

    h.engine.flush().await;
    assert!(h.store.snapshot(&apple.id).unwrap().winners.is_empty());
    assert_eq!(h.store.snapshot(&banana.id).unwrap().winners, vec![alice]);
}

#[tokio::test(start_paused = true)]
async fn withdrawn_candidate_is_not_granted() {
    let h = Harness::new();
    toggle_group(&h).await;
    let alice = h.join(1);

    h.react(alice, "🍎").await;
    h.unreact(alice, "🍎").await;
    h.settle().await;

    assert!(h.roles(alice).is_empty());
}

#[tokio::test(start_paused = true)]
async fn members_settle_independently() {
    let h = Harness::new();
    toggle_group(&h).await;
    let (alice, bob) = (h.join(1), h.join(2));

    h.react(alice, "🍎").await;
    h.react(bob, "🍌").await;
    h.settle().await;

    assert_eq!(h.roles(alice), vec![role(1)]);
    assert_eq!(h.roles(bob), vec![role(2)]);
}

#[tokio::test(start_paused = true)]
async fn toggle_respects_capacity_at_settlement() {
    let h = Harness::new();
    let spec = BindingSpec::new(CHANNEL, MESSAGE, "🍎", vec![role(1)])
        .with_kind(BindingKind::TOGGLE)
        .with_max(1);
    let apple = h.bind(spec).await;
    let (alice, bob) = (h.join(1), h.join(2));

    // Both pass the capacity check while nobody holds the role yet
    h.react(alice, "🍎").await;
    h.react(bob, "🍎").await;
    h.settle().await;

    assert_eq!(h.winners(&apple).len(), 1);
    let holders = [alice, bob]
        .into_iter()
        .filter(|u| h.roles(*u) == vec![role(1)])
        .count();
    assert_eq!(holders, 1);
}

#[tokio::test(start_paused = true)]
async fn custom_window_is_honoured() {
    let h = Harness::with_config(EngineConfig {
        debounce_window_ms: 200,
        ..Default::default()
    });
    toggle_group(&h).await;
    let alice = h.join(1);

    h.react(alice, "🍎").await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(h.roles(alice), vec![role(1)]);
}

// ---------------------------------------------------------------------------
// Serialization against a slow platform
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn withdrawal_during_settlement_waits_and_revokes() {
    let h = Harness::new();
    let (apple, _, _) = toggle_group(&h).await;
    let alice = h.join(1);
    h.platform.set_role_latency(Duration::from_secs(1));

    h.react(alice, "🍎").await;
    // Settlement starts at 1500ms and is inside add_role until 2500ms
    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(
        h.engine.toggle_state(MemberKey::new(GUILD, alice), MESSAGE),
        DebounceState::Running
    );

    assert_eq!(
        h.unreact(alice, "🍎").await,
        DispatchOutcome::Reconciled(Outcome::Revoked { roles: 1 })
    );
    h.pump().await;

    assert!(!h.reacted(alice, "🍎"));
    assert!(h.roles(alice).is_empty());
    assert!(h.winners(&apple).is_empty());
    assert_eq!(h.engine.debouncer().settled_count(), 1);

    h.engine.flush().await;
    assert!(h.store.snapshot(&apple.id).unwrap().winners.is_empty());
}

#[tokio::test(start_paused = true)]
async fn busy_member_settlement_is_abandoned_after_retries() {
    let h = Harness::new();
    let (apple, _, _) = toggle_group(&h).await;
    let other = MessageId::new(301);
    h.platform.add_message(CHANNEL, other);
    let peach = h
        .bind(BindingSpec::new(CHANNEL, other, "🍑", vec![role(4)]).with_kind(BindingKind::TOGGLE))
        .await;
    let alice = h.join(1);
    let key = MemberKey::new(GUILD, alice);

    // The first settlement holds alice inside add_role from 1500ms to 6500ms
    h.platform.set_role_latency(Duration::from_secs(5));
    h.react(alice, "🍎").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let event = h.platform.react(other, &EmojiId::new("🍑"), alice);
    assert_eq!(
        h.engine.dispatch(event).await,
        DispatchOutcome::Reconciled(Outcome::Deferred)
    );

    // Second settlement finds alice busy at 1600ms, 3100ms and 4600ms
    tokio::time::sleep(Duration::from_millis(1900)).await;
    assert_eq!(h.engine.toggle_state(key, MESSAGE), DebounceState::Running);
    assert_eq!(h.engine.toggle_state(key, other), DebounceState::Scheduled);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(h.engine.debouncer().abandoned_count(), 0);
    assert_eq!(h.engine.toggle_state(key, other), DebounceState::Scheduled);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.engine.debouncer().abandoned_count(), 1);
    assert_eq!(h.engine.toggle_state(key, other), DebounceState::Idle);
    assert_eq!(h.engine.debouncer().settled_count(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.engine.debouncer().settled_count(), 1);
    assert_eq!(h.engine.debouncer().pending_count(), 0);
    assert_eq!(h.roles(alice), vec![role(1)]);
    assert_eq!(h.winners(&apple), vec![alice]);
    assert!(h.winners(&peach).is_empty());
}

//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use reactrole_engine::{
    BindingSpec, DispatchOutcome, EngineConfig, Member, MockPlatform, ReactRoleEngine,
};
use reactrole_store::InMemoryBindingStore;
use reactrole_types::{
    Binding, ChannelId, EmojiId, EventEnvelope, GuildId, MessageId, ReactRoleEvent, RoleId, UserId,
};
use tokio::sync::broadcast;

pub const BOT: UserId = UserId::new(1);
pub const GUILD: GuildId = GuildId::new(100);
pub const CHANNEL: ChannelId = ChannelId::new(200);
pub const MESSAGE: MessageId = MessageId::new(300);

pub fn role(n: u64) -> RoleId {
    RoleId::new(1000 + n)
}

pub fn user(n: u64) -> UserId {
    UserId::new(5000 + n)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("reactrole=debug")
        .try_init();
}

/// A guild with one channel, one message and roles 1..=5.
pub fn platform() -> Arc<MockPlatform> {
    let platform = Arc::new(MockPlatform::new(BOT));
    platform.add_channel(GUILD, CHANNEL);
    platform.add_message(CHANNEL, MESSAGE);
    for n in 1..=5 {
        platform.create_role(GUILD, role(n));
    }
    platform
}

pub struct Harness {
    pub platform: Arc<MockPlatform>,
    pub store: Arc<InMemoryBindingStore>,
    pub engine: ReactRoleEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(platform(), Arc::new(InMemoryBindingStore::new()), EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with(platform(), Arc::new(InMemoryBindingStore::new()), config)
    }

    pub fn with(
        platform: Arc<MockPlatform>,
        store: Arc<InMemoryBindingStore>,
        config: EngineConfig,
    ) -> Self {
        init_tracing();
        let engine = ReactRoleEngine::builder()
            .with_platform(platform.clone())
            .with_store(store.clone())
            .with_config(config)
            .build()
            .expect("engine builds");
        Self {
            platform,
            store,
            engine,
        }
    }

    /// Add a plain member to the guild.
    pub fn join(&self, n: u64) -> UserId {
        self.platform.add_member(Member::new(GUILD, user(n)));
        user(n)
    }

    pub async fn bind(&self, spec: BindingSpec) -> Binding {
        self.engine.register(spec).await.expect("binding registers")
    }

    pub async fn bind_simple(&self, emoji: &str, roles: Vec<RoleId>) -> Binding {
        self.bind(BindingSpec::new(CHANNEL, MESSAGE, emoji, roles)).await
    }

    pub async fn react(&self, who: UserId, emoji: &str) -> DispatchOutcome {
        let event = self.platform.react(MESSAGE, &EmojiId::new(emoji), who);
        self.engine.dispatch(event).await
    }

    pub async fn unreact(&self, who: UserId, emoji: &str) -> DispatchOutcome {
        let event = self.platform.unreact(MESSAGE, &EmojiId::new(emoji), who);
        self.engine.dispatch(event).await
    }

    /// Feed back the reaction removals the engine performed, until quiet.
    pub async fn pump(&self) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let events = self.platform.drain_events();
            if events.is_empty() {
                return outcomes;
            }
            for event in events {
                outcomes.push(self.engine.dispatch(event).await);
            }
        }
    }

    /// Let pending toggle settlements run, then pump.
    pub async fn settle(&self) {
        let window = self.engine.config().debounce_window();
        tokio::time::sleep(window + Duration::from_millis(100)).await;
        self.pump().await;
    }

    pub fn roles(&self, who: UserId) -> Vec<RoleId> {
        self.platform.member_roles(GUILD, who)
    }

    pub fn reacted(&self, who: UserId, emoji: &str) -> bool {
        self.platform
            .reactors(MESSAGE, &EmojiId::new(emoji))
            .contains(&who)
    }

    pub fn winners(&self, binding: &Binding) -> Vec<UserId> {
        self.engine
            .binding(&binding.id)
            .map(|b| b.winners)
            .unwrap_or_default()
    }
}

/// Collect every event currently buffered on a subscription.
pub fn drain(rx: &mut broadcast::Receiver<EventEnvelope>) -> Vec<ReactRoleEvent> {
    let mut events = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        events.push(envelope.event);
    }
    events
}

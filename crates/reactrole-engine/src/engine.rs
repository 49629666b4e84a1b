//! ReactRoleEngine - the main entry point
//!
//! Owns every component and exposes the operations a host needs: boot,
//! event dispatch, registration, disable and event subscription.

use std::sync::Arc;

use reactrole_store::BindingStore;
use reactrole_types::{Binding, BindingId, EventEnvelope, MemberKey, MessageId};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use crate::boot::{BootReconciler, BootReport};
use crate::builder::ReactRoleEngineBuilder;
use crate::cascade::CascadeHandler;
use crate::config::EngineConfig;
use crate::debounce::{DebounceState, ToggleDebouncer};
use crate::dispatcher::{DispatchOutcome, Dispatcher, PlatformEvent};
use crate::error::Result;
use crate::events::EventAggregator;
use crate::hooks::RoleHooks;
use crate::persist::Persister;
use crate::platform::ChatPlatform;
use crate::policy::RolePolicy;
use crate::readiness::ReadinessGate;
use crate::reconciler::Reconciler;
use crate::registration::{BindingSelector, BindingSpec, Registrar};
use crate::registry::BindingRegistry;

/// Reaction role engine
pub struct ReactRoleEngine {
    config: EngineConfig,
    registry: Arc<BindingRegistry>,
    events: EventAggregator,
    persister: Persister,
    persist_task: JoinHandle<()>,
    debouncer: Arc<ToggleDebouncer>,
    dispatcher: Arc<Dispatcher>,
    registrar: Registrar,
    boot: BootReconciler,
    readiness: Arc<ReadinessGate>,
}

impl ReactRoleEngine {
    pub fn builder() -> ReactRoleEngineBuilder {
        ReactRoleEngineBuilder::new()
    }

    pub(crate) fn new(
        config: EngineConfig,
        platform: Arc<dyn ChatPlatform>,
        store: Arc<dyn BindingStore>,
        hooks: Arc<dyn RoleHooks>,
    ) -> Self {
        let registry = Arc::new(BindingRegistry::new());
        let events = EventAggregator::new(config.event_channel_capacity);
        let (persister, persist_task) = Persister::spawn(store.clone(), registry.clone());

        let policy = Arc::new(RolePolicy::new(
            platform,
            registry.clone(),
            hooks,
            events.clone(),
            persister.clone(),
        ));
        let cascade = Arc::new(CascadeHandler::new(
            registry.clone(),
            persister.clone(),
            events.clone(),
            config.hard_delete,
        ));
        let debouncer = Arc::new(ToggleDebouncer::new(
            policy.clone(),
            config.debounce_window(),
            config.debounce_max_attempts,
        ));
        let reconciler = Arc::new(Reconciler::new(policy.clone(), debouncer.clone()));
        let readiness = Arc::new(ReadinessGate::new(
            config.ready_quiet_period(),
            events.clone(),
            registry.clone(),
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            policy.clone(),
            reconciler.clone(),
            cascade.clone(),
        ));
        let registrar = Registrar::new(policy.clone(), cascade.clone());
        let boot = BootReconciler::new(store, policy, reconciler, cascade, readiness.clone());

        Self {
            config,
            registry,
            events,
            persister,
            persist_task,
            debouncer,
            dispatcher,
            registrar,
            boot,
            readiness,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load persisted bindings and reconcile them against live state.
    ///
    /// `Ready` is emitted once the quiet period elapses afterwards.
    pub async fn start(&self) -> Result<BootReport> {
        info!("Starting reaction role engine");
        self.boot.run().await
    }

    /// Handle one platform event.
    pub async fn dispatch(&self, event: PlatformEvent) -> DispatchOutcome {
        self.dispatcher.dispatch(event).await
    }

    /// Spawn a task consuming platform events from `rx`.
    pub fn spawn_dispatcher(&self, rx: mpsc::Receiver<PlatformEvent>) -> JoinHandle<()> {
        tokio::spawn(self.dispatcher.clone().run(rx))
    }

    pub async fn register(&self, spec: BindingSpec) -> Result<Binding> {
        self.registrar.register(spec).await
    }

    pub fn disable(&self, selector: impl Into<BindingSelector>) -> Result<Binding> {
        self.registrar.disable(selector)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    pub fn binding(&self, id: &BindingId) -> Option<Binding> {
        self.registry.get(id)
    }

    /// All known bindings, including disabled ones.
    pub fn bindings(&self) -> Vec<Binding> {
        self.registry.list()
    }

    pub fn toggle_state(&self, member: MemberKey, message: MessageId) -> DebounceState {
        self.debouncer.state(member, message)
    }

    /// Toggle debouncer, for its settlement counters
    pub fn debouncer(&self) -> &Arc<ToggleDebouncer> {
        &self.debouncer
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    pub async fn wait_ready(&self) {
        self.readiness.wait().await
    }

    /// Wait until all queued store writes have been attempted.
    pub async fn flush(&self) {
        self.persister.flush().await
    }

    /// Flush pending writes and stop the persistence task.
    pub async fn shutdown(self) {
        self.persister.flush().await;
        self.persist_task.abort();
        info!("Reaction role engine stopped");
    }
}

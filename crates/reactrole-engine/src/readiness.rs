//! Readiness signalling
//!
//! `Ready` fires once, a quiet period after the last boot reconciliation
//! finished, provided no other reconciliation started in between.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reactrole_types::ReactRoleEvent;
use tokio::sync::watch;
use tracing::info;

use crate::events::EventAggregator;
use crate::registry::BindingRegistry;

/// Trailing-edge readiness timer
pub struct ReadinessGate {
    quiet_period: Duration,
    epoch: AtomicU64,
    in_flight: AtomicUsize,
    fired: AtomicBool,
    ready_tx: watch::Sender<bool>,
    events: EventAggregator,
    registry: Arc<BindingRegistry>,
}

impl ReadinessGate {
    pub fn new(
        quiet_period: Duration,
        events: EventAggregator,
        registry: Arc<BindingRegistry>,
    ) -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            quiet_period,
            epoch: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            fired: AtomicBool::new(false),
            ready_tx,
            events,
            registry,
        }
    }

    /// A reconciliation started; cancels any armed timer.
    pub fn begin(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    /// A reconciliation finished; re-arms the timer.
    pub fn finish(self: &Arc<Self>) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.arm();
    }

    /// Start the quiet-period timer from now.
    pub fn arm(self: &Arc<Self>) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.quiet_period).await;
            this.fire(epoch);
        });
    }

    pub fn is_ready(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Wait until `Ready` has fired.
    pub async fn wait(&self) {
        let mut rx = self.ready_tx.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    fn fire(&self, epoch: u64) {
        if self.epoch.load(Ordering::SeqCst) != epoch || self.in_flight.load(Ordering::SeqCst) > 0 {
            return;
        }
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }

        let bindings = self.registry.enabled_count();
        info!(bindings, "Engine ready");
        self.events.emit(ReactRoleEvent::Ready { bindings });
        self.ready_tx.send_replace(true);
    }
}

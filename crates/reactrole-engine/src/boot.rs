//! Boot reconciliation
//!
//! Reactions and roles drift while the engine is offline. On start every
//! enabled binding is compared with the live reactor list: stale winners are
//! revoked, reactors are granted, and bindings whose guild, channel or
//! message vanished are disabled.

use std::collections::HashSet;
use std::sync::Arc;

use reactrole_store::BindingStore;
use reactrole_types::{Action, Binding, DisableReason, GuildId, UserId};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::cascade::CascadeHandler;
use crate::error::Result;
use crate::platform::{PlatformError, PlatformResult};
use crate::policy::RolePolicy;
use crate::readiness::ReadinessGate;
use crate::reconciler::{Outcome, Reconciler};

/// Summary of a boot reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootReport {
    /// Bindings loaded from the store
    pub loaded: usize,
    /// Enabled bindings reconciled against live state
    pub reconciled: usize,
    /// Bindings disabled because their target is gone
    pub disabled: usize,
    /// Bindings skipped because their guild failed earlier
    pub skipped: usize,
    /// Guilds whose reconciliation was abandoned on a transient error
    pub failed_guilds: Vec<GuildId>,
    /// Roles granted to reactors missing them
    pub granted: usize,
    /// Roles revoked from winners whose reaction is gone
    pub revoked: usize,
    /// Reactions removed for users no longer in the guild
    pub stale_reactions_removed: usize,
}

/// Per-binding counters folded into the report
#[derive(Debug, Default)]
struct BindingStats {
    granted: usize,
    revoked: usize,
    stale: usize,
}

/// Reconciles persisted bindings with live platform state
pub struct BootReconciler {
    store: Arc<dyn BindingStore>,
    policy: Arc<RolePolicy>,
    reconciler: Arc<Reconciler>,
    cascade: Arc<CascadeHandler>,
    readiness: Arc<ReadinessGate>,
}

impl BootReconciler {
    pub fn new(
        store: Arc<dyn BindingStore>,
        policy: Arc<RolePolicy>,
        reconciler: Arc<Reconciler>,
        cascade: Arc<CascadeHandler>,
        readiness: Arc<ReadinessGate>,
    ) -> Self {
        Self {
            store,
            policy,
            reconciler,
            cascade,
            readiness,
        }
    }

    /// Load bindings and reconcile each enabled one, sequentially.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn run(&self) -> Result<BootReport> {
        let bindings = self.store.load().await?;
        let registry = self.policy.registry();
        registry.load(bindings);

        let mut report = BootReport {
            loaded: registry.len(),
            ..Default::default()
        };
        let enabled: Vec<Binding> = registry.list().into_iter().filter(Binding::is_enabled).collect();
        info!(loaded = report.loaded, enabled = enabled.len(), "Starting boot reconciliation");

        if enabled.is_empty() {
            self.readiness.arm();
            return Ok(report);
        }

        let mut failed: HashSet<GuildId> = HashSet::new();
        for binding in &enabled {
            if failed.contains(&binding.guild) {
                report.skipped += 1;
                continue;
            }

            self.readiness.begin();
            match self.reconcile_binding(binding).await {
                Ok(stats) => {
                    report.reconciled += 1;
                    report.granted += stats.granted;
                    report.revoked += stats.revoked;
                    report.stale_reactions_removed += stats.stale;
                }
                Err(e) if e.is_not_found() => {
                    warn!(binding = %binding.id, error = %e, "Binding target missing, disabling");
                    if self
                        .cascade
                        .disable(&binding.id, DisableReason::MissingOnBoot)
                        .is_some()
                    {
                        report.disabled += 1;
                    }
                }
                Err(e) => {
                    error!(binding = %binding.id, guild = %binding.guild, error = %e, "Boot reconciliation failed for guild");
                    failed.insert(binding.guild);
                    report.failed_guilds.push(binding.guild);
                }
            }
            self.readiness.finish();
        }

        info!(
            reconciled = report.reconciled,
            disabled = report.disabled,
            failed_guilds = report.failed_guilds.len(),
            "Boot reconciliation complete"
        );
        Ok(report)
    }

    #[instrument(skip(self, binding), fields(binding = %binding.id))]
    async fn reconcile_binding(&self, binding: &Binding) -> PlatformResult<BindingStats> {
        let platform = self.policy.platform();

        if !platform.guild_available(binding.guild).await? {
            return Err(PlatformError::NotFound(binding.guild.to_string()));
        }
        if !platform.channel_available(binding.channel).await? {
            return Err(PlatformError::NotFound(binding.channel.to_string()));
        }
        platform.fetch_message(binding.channel, binding.message).await?;

        let reactors = platform
            .fetch_reactors(binding.channel, binding.message, &binding.emoji)
            .await?;

        let bot = platform.bot_user();
        if !reactors.iter().any(|r| r.user == bot) {
            platform
                .add_reaction(binding.channel, binding.message, &binding.emoji)
                .await?;
        }

        let present: HashSet<UserId> = reactors
            .iter()
            .filter(|r| !r.is_bot && r.user != bot)
            .map(|r| r.user)
            .collect();

        let mut stats = BindingStats::default();

        // Revoke first so departed winners free capacity for current reactors
        for winner in binding.winners.iter().filter(|w| !present.contains(*w)) {
            match platform.resolve_member(binding.guild, *winner).await? {
                Some(member) => {
                    if let Outcome::Revoked { roles } =
                        self.reconciler.apply(Action::Revoke, member, &binding.id).await
                    {
                        stats.revoked += roles;
                    }
                }
                None => {
                    self.policy.forget_winner(binding, *winner);
                }
            }
        }

        for reactor in reactors.iter().filter(|r| present.contains(&r.user)) {
            match platform.resolve_member(binding.guild, reactor.user).await? {
                Some(member) if member.is_bot => {}
                Some(member) => {
                    if let Outcome::Granted { roles } =
                        self.reconciler.apply(Action::Grant, member, &binding.id).await
                    {
                        stats.granted += roles;
                    }
                }
                None => {
                    platform
                        .remove_reaction(binding.channel, binding.message, reactor.user, &binding.emoji)
                        .await?;
                    self.policy.forget_winner(binding, reactor.user);
                    stats.stale += 1;
                }
            }
        }

        Ok(stats)
    }
}

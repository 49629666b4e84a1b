//! Binding store commands
//!
//! These operate on the store file directly and never contact the chat
//! platform. Stop the engine before running `disable`: a running engine
//! rewrites the whole collection on its next change.

use anyhow::{bail, Context};
use clap::Subcommand;
use reactrole_store::BindingStore;
use reactrole_types::{Binding, BindingId};
use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, info};

use crate::output::{self, print_success, print_warning, OutputFormat};

/// Binding subcommands
#[derive(Debug, Subcommand)]
pub enum BindingCommands {
    /// List bindings
    List {
        /// Include disabled bindings
        #[arg(short, long)]
        all: bool,
    },

    /// Show one binding in full
    Show {
        /// Binding id (`<message>-<emoji>`)
        id: String,
    },

    /// Disable a binding
    Disable {
        /// Binding id (`<message>-<emoji>`)
        id: String,

        /// Remove the record instead of flagging it disabled
        #[arg(long)]
        hard: bool,
    },

    /// Validate every stored binding
    Check,
}

/// Table row for binding display
#[derive(Debug, Serialize, Tabled)]
pub struct BindingRow {
    id: String,
    guild: u64,
    channel: u64,
    roles: String,
    kind: String,
    max: String,
    winners: usize,
    status: String,
    created: String,
}

impl From<&Binding> for BindingRow {
    fn from(binding: &Binding) -> Self {
        Self {
            id: binding.id.as_str().to_string(),
            guild: binding.guild.get(),
            channel: binding.channel.get(),
            roles: binding
                .roles
                .iter()
                .map(|r| r.get().to_string())
                .collect::<Vec<_>>()
                .join(","),
            kind: kind_label(binding),
            max: if binding.max == 0 {
                "-".to_string()
            } else {
                binding.max.to_string()
            },
            winners: binding.winners.len(),
            status: if binding.is_enabled() { "active" } else { "disabled" }.to_string(),
            created: binding.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

fn kind_label(binding: &Binding) -> String {
    if binding.kind.is_empty() {
        return "normal".to_string();
    }
    binding
        .kind
        .iter_names()
        .map(|(name, _)| name.to_lowercase())
        .collect::<Vec<_>>()
        .join("|")
}

/// A stored binding that fails validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct Finding {
    pub binding: String,
    pub problem: String,
}

/// What `disable` did to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableOutcome {
    Disabled,
    AlreadyDisabled,
    Removed,
}

/// Stored bindings in creation order, active ones only unless `all`.
pub async fn list(store: &dyn BindingStore, all: bool) -> anyhow::Result<Vec<Binding>> {
    let mut bindings: Vec<Binding> = store
        .load()
        .await
        .context("Failed to load bindings")?
        .into_iter()
        .filter(|b| all || b.is_enabled())
        .collect();
    bindings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(bindings)
}

pub async fn show(store: &dyn BindingStore, id: &str) -> anyhow::Result<Binding> {
    let id = BindingId::from_raw(id);
    match store.get(&id).await.context("Failed to load bindings")? {
        Some(binding) => Ok(binding),
        None => bail!("No binding with id {}", id.as_str()),
    }
}

pub async fn disable(store: &dyn BindingStore, id: &str, hard: bool) -> anyhow::Result<DisableOutcome> {
    let mut binding = show(store, id).await?;

    if hard {
        store
            .remove(&binding.id)
            .await
            .with_context(|| format!("Failed to remove {}", binding.id))?;
        info!(binding = %binding.id, "Removed binding");
        return Ok(DisableOutcome::Removed);
    }

    if !binding.disable() {
        return Ok(DisableOutcome::AlreadyDisabled);
    }

    store
        .upsert(&binding)
        .await
        .with_context(|| format!("Failed to persist {}", binding.id))?;
    info!(binding = %binding.id, "Disabled binding");
    Ok(DisableOutcome::Disabled)
}

/// Validate every stored record, including disabled ones.
pub async fn check(store: &dyn BindingStore) -> anyhow::Result<Vec<Finding>> {
    let bindings = store.load().await.context("Failed to load bindings")?;
    debug!(count = bindings.len(), "Checking bindings");

    let mut findings = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for binding in &bindings {
        if !seen.insert(binding.id.clone()) {
            findings.push(Finding {
                binding: binding.id.as_str().to_string(),
                problem: "duplicate record for this id".to_string(),
            });
        }
        if let Err(e) = binding.validate() {
            findings.push(Finding {
                binding: binding.id.as_str().to_string(),
                problem: e.to_string(),
            });
        }
    }
    Ok(findings)
}

/// Execute a binding command
pub async fn execute(
    command: BindingCommands,
    store: &dyn BindingStore,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        BindingCommands::List { all } => {
            let rows: Vec<BindingRow> = list(store, all).await?.iter().map(BindingRow::from).collect();
            output::print_output(&rows, format)
        }

        BindingCommands::Show { id } => {
            let binding = show(store, &id).await?;
            output::print_single(&binding)
        }

        BindingCommands::Disable { id, hard } => {
            match disable(store, &id, hard).await? {
                DisableOutcome::Disabled => print_success(&format!("Disabled {}", id)),
                DisableOutcome::Removed => print_success(&format!("Removed {}", id)),
                DisableOutcome::AlreadyDisabled => print_warning(&format!("{} is already disabled", id)),
            }
            Ok(())
        }

        BindingCommands::Check => {
            let findings = check(store).await?;
            if findings.is_empty() {
                print_success("All bindings are valid");
                return Ok(());
            }
            output::print_output(&findings, format)?;
            bail!("{} problem(s) found", findings.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactrole_store::JsonFileStore;
    use reactrole_types::{BindingKind, ChannelId, EmojiId, GuildId, MessageId, RoleId, UserId};

    fn binding(message: u64) -> Binding {
        Binding::new(
            GuildId::new(100),
            ChannelId::new(200),
            MessageId::new(message),
            EmojiId::new("✅"),
            vec![RoleId::new(1001), RoleId::new(1002)],
        )
    }

    async fn store_with(dir: &tempfile::TempDir, bindings: &[Binding]) -> JsonFileStore {
        let store = JsonFileStore::open(dir.path().join("bindings.json")).await.unwrap();
        for b in bindings {
            store.upsert(b).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_list_hides_disabled_unless_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut retired = binding(301);
        retired.disable();
        let store = store_with(&dir, &[binding(300), retired]).await;

        let active = list(&store, false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id.as_str(), "300-✅");

        assert_eq!(list(&store, true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_show_missing_binding_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[binding(300)]).await;

        assert_eq!(show(&store, "300-✅").await.unwrap().message, MessageId::new(300));
        let err = show(&store, "999-✅").await.unwrap_err();
        assert!(err.to_string().contains("999-✅"));
    }

    #[tokio::test]
    async fn test_disable_soft_then_again() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[binding(300)]).await;

        assert_eq!(disable(&store, "300-✅", false).await.unwrap(), DisableOutcome::Disabled);
        assert_eq!(
            disable(&store, "300-✅", false).await.unwrap(),
            DisableOutcome::AlreadyDisabled
        );

        let reopened = JsonFileStore::open(dir.path().join("bindings.json")).await.unwrap();
        let stored = reopened.load().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].is_enabled());
    }

    #[tokio::test]
    async fn test_disable_hard_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[binding(300), binding(301)]).await;

        assert_eq!(disable(&store, "300-✅", true).await.unwrap(), DisableOutcome::Removed);

        let reopened = JsonFileStore::open(dir.path().join("bindings.json")).await.unwrap();
        let ids: Vec<String> = reopened
            .load()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["301-✅".to_string()]);
    }

    #[tokio::test]
    async fn test_check_reports_invalid_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut over = binding(301).with_max(1);
        over.winners = vec![UserId::new(5001), UserId::new(5002)];
        let mut empty = binding(302);
        empty.roles.clear();
        let store = store_with(&dir, &[binding(300), over, empty]).await;

        let findings = check(&store).await.unwrap();
        let flagged: Vec<&str> = findings.iter().map(|f| f.binding.as_str()).collect();
        assert_eq!(flagged, vec!["301-✅", "302-✅"]);
    }

    #[tokio::test]
    async fn test_check_clean_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[binding(300)]).await;
        assert!(check(&store).await.unwrap().is_empty());
    }

    #[test]
    fn test_row_labels() {
        let plain = BindingRow::from(&binding(300));
        assert_eq!(plain.kind, "normal");
        assert_eq!(plain.max, "-");
        assert_eq!(plain.roles, "1001,1002");
        assert_eq!(plain.status, "active");

        let toggle = BindingRow::from(&binding(301).with_kind(BindingKind::TOGGLE | BindingKind::JUST_WIN).with_max(3));
        assert_eq!(toggle.kind, "toggle|just_win");
        assert_eq!(toggle.max, "3");
    }
}

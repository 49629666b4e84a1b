//! Pre-mutation hooks
//!
//! Host applications can veto individual role changes. A vetoed role is
//! skipped silently; the remaining roles of the binding still apply.

use async_trait::async_trait;
use reactrole_types::{Binding, RoleId};

use crate::platform::Member;

/// Hook consulted before each role mutation
#[async_trait]
pub trait RoleHooks: Send + Sync {
    /// Hook name for logging
    fn name(&self) -> &str;

    /// Return false to skip granting `role`
    async fn pre_grant(&self, _binding: &Binding, _member: &Member, _role: RoleId) -> bool {
        true
    }

    /// Return false to skip revoking `role`
    async fn pre_revoke(&self, _binding: &Binding, _member: &Member, _role: RoleId) -> bool {
        true
    }
}

/// Default hooks that permit every mutation
#[derive(Debug, Default)]
pub struct AllowAllHooks;

#[async_trait]
impl RoleHooks for AllowAllHooks {
    fn name(&self) -> &str {
        "allow-all"
    }
}

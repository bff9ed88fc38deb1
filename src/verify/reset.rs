//! Membership reset — role assignment is idempotent per run because every
//! run starts from a clean slate.

use crate::platform::gateway::Gateway;

/// Remove every role the user holds except the platform's universal default.
///
/// Each removal stands alone: a refusal on one role is logged and the rest
/// are still attempted. Returns how many roles were removed.
pub async fn clear_memberships(gateway: &dyn Gateway, user: &str, keep: &str) -> usize {
    let roles = match gateway.member_roles(user).await {
        Ok(roles) => roles,
        Err(e) => {
            tracing::warn!(user = %user, error = %e, "Could not list roles; skipping reset");
            return 0;
        }
    };

    let mut removed = 0;
    for role in roles.iter().filter(|r| r.name != keep) {
        match gateway.remove_role(user, role).await {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(user = %user, role = %role.name, error = %e, "Role not removed");
            }
        }
    }
    tracing::debug!(user = %user, removed, "Cleared prior memberships");
    removed
}

//! # Access Control
//!
//! Role table for the token surface. Every privileged entry point names the
//! role it needs and calls [`AccessControl::require`] before touching any
//! state. Only [`Role::Admin`] holders can grant or revoke roles.
//!
//! ## Roles
//!
//! | Role           | Gates                                   |
//! |----------------|-----------------------------------------|
//! | `Admin`        | granting and revoking roles             |
//! | `Minter`       | `RebasingToken::mint`                   |
//! | `Rebaser`      | `RebasingToken::rebase`                 |
//! | `Pauser`       | `pause` / `unpause` on both tokens      |
//! | `VaultManager` | deposit cap and minimum deposit setters |

use serde::{Deserialize, Serialize};
use shareledger_core::Address;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by role checks and the pause switch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The account lacks the role the operation requires.
    #[error("unauthorized: {account} does not hold role {role}")]
    Unauthorized {
        /// The account that attempted the call.
        account: Address,
        /// The role the call requires.
        role: Role,
    },

    /// The token is paused and the call mutates state.
    #[error("token is paused")]
    Paused,
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A privilege that can be granted to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages the role table itself.
    Admin,
    /// May mint rebasing-token supply.
    Minter,
    /// May report a new pooled total to the rebasing token.
    Rebaser,
    /// May pause and unpause the token.
    Pauser,
    /// May change vault bounds.
    VaultManager,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Minter => write!(f, "minter"),
            Role::Rebaser => write!(f, "rebaser"),
            Role::Pauser => write!(f, "pauser"),
            Role::VaultManager => write!(f, "vault_manager"),
        }
    }
}

// ---------------------------------------------------------------------------
// Role table
// ---------------------------------------------------------------------------

/// Which accounts hold which roles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControl {
    members: HashMap<Role, HashSet<Address>>,
}

impl AccessControl {
    /// Creates a table where `admin` holds [`Role::Admin`] and nothing else
    /// is granted.
    pub fn new(admin: &Address) -> Self {
        let mut members = HashMap::new();
        members.insert(Role::Admin, HashSet::from([*admin]));
        Self { members }
    }

    /// Returns `true` if `account` holds `role`.
    pub fn has_role(&self, account: &Address, role: Role) -> bool {
        self.members
            .get(&role)
            .is_some_and(|set| set.contains(account))
    }

    /// Fails with [`AccessError::Unauthorized`] unless `account` holds `role`.
    pub fn require(&self, account: &Address, role: Role) -> Result<(), AccessError> {
        if self.has_role(account, role) {
            Ok(())
        } else {
            Err(AccessError::Unauthorized {
                account: *account,
                role,
            })
        }
    }

    /// Grants `role` to `account`. Returns `false` if it was already held.
    ///
    /// # Errors
    ///
    /// [`AccessError::Unauthorized`] if `caller` is not an admin.
    pub fn grant(
        &mut self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> Result<bool, AccessError> {
        self.require(caller, Role::Admin)?;
        let added = self.members.entry(role).or_default().insert(*account);
        if added {
            tracing::info!(%role, %account, granted_by = %caller, "role granted");
        }
        Ok(added)
    }

    /// Revokes `role` from `account`. Returns `false` if it was not held.
    ///
    /// An admin may revoke its own admin role; a token left with no admin
    /// has a frozen role table.
    ///
    /// # Errors
    ///
    /// [`AccessError::Unauthorized`] if `caller` is not an admin.
    pub fn revoke(
        &mut self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> Result<bool, AccessError> {
        self.require(caller, Role::Admin)?;
        let removed = self
            .members
            .get_mut(&role)
            .is_some_and(|set| set.remove(account));
        if removed {
            tracing::info!(%role, %account, revoked_by = %caller, "role revoked");
        }
        Ok(removed)
    }

    /// Number of accounts holding `role`.
    pub fn member_count(&self, role: Role) -> usize {
        self.members.get(&role).map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn creator_is_sole_admin() {
        let acl = AccessControl::new(&addr("root"));
        assert!(acl.has_role(&addr("root"), Role::Admin));
        assert!(!acl.has_role(&addr("root"), Role::Minter));
        assert_eq!(acl.member_count(Role::Admin), 1);
    }

    #[test]
    fn admin_grants_and_revokes() {
        let mut acl = AccessControl::new(&addr("root"));
        assert!(acl.grant(&addr("root"), Role::Minter, &addr("m")).unwrap());
        assert!(!acl.grant(&addr("root"), Role::Minter, &addr("m")).unwrap());
        assert!(acl.has_role(&addr("m"), Role::Minter));

        assert!(acl.revoke(&addr("root"), Role::Minter, &addr("m")).unwrap());
        assert!(!acl.revoke(&addr("root"), Role::Minter, &addr("m")).unwrap());
        assert!(!acl.has_role(&addr("m"), Role::Minter));
    }

    #[test]
    fn non_admin_cannot_grant() {
        let mut acl = AccessControl::new(&addr("root"));
        let err = acl
            .grant(&addr("mallory"), Role::Minter, &addr("mallory"))
            .unwrap_err();
        assert_eq!(
            err,
            AccessError::Unauthorized {
                account: addr("mallory"),
                role: Role::Admin,
            }
        );
    }

    #[test]
    fn require_reports_missing_role() {
        let acl = AccessControl::new(&addr("root"));
        assert!(acl.require(&addr("root"), Role::Admin).is_ok());
        assert!(matches!(
            acl.require(&addr("root"), Role::Rebaser),
            Err(AccessError::Unauthorized { role: Role::Rebaser, .. })
        ));
    }

    #[test]
    fn role_display_is_snake_case() {
        assert_eq!(Role::VaultManager.to_string(), "vault_manager");
        assert_eq!(
            serde_json::to_string(&Role::VaultManager).unwrap(),
            "\"vault_manager\""
        );
    }
}

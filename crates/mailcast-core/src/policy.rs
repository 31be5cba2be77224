//! Ownership and visibility policy
//!
//! Every listing, detail, update and delete goes through [`authorize`] or
//! [`list_scope`], so the rules below are the only place visibility is decided:
//!
//! - listing: superusers and members of `managers` see every row, members of
//!   `users` see their own rows, anyone else is denied;
//! - detail/update/delete: superusers and managers may touch any row,
//!   everyone else only rows they own.

use mailcast_common::types::{UserId, GROUP_MANAGERS, GROUP_USERS};
use mailcast_common::{Error, Result};
use mailcast_storage::models::{Owned, UserRoles};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The authenticated user an operation runs on behalf of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub is_superuser: bool,
    pub groups: Vec<String>,
    pub permissions: Vec<String>,
}

impl Actor {
    /// Actor with no groups and no permissions
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            is_superuser: false,
            groups: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn from_roles(user_id: UserId, is_superuser: bool, roles: UserRoles) -> Self {
        Self {
            user_id,
            is_superuser,
            groups: roles.groups,
            permissions: roles.permissions,
        }
    }

    pub fn superuser(user_id: UserId) -> Self {
        Self {
            is_superuser: true,
            ..Self::new(user_id)
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.groups.push(group.to_string());
        self
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions.push(permission.to_string());
        self
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Superusers hold every permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_superuser || self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_manager(&self) -> bool {
        self.in_group(GROUP_MANAGERS)
    }

    /// Superusers and managers see every owner's data
    pub fn sees_all(&self) -> bool {
        self.is_superuser || self.is_manager()
    }

    pub fn owns(&self, owner: Option<UserId>) -> bool {
        owner == Some(self.user_id)
    }
}

/// Operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Detail,
    Update,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::List => write!(f, "list"),
            Action::Detail => write!(f, "detail"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// Shape of a listing query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListScope {
    All,
    Owner(UserId),
}

impl ListScope {
    /// Owner filter for repository list calls
    pub fn owner(self) -> Option<UserId> {
        match self {
            ListScope::All => None,
            ListScope::Owner(id) => Some(id),
        }
    }
}

/// Decide whether `actor` may perform `action` on a row owned by `owner`
pub fn can_access(actor: &Actor, owner: Option<UserId>, action: Action) -> bool {
    if actor.sees_all() {
        return true;
    }
    match action {
        Action::List => actor.in_group(GROUP_USERS) && actor.owns(owner),
        Action::Detail | Action::Update | Action::Delete => actor.owns(owner),
    }
}

/// Like [`can_access`] but fails with `PermissionDenied`
pub fn authorize(actor: &Actor, owner: Option<UserId>, action: Action) -> Result<()> {
    if can_access(actor, owner, action) {
        Ok(())
    } else {
        warn!(user_id = %actor.user_id, %action, "Access denied");
        Err(Error::PermissionDenied(format!(
            "You are not allowed to {} this record",
            action
        )))
    }
}

/// Authorize an action on an owned entity
pub fn authorize_entity<T: Owned>(actor: &Actor, entity: &T, action: Action) -> Result<()> {
    authorize(actor, entity.owner_id(), action)
}

/// Resolve which rows a listing may return for `actor`
pub fn list_scope(actor: &Actor) -> Result<ListScope> {
    if actor.sees_all() {
        Ok(ListScope::All)
    } else if actor.in_group(GROUP_USERS) {
        Ok(ListScope::Owner(actor.user_id))
    } else {
        warn!(user_id = %actor.user_id, "Listing denied: no group grants visibility");
        Err(Error::PermissionDenied(
            "Your account is not allowed to view listings".to_string(),
        ))
    }
}

//! # Authorization
//!
//! Maps roles to permissions and evaluates permission checks against the
//! current session. Checks are advisory: the API enforces authorization
//! server-side, this module only decides what the client should offer.

use crate::manager::SessionManager;
use crate::types::{Permission, Role};
use std::sync::Arc;

impl Role {
    /// The permission set granted by this role.
    ///
    /// Unknown roles grant nothing; a client that doesn't understand a role
    /// must not guess at its capabilities.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin => &[
                Permission::Create,
                Permission::Read,
                Permission::Update,
                Permission::Delete,
                Permission::ManageUsers,
            ],
            Role::Editor => &[Permission::Create, Permission::Read, Permission::Update],
            Role::Viewer => &[Permission::Read],
            Role::Customer => &[Permission::Read],
            Role::Unknown => &[],
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// Permission checks against the live session.
///
/// Empty permission sets are vacuously true for any signed-in user, matching
/// the role checks on [`SessionManager`]. A signed-out session fails every
/// check, including the vacuous ones.
pub struct AuthorizationEvaluator {
    session: Arc<SessionManager>,
}

impl AuthorizationEvaluator {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub async fn has_permission(&self, permission: Permission) -> bool {
        match self.session.current_user().await {
            Some(user) => user.role.has_permission(permission),
            None => false,
        }
    }

    pub async fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        match self.session.current_user().await {
            Some(user) => {
                permissions.is_empty()
                    || permissions.iter().any(|p| user.role.has_permission(*p))
            }
            None => false,
        }
    }

    pub async fn has_all_permissions(&self, permissions: &[Permission]) -> bool {
        match self.session.current_user().await {
            Some(user) => permissions.iter().all(|p| user.role.has_permission(*p)),
            None => false,
        }
    }
}

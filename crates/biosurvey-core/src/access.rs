//! Capability checks.
//!
//! Handlers receive an authenticated [`Principal`] and call these checks
//! before touching any data. Nothing here reads ambient request state.

use serde::{Deserialize, Serialize};

use biosurvey_types::{Project, ProjectId, Role, User, UserId};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Who is calling.
    pub user_id: UserId,
    /// Their role.
    pub role: Role,
    /// Whether the account is enabled.
    pub is_active: bool,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            is_active: user.is_active,
        }
    }
}

impl Principal {
    /// Whether this principal has the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Why a capability check refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// No principal could be resolved for the request.
    #[error("authentication required")]
    Unauthenticated,

    /// The account exists but is disabled.
    #[error("user {0} is inactive")]
    Inactive(UserId),

    /// The principal is neither admin, creator, nor member of the project.
    #[error("user {user} has no access to project {project}")]
    NotAMember {
        /// The refused user.
        user: UserId,
        /// The project they tried to reach.
        project: ProjectId,
    },

    /// The principal's role does not permit the operation.
    #[error("role {role} may not {action}")]
    RoleNotPermitted {
        /// The principal's role.
        role: Role,
        /// Short description of the refused action.
        action: &'static str,
    },
}

/// Require an enabled account.
///
/// # Errors
///
/// Returns [`AccessError::Inactive`] for disabled accounts.
pub const fn require_active(principal: &Principal) -> Result<(), AccessError> {
    if principal.is_active {
        Ok(())
    } else {
        Err(AccessError::Inactive(principal.user_id))
    }
}

/// Require read/contribute access to `project`: admins always pass, other
/// roles must have created or joined it.
///
/// # Errors
///
/// Returns [`AccessError::Inactive`] or [`AccessError::NotAMember`].
pub fn require_project_access(principal: &Principal, project: &Project) -> Result<(), AccessError> {
    require_active(principal)?;
    if principal.is_admin() || project.has_member(principal.user_id) {
        return Ok(());
    }
    Err(AccessError::NotAMember {
        user: principal.user_id,
        project: project.id,
    })
}

/// Require one of `allowed` roles.
///
/// # Errors
///
/// Returns [`AccessError::Inactive`] or [`AccessError::RoleNotPermitted`].
pub fn require_role(principal: &Principal, allowed: &[Role], action: &'static str) -> Result<(), AccessError> {
    require_active(principal)?;
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(AccessError::RoleNotPermitted {
            role: principal.role,
            action,
        })
    }
}

/// Require permission to create or snapshot stored indicators in `project`.
///
/// # Errors
///
/// See [`require_project_access`] and [`require_role`].
pub fn require_indicator_management(principal: &Principal, project: &Project) -> Result<(), AccessError> {
    require_project_access(principal, project)?;
    require_role(principal, &[Role::Admin, Role::Researcher], "manage indicators")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use biosurvey_types::ProjectStatus;

    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: UserId::new(),
            role,
            is_active: true,
        }
    }

    fn project(created_by: UserId, members: &[UserId]) -> Project {
        Project {
            id: ProjectId::new(),
            name: "Coastal birds".to_owned(),
            description: None,
            location: None,
            start_date: None,
            end_date: None,
            status: ProjectStatus::Active,
            created_by,
            members: members.iter().copied().collect::<BTreeSet<_>>(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn admin_reaches_any_project() {
        let admin = principal(Role::Admin);
        assert!(require_project_access(&admin, &project(UserId::new(), &[])).is_ok());
    }

    #[test]
    fn member_and_creator_have_access() {
        let observer = principal(Role::Observer);
        assert!(require_project_access(&observer, &project(observer.user_id, &[])).is_ok());
        assert!(require_project_access(&observer, &project(UserId::new(), &[observer.user_id])).is_ok());
    }

    #[test]
    fn outsider_is_refused() {
        let researcher = principal(Role::Researcher);
        let result = require_project_access(&researcher, &project(UserId::new(), &[]));
        assert!(matches!(result, Err(AccessError::NotAMember { .. })));
    }

    #[test]
    fn inactive_user_is_refused_even_as_admin() {
        let mut admin = principal(Role::Admin);
        admin.is_active = false;
        let result = require_project_access(&admin, &project(admin.user_id, &[]));
        assert_eq!(result, Err(AccessError::Inactive(admin.user_id)));
    }

    #[test]
    fn observers_cannot_manage_indicators() {
        let observer = principal(Role::Observer);
        let p = project(observer.user_id, &[]);
        assert!(matches!(
            require_indicator_management(&observer, &p),
            Err(AccessError::RoleNotPermitted { role: Role::Observer, .. })
        ));

        let researcher = principal(Role::Researcher);
        let p = project(UserId::new(), &[researcher.user_id]);
        assert!(require_indicator_management(&researcher, &p).is_ok());
    }
}

//! RBAC Role Model
//!
//! Roles form a strict nesting: Admin > Op > User > Viewer > Public.
//! Every check goes through the reachability table so that "which roles
//! does X satisfy" has exactly one source of truth.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Administrative role, most privileged first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Op,
    User,
    Viewer,
    Public,
}

/// All roles, most privileged first
pub const ALL_ROLES: [Role; 5] = [
    Role::Admin,
    Role::Op,
    Role::User,
    Role::Viewer,
    Role::Public,
];

impl Role {
    /// Reachability row: every role this role satisfies, itself included
    pub const fn satisfied_roles(self) -> &'static [Role] {
        match self {
            Role::Admin => &[Role::Admin, Role::Op, Role::User, Role::Viewer, Role::Public],
            Role::Op => &[Role::Op, Role::User, Role::Viewer, Role::Public],
            Role::User => &[Role::User, Role::Viewer, Role::Public],
            Role::Viewer => &[Role::Viewer, Role::Public],
            Role::Public => &[Role::Public],
        }
    }

    /// True iff this role satisfies the required role
    pub fn satisfies(self, required: Role) -> bool {
        self.satisfied_roles().contains(&required)
    }

    /// Parse a wire role string. Unknown strings are `None`, never a
    /// silent fallback role.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "OP" => Some(Role::Op),
            "USER" => Some(Role::User),
            "VIEWER" => Some(Role::Viewer),
            "PUBLIC" => Some(Role::Public),
            _ => None,
        }
    }

    /// Wire name (uppercase, as the backend sends it)
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Op => "OP",
            Role::User => "USER",
            Role::Viewer => "VIEWER",
            Role::Public => "PUBLIC",
        }
    }

    /// Display label shown next to the signed-in user
    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "Admin (Full Access)",
            Role::Op => "Operator (DAG Manager)",
            Role::User => "User (DAG Runner)",
            Role::Viewer => "Viewer (Read Only)",
            Role::Public => "Public (Limited)",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission check over an optional role. An absent or unrecognized role
/// satisfies nothing, not even `Public`.
pub fn has_permission(role: Option<Role>, required: Role) -> bool {
    role.is_some_and(|r| r.satisfies(required))
}

/// May pause, unpause or delete DAGs
pub fn can_modify_dags(role: Option<Role>) -> bool {
    has_permission(role, Role::Op)
}

/// May trigger DAG runs
pub fn can_run_dags(role: Option<Role>) -> bool {
    has_permission(role, Role::User)
}

/// May browse DAGs and runs
pub fn can_view_dags(role: Option<Role>) -> bool {
    has_permission(role, Role::Viewer)
}

/// May clear runs and change task instance state
pub fn can_control_tasks(role: Option<Role>) -> bool {
    has_permission(role, Role::User)
}

/// May read task logs. Restricted to Admin outright, not via the hierarchy.
pub fn can_view_task_logs(role: Option<Role>) -> bool {
    role == Some(Role::Admin)
}

/// Label for the status line; absent roles render as "Unknown"
pub fn format_role(role: Option<Role>) -> &'static str {
    role.map(Role::label).unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_rows() {
        for required in ALL_ROLES {
            assert!(Role::Admin.satisfies(required));
        }
        assert!(!Role::Op.satisfies(Role::Admin));
        assert!(Role::Op.satisfies(Role::Op));
        assert!(Role::Op.satisfies(Role::User));
        assert!(Role::Op.satisfies(Role::Viewer));
        assert!(Role::Op.satisfies(Role::Public));
        assert!(!Role::User.satisfies(Role::Op));
        assert!(Role::User.satisfies(Role::Viewer));
        assert!(!Role::Viewer.satisfies(Role::User));
        assert!(Role::Viewer.satisfies(Role::Public));
        assert!(!Role::Public.satisfies(Role::Viewer));
        assert!(Role::Public.satisfies(Role::Public));
    }

    #[test]
    fn test_nesting_is_strict() {
        // Each row is a strict superset of the next one down
        for pair in ALL_ROLES.windows(2) {
            let (higher, lower) = (pair[0], pair[1]);
            for required in lower.satisfied_roles() {
                assert!(higher.satisfies(*required));
            }
            assert!(!lower.satisfies(higher));
        }
    }

    #[test]
    fn test_absent_role_satisfies_nothing() {
        for required in ALL_ROLES {
            assert!(!has_permission(None, required));
        }
    }

    #[test]
    fn test_unknown_wire_string_is_none() {
        assert_eq!(Role::parse("SUPERADMIN"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::parse("admin "), Some(Role::Admin)); // Case and whitespace tolerant
        assert_eq!(Role::parse("viewer"), Some(Role::Viewer));
    }

    #[test]
    fn test_derived_predicates() {
        assert!(!can_modify_dags(Some(Role::Viewer)));
        assert!(can_modify_dags(Some(Role::Admin)));
        assert!(can_modify_dags(Some(Role::Op)));
        assert!(!can_run_dags(Some(Role::Viewer)));
        assert!(can_run_dags(Some(Role::User)));
        assert!(can_view_dags(Some(Role::Viewer)));
        assert!(!can_view_dags(Some(Role::Public)));
        assert!(can_control_tasks(Some(Role::Op)));
        assert!(!can_view_task_logs(Some(Role::Op))); // Admin only, no inheritance
        assert!(can_view_task_logs(Some(Role::Admin)));
        assert!(!can_view_task_logs(None));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Role::Admin.label(), "Admin (Full Access)");
        assert_eq!(Role::Op.label(), "Operator (DAG Manager)");
        assert_eq!(Role::User.label(), "User (DAG Runner)");
        assert_eq!(Role::Viewer.label(), "Viewer (Read Only)");
        assert_eq!(Role::Public.label(), "Public (Limited)");
        assert_eq!(format_role(None), "Unknown");
    }

    #[test]
    fn test_wire_serde() {
        let json = serde_json::to_string(&Role::Op).unwrap();
        assert_eq!(json, "\"OP\"");
        let role: Role = serde_json::from_str("\"VIEWER\"").unwrap();
        assert_eq!(role, Role::Viewer);
    }
}

//! Role and permission registry.
//!
//! Roles and permissions are closed enums. The mapping from role to granted
//! permissions is a pure, total function; `Role::Unrecognized` is the
//! fail-closed arm and holds no permissions. `Role::SuperAdmin` is granted
//! every permission without consulting the table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    SuperAdmin,
    Admin,
    TeamLead,
    TeamMember,
    Staff,
    Client,
    /// Any role string this build does not know. Grants nothing.
    Unrecognized,
}

impl Role {
    pub const KNOWN: [Role; 6] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::TeamLead,
        Role::TeamMember,
        Role::Staff,
        Role::Client,
    ];

    /// Case-insensitive parse. Unknown strings map to `Unrecognized`.
    pub fn parse(value: &str) -> Role {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUPER_ADMIN" => Role::SuperAdmin,
            "ADMIN" => Role::Admin,
            "TEAM_LEAD" => Role::TeamLead,
            "TEAM_MEMBER" => Role::TeamMember,
            "STAFF" => Role::Staff,
            "CLIENT" => Role::Client,
            _ => Role::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::TeamLead => "TEAM_LEAD",
            Role::TeamMember => "TEAM_MEMBER",
            Role::Staff => "STAFF",
            Role::Client => "CLIENT",
            Role::Unrecognized => "UNRECOGNIZED",
        }
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }

    /// Roles allowed to administer a tenant they are a member of.
    pub fn is_tenant_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Role::parse(s))
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ServiceRequestsCreate,
    ServiceRequestsReadOwn,
    ServiceRequestsReadAll,
    ServiceRequestsUpdate,
    ServiceRequestsAssign,
    TasksCreate,
    TasksReadAll,
    TasksReadAssigned,
    TasksUpdate,
    TasksDelete,
    TasksAssign,
    TeamView,
    TeamManage,
    UsersView,
    UsersManage,
    UsersExport,
    AnalyticsView,
    AnalyticsExport,
    LanguagesView,
    LanguagesManage,
    OrgSettingsView,
    OrgSettingsEdit,
    SecuritySettingsView,
    SecuritySettingsEdit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PermissionMetadata {
    pub key: &'static str,
    pub label: &'static str,
    pub category: &'static str,
    pub risk: RiskLevel,
}

impl Permission {
    pub const ALL: [Permission; 24] = [
        Permission::ServiceRequestsCreate,
        Permission::ServiceRequestsReadOwn,
        Permission::ServiceRequestsReadAll,
        Permission::ServiceRequestsUpdate,
        Permission::ServiceRequestsAssign,
        Permission::TasksCreate,
        Permission::TasksReadAll,
        Permission::TasksReadAssigned,
        Permission::TasksUpdate,
        Permission::TasksDelete,
        Permission::TasksAssign,
        Permission::TeamView,
        Permission::TeamManage,
        Permission::UsersView,
        Permission::UsersManage,
        Permission::UsersExport,
        Permission::AnalyticsView,
        Permission::AnalyticsExport,
        Permission::LanguagesView,
        Permission::LanguagesManage,
        Permission::OrgSettingsView,
        Permission::OrgSettingsEdit,
        Permission::SecuritySettingsView,
        Permission::SecuritySettingsEdit,
    ];

    pub fn as_str(&self) -> &'static str {
        self.metadata().key
    }

    pub fn parse(value: &str) -> Option<Permission> {
        Permission::ALL.into_iter().find(|p| p.as_str() == value)
    }

    pub fn metadata(&self) -> PermissionMetadata {
        use RiskLevel::*;
        let (key, label, category, risk) = match self {
            Permission::ServiceRequestsCreate => ("service_requests.create", "Create service requests", "Service Requests", Low),
            Permission::ServiceRequestsReadOwn => ("service_requests.read.own", "View own service requests", "Service Requests", Low),
            Permission::ServiceRequestsReadAll => ("service_requests.read.all", "View all service requests", "Service Requests", Medium),
            Permission::ServiceRequestsUpdate => ("service_requests.update", "Update service requests", "Service Requests", Medium),
            Permission::ServiceRequestsAssign => ("service_requests.assign", "Assign service requests", "Service Requests", Medium),
            Permission::TasksCreate => ("tasks.create", "Create tasks", "Tasks", Low),
            Permission::TasksReadAll => ("tasks.read.all", "View all tasks", "Tasks", Medium),
            Permission::TasksReadAssigned => ("tasks.read.assigned", "View assigned tasks", "Tasks", Low),
            Permission::TasksUpdate => ("tasks.update", "Update tasks", "Tasks", Medium),
            Permission::TasksDelete => ("tasks.delete", "Delete tasks", "Tasks", High),
            Permission::TasksAssign => ("tasks.assign", "Assign tasks", "Tasks", Medium),
            Permission::TeamView => ("team.view", "View team", "Team", Low),
            Permission::TeamManage => ("team.manage", "Manage team", "Team", High),
            Permission::UsersView => ("users.view", "View users", "Users", Medium),
            Permission::UsersManage => ("users.manage", "Manage users", "Users", Critical),
            Permission::UsersExport => ("users.export", "Export users", "Users", High),
            Permission::AnalyticsView => ("analytics.view", "View analytics", "Analytics", Low),
            Permission::AnalyticsExport => ("analytics.export", "Export analytics", "Analytics", Medium),
            Permission::LanguagesView => ("languages.view", "View languages", "Localization", Low),
            Permission::LanguagesManage => ("languages.manage", "Manage languages", "Localization", Medium),
            Permission::OrgSettingsView => ("org.settings.view", "View organization settings", "Settings", Low),
            Permission::OrgSettingsEdit => ("org.settings.edit", "Edit organization settings", "Settings", High),
            Permission::SecuritySettingsView => ("security.settings.view", "View security settings", "Settings", Medium),
            Permission::SecuritySettingsEdit => ("security.settings.edit", "Edit security settings", "Settings", Critical),
        };
        PermissionMetadata { key, label, category, risk }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Permission {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

const CLIENT_PERMISSIONS: &[Permission] = &[
    Permission::ServiceRequestsCreate,
    Permission::ServiceRequestsReadOwn,
    Permission::TasksReadAssigned,
];

const TEAM_MEMBER_PERMISSIONS: &[Permission] = &[
    Permission::ServiceRequestsReadAll,
    Permission::ServiceRequestsUpdate,
    Permission::TasksCreate,
    Permission::TasksReadAssigned,
    Permission::TasksUpdate,
    Permission::TeamView,
    Permission::AnalyticsView,
    Permission::LanguagesView,
    Permission::OrgSettingsView,
];

const TEAM_LEAD_PERMISSIONS: &[Permission] = &[
    Permission::ServiceRequestsReadAll,
    Permission::ServiceRequestsUpdate,
    Permission::ServiceRequestsAssign,
    Permission::TasksCreate,
    Permission::TasksReadAll,
    Permission::TasksReadAssigned,
    Permission::TasksUpdate,
    Permission::TasksDelete,
    Permission::TasksAssign,
    Permission::TeamView,
    Permission::TeamManage,
    Permission::UsersView,
    Permission::AnalyticsView,
    Permission::AnalyticsExport,
    Permission::LanguagesView,
    Permission::OrgSettingsView,
    Permission::OrgSettingsEdit,
];

/// Permissions granted to a role by the static table.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::SuperAdmin | Role::Admin => &Permission::ALL,
        Role::TeamLead => TEAM_LEAD_PERMISSIONS,
        Role::TeamMember | Role::Staff => TEAM_MEMBER_PERMISSIONS,
        Role::Client => CLIENT_PERMISSIONS,
        // Fail closed.
        Role::Unrecognized => &[],
    }
}

pub fn has_permission(role: Option<Role>, permission: Permission) -> bool {
    match role {
        None => false,
        Some(Role::SuperAdmin) => true,
        Some(role) => role_permissions(role).contains(&permission),
    }
}

/// True only when every listed permission is granted.
pub fn check_permissions(role: Option<Role>, required: &[Permission]) -> bool {
    required.iter().all(|p| has_permission(role, *p))
}

/// Role allow-list check. Super admins always pass.
pub fn has_role(role: Option<Role>, allowed: &[Role]) -> bool {
    match role {
        None => false,
        Some(Role::SuperAdmin) => true,
        Some(role) => allowed.contains(&role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_roles_hold_no_permissions() {
        for raw in ["", "ROOT", "admin ", "SUPERADMIN", "team-lead", "owner"] {
            let role = Role::parse(raw);
            if role != Role::Unrecognized {
                continue;
            }
            for p in Permission::ALL {
                assert!(!has_permission(Some(role), p), "{raw} should not grant {p}");
            }
        }
        assert!(role_permissions(Role::Unrecognized).is_empty());
    }

    #[test]
    fn missing_role_is_denied() {
        for p in Permission::ALL {
            assert!(!has_permission(None, p));
        }
        assert!(!has_role(None, &[Role::Client]));
    }

    #[test]
    fn super_admin_is_granted_everything() {
        for p in Permission::ALL {
            assert!(has_permission(Some(Role::SuperAdmin), p));
        }
        assert!(has_role(Some(Role::SuperAdmin), &[]));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("super_admin"), Role::SuperAdmin);
        assert_eq!(Role::parse("Team_Lead"), Role::TeamLead);
        assert_eq!(Role::parse("janitor"), Role::Unrecognized);
    }

    #[test]
    fn client_cannot_delete_tasks() {
        assert!(has_permission(Some(Role::Client), Permission::TasksReadAssigned));
        assert!(!has_permission(Some(Role::Client), Permission::TasksDelete));
        assert!(!has_permission(Some(Role::Client), Permission::TasksReadAll));
    }

    #[test]
    fn staff_matches_team_member() {
        assert_eq!(role_permissions(Role::Staff), role_permissions(Role::TeamMember));
    }

    #[test]
    fn check_permissions_requires_all() {
        let lead = Some(Role::TeamLead);
        assert!(check_permissions(lead, &[Permission::TasksDelete, Permission::TasksAssign]));
        assert!(!check_permissions(lead, &[Permission::TasksDelete, Permission::UsersManage]));
        assert!(check_permissions(Some(Role::Client), &[]));
    }

    #[test]
    fn permission_keys_round_trip_and_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for p in Permission::ALL {
            assert!(seen.insert(p.as_str()), "duplicate key {}", p.as_str());
            assert_eq!(Permission::parse(p.as_str()), Some(p));
        }
        assert_eq!(Permission::parse("tasks.explode"), None);
    }

    #[test]
    fn role_deserializes_unknown_values_to_fallback() {
        let role: Role = serde_json::from_str("\"OWNER\"").unwrap();
        assert_eq!(role, Role::Unrecognized);
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}

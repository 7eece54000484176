//! Role-based access control table.
//!
//! A static mapping from [`Role`] to the [`Permission`]s it holds, plus the page-route
//! table the guard middleware consults. The same predicates back the API handlers,
//! the page loaders and the session endpoint read by client hooks, so all three agree
//! on who may see what.
//!
//! Invariant: each role's permission set is a superset of the role below it
//! (USER ⊂ STAFF ⊂ ADMIN).

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Permission {
    BookInspection,
    ManageOwnCars,
    ViewOwnBookings,
    ViewOwnPayments,
    AccessAdmin,
    ViewAllBookings,
    ManageBookings,
    ManageTimeSlots,
    ViewAllPayments,
    ManagePayments,
    ManageCenters,
    ManageUsers,
}

const USER_PERMISSIONS: &[Permission] = &[
    Permission::BookInspection,
    Permission::ManageOwnCars,
    Permission::ViewOwnBookings,
    Permission::ViewOwnPayments,
];

const STAFF_PERMISSIONS: &[Permission] = &[
    Permission::BookInspection,
    Permission::ManageOwnCars,
    Permission::ViewOwnBookings,
    Permission::ViewOwnPayments,
    Permission::AccessAdmin,
    Permission::ViewAllBookings,
    Permission::ManageBookings,
    Permission::ManageTimeSlots,
    Permission::ViewAllPayments,
];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::BookInspection,
    Permission::ManageOwnCars,
    Permission::ViewOwnBookings,
    Permission::ViewOwnPayments,
    Permission::AccessAdmin,
    Permission::ViewAllBookings,
    Permission::ManageBookings,
    Permission::ManageTimeSlots,
    Permission::ViewAllPayments,
    Permission::ManagePayments,
    Permission::ManageCenters,
    Permission::ManageUsers,
];

pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::User => USER_PERMISSIONS,
        Role::Staff => STAFF_PERMISSIONS,
        Role::Admin => ADMIN_PERMISSIONS,
    }
}

pub fn has_permission(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

/// True for any role allowed into the back-office.
pub fn can_access_admin(role: Role) -> bool {
    has_permission(role, Permission::AccessAdmin)
}

/// RouteRule
///
/// What a page route demands from the session before it may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRule {
    Public,
    Authenticated,
    Permission(Permission),
}

/// Page-route table, keyed by locale-stripped path prefix.
const ROUTE_RULES: &[(&str, RouteRule)] = &[
    ("/admin/users", RouteRule::Permission(Permission::ManageUsers)),
    ("/admin/centers", RouteRule::Permission(Permission::ManageCenters)),
    ("/admin/payments", RouteRule::Permission(Permission::ViewAllPayments)),
    ("/admin/bookings", RouteRule::Permission(Permission::ViewAllBookings)),
    ("/admin", RouteRule::Permission(Permission::AccessAdmin)),
    ("/booking", RouteRule::Authenticated),
    ("/bookings", RouteRule::Authenticated),
    ("/cars", RouteRule::Authenticated),
    ("/centers", RouteRule::Authenticated),
    ("/profile", RouteRule::Authenticated),
];

/// route_rule
///
/// Looks up the rule for a locale-stripped page path. Prefixes match on whole path
/// segments (`/bookings` does not fall under `/booking`) and the longest match wins.
pub fn route_rule(path: &str) -> RouteRule {
    let path = path.trim_end_matches('/');

    ROUTE_RULES
        .iter()
        .filter(|(prefix, _)| matches_prefix(path, prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, rule)| *rule)
        .unwrap_or(RouteRule::Public)
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Whether a role satisfies a route rule once a session exists.
pub fn allows(role: Role, rule: RouteRule) -> bool {
    match rule {
        RouteRule::Public | RouteRule::Authenticated => true,
        RouteRule::Permission(permission) => has_permission(role, permission),
    }
}

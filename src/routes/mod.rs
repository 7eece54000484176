/// Router Module Index
///
/// Splits the routing table by access level. Access control is attached per module
/// (router layers for sessions, handler checks for permissions), so a route cannot be
/// exposed by accident through the wrong router.

/// API routes open to anonymous clients: sign-in flows and center discovery.
pub mod public;

/// API routes behind the `AuthUser` middleware. Require a valid session.
pub mod authenticated;

/// Back-office API, nested under `/api/admin`. Each handler checks its own permission.
pub mod admin;

/// Locale-prefixed page routes, behind the page guard.
pub mod pages;

/// Router Module Index
///
/// Routes are split by who may reach them. Access control is attached per group in
/// `create_router`, and the access router middleware wraps all three.

/// Routes open to everyone (anonymous included).
pub mod public;

/// Routes that need a resolved `AuthUser`.
pub mod authenticated;

/// Routes under `/admin/`, superusers only.
pub mod admin;

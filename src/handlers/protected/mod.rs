// handlers/protected/mod.rs - Protected handlers (identity required)
//
// Security Level: Authenticated session, then a per-handler permission check
// Route Prefix: /api/auth/* and /api/admin/*
// Middleware: tenant context wrapper with `ContextPolicy::authenticated()`
//
// Handlers receive the resolved `TenantContext` as an argument and must
// scope every store query with `ctx.scope()`.

pub mod auth;
pub mod tasks;
pub mod translations;

pub use auth::*;
pub use tasks::*;
pub use translations::*;

// handlers/elevated/mod.rs - Elevated handlers (super admin + step-up)
//
// Security Level: Super admin policy on the route group, plus a step-up
// proof checked inside each handler before anything is changed
// Route Prefix: /api/admin/memberships/*

pub mod memberships;

pub use memberships::*;

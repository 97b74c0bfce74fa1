// handlers/mod.rs - Handler tiers
//
// Public (no identity) → Protected (session + permission) →
// Elevated (super admin + step-up) → Scheduled (shared cron secret)
//
// Each tier is mounted in `app::build_router` behind the tenant context
// wrapper with the policy named in its module header.
pub mod elevated;
pub mod protected;
pub mod public;
pub mod scheduled;

pub use elevated::*;
pub use protected::*;
pub use public::*;
pub use scheduled::*;

// handlers/public/mod.rs - Public handlers (no identity required)
//
// Security Level: None for the service index and health probe; translation
// bundles run behind the tenant context wrapper with `require_auth: false`.
// Route Prefix: / and /api/translations/*

pub mod health;
pub mod root;
pub mod translations;

pub use health::health_get;
pub use root::root_get;
pub use translations::translations_get;

//! Tenant context: resolution from the request, the authorization wrapper
//! that enforces a route's policy, and the tenant filter used by stores.

pub mod context;
pub mod middleware;
pub mod resolver;
pub mod scope;

pub use context::TenantContext;
pub use middleware::{guard, with_tenant_context, ContextPolicy};
pub use resolver::{ContextResolver, JwtSessionProvider, Session, SessionError, SessionProvider};
pub use scope::{tenant_filter, TenantScope};

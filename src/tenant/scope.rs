use serde_json::{Map, Value};

pub const TENANT_KEY: &str = "tenantId";

/// Where-object fragment restricting a query to one tenant: `{}` when there
/// is no tenant, `{"tenantId": id}` otherwise.
pub fn tenant_filter(tenant_id: Option<&str>) -> Value {
    let mut fragment = Map::new();
    if let Some(id) = tenant_id {
        fragment.insert(TENANT_KEY.to_string(), Value::String(id.to_string()));
    }
    Value::Object(fragment)
}

/// Tenant restriction that can be merged with caller predicates.
///
/// `TenantScope::none()` is deliberately unrestricted; handlers that need a
/// tenant check `TenantContext::require_tenant` before building a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    tenant_id: Option<String>,
}

impl TenantScope {
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self { tenant_id: Some(tenant_id.into()) }
    }

    pub fn none() -> Self {
        Self { tenant_id: None }
    }

    pub fn from_option(tenant_id: Option<&str>) -> Self {
        Self { tenant_id: tenant_id.map(str::to_string) }
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn filter(&self) -> Value {
        tenant_filter(self.tenant_id())
    }

    /// Merge extra predicates under the tenant restriction. When scoped, a
    /// caller-supplied `tenantId` is overwritten.
    pub fn merge(&self, predicates: Value) -> Value {
        let mut merged = match predicates {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Some(id) = self.tenant_id() {
            merged.insert(TENANT_KEY.to_string(), Value::String(id.to_string()));
        }
        Value::Object(merged)
    }
}

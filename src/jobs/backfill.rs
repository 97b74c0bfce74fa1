use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::database::models::TenantMembership;
use crate::permissions::Role;
use crate::store::{DirectoryStore, StoreError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillEntry {
    pub user_id: String,
    pub email: String,
    pub tenant_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillSkip {
    pub user_id: String,
    pub email: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub dry_run: bool,
    pub examined: usize,
    pub created: Vec<BackfillEntry>,
    pub skipped: Vec<BackfillSkip>,
}

/// Gives every super admin without a membership a default SUPER_ADMIN
/// membership in their home tenant, or in `fallback_tenant` when they have
/// none. Users with neither are reported as skipped.
pub async fn backfill_super_admin_memberships(
    directory: &dyn DirectoryStore,
    fallback_tenant: Option<&str>,
    dry_run: bool,
) -> Result<BackfillReport, StoreError> {
    let orphans = directory.super_admins_without_membership().await?;
    let mut report = BackfillReport {
        dry_run,
        examined: orphans.len(),
        ..BackfillReport::default()
    };

    for user in orphans {
        let Some(tenant_id) = user.home_tenant_id.clone().or_else(|| fallback_tenant.map(str::to_string)) else {
            warn!(user_id = %user.id, "Super admin has no tenant to join");
            report.skipped.push(BackfillSkip {
                user_id: user.id,
                email: user.email,
                reason: "No home tenant".to_string(),
            });
            continue;
        };

        if !dry_run {
            directory
                .upsert_membership(TenantMembership {
                    user_id: user.id.clone(),
                    tenant_id: tenant_id.clone(),
                    role: Role::SuperAdmin.as_str().to_string(),
                    is_default: true,
                    created_at: Utc::now(),
                })
                .await?;
        }
        report.created.push(BackfillEntry {
            user_id: user.id,
            email: user.email,
            tenant_id,
        });
    }

    info!(
        dry_run,
        examined = report.examined,
        created = report.created.len(),
        skipped = report.skipped.len(),
        "Membership backfill finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::DirectoryUser;
    use crate::store::MemoryStore;

    fn user(id: &str, role: &str, home: Option<&str>) -> DirectoryUser {
        DirectoryUser {
            id: id.into(),
            email: format!("{}@example.com", id),
            name: None,
            role: role.into(),
            mfa_secret: None,
            home_tenant_id: home.map(str::to_string),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_user(user("root-a", "SUPER_ADMIN", Some("t1"))).await;
        store.insert_user(user("root-b", "super_admin", None)).await;
        store.insert_user(user("admin", "ADMIN", Some("t1"))).await;
        store
    }

    #[tokio::test]
    async fn dry_run_changes_nothing() {
        let store = seeded().await;
        let report = backfill_super_admin_memberships(&store, None, true).await.unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(store.memberships("root-a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repairs_missing_memberships_once() {
        let store = seeded().await;
        let report = backfill_super_admin_memberships(&store, Some("t9"), false).await.unwrap();
        assert_eq!(report.created.len(), 2);

        let memberships = store.memberships("root-b").await.unwrap();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].tenant_id, "t9");
        assert!(memberships[0].is_default);
        assert_eq!(memberships[0].role(), Role::SuperAdmin);

        let again = backfill_super_admin_memberships(&store, Some("t9"), false).await.unwrap();
        assert_eq!(again.examined, 0);
    }
}

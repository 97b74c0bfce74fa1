mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};

use backoffice_api::auth::totp;
use backoffice_api::database::models::{Booking, DirectoryUser, SecuritySettings};
use backoffice_api::store::{DirectoryStore, SecuritySettingsStore};

const MFA_SECRET: &str = "JBSWY3DPEHPK3PXP";

fn super_admin(id: &str, home_tenant: Option<&str>, mfa: bool) -> DirectoryUser {
    DirectoryUser {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        name: None,
        role: "SUPER_ADMIN".to_string(),
        mfa_secret: mfa.then(|| MFA_SECRET.to_string()),
        home_tenant_id: home_tenant.map(str::to_string),
    }
}

fn current_code() -> String {
    let secret = totp::decode_base32(MFA_SECRET).expect("valid base32");
    totp::code_at(&secret, Utc::now().timestamp()).expect("code")
}

#[tokio::test]
async fn step_up_token_unlocks_backfill() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    server.store.insert_user(super_admin("root", Some("t1"), true)).await;
    server.store.insert_user(super_admin("orphan", None, false)).await;
    server
        .store
        .put(SecuritySettings {
            step_up_mfa: true,
            ..SecuritySettings::defaults_for("t1")
        })
        .await?;
    let token = server.token("root", Some("t1"), "SUPER_ADMIN");

    // No proof yet
    let res = client
        .post(server.url("/api/admin/memberships/backfill"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers().get("www-authenticate").and_then(|v| v.to_str().ok()), Some("step-up"));

    // Short codes are a validation error, not an auth failure
    let res = client
        .post(server.url("/api/auth/step-up"))
        .bearer_auth(&token)
        .json(&json!({ "code": "123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let grant = client
        .post(server.url("/api/auth/step-up"))
        .bearer_auth(&token)
        .json(&json!({ "code": current_code() }))
        .send()
        .await?
        .json::<Value>()
        .await?;
    let step_up = grant["data"]["token"].as_str().unwrap_or_default().to_string();
    assert!(!step_up.is_empty(), "no step-up token: {}", grant);

    // Dry run reports without writing
    let res = client
        .post(server.url("/api/admin/memberships/backfill?dryRun=true"))
        .bearer_auth(&token)
        .header("x-step-up-token", &step_up)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let report = res.json::<Value>().await?;
    assert_eq!(report["data"]["dryRun"], true);
    assert_eq!(report["data"]["created"].as_array().map(Vec::len), Some(2));
    assert!(server.store.memberships("orphan").await?.is_empty());

    let res = client
        .post(server.url("/api/admin/memberships/backfill"))
        .bearer_auth(&token)
        .header("x-step-up-token", &step_up)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let memberships = server.store.memberships("orphan").await?;
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].tenant_id, "t1");
    assert_eq!(memberships[0].role, "SUPER_ADMIN");
    assert!(memberships[0].is_default);
    Ok(())
}

#[tokio::test]
async fn otp_header_is_accepted_directly() -> Result<()> {
    let server = common::ensure_server().await?;
    server.store.insert_user(super_admin("root", Some("t1"), true)).await;
    server
        .store
        .put(SecuritySettings {
            step_up_mfa: true,
            ..SecuritySettings::defaults_for("t1")
        })
        .await?;
    let token = server.token("root", Some("t1"), "SUPER_ADMIN");

    let res = reqwest::Client::new()
        .post(server.url("/api/admin/memberships/backfill?dryRun=true"))
        .bearer_auth(&token)
        .header("x-mfa-otp", current_code())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn step_up_is_for_super_admins_only() -> Result<()> {
    let server = common::ensure_server().await?;
    let token = server.token("admin", Some("t1"), "ADMIN");

    let res = reqwest::Client::new()
        .post(server.url("/api/auth/step-up"))
        .bearer_auth(&token)
        .json(&json!({ "code": "123456" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn reminders_are_sent_once() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    server
        .store
        .insert_booking(Booking {
            id: "b1".to_string(),
            tenant_id: "t1".to_string(),
            client_email: "client@example.com".to_string(),
            scheduled_at: Utc::now() + Duration::hours(24),
            reminder_sent: false,
        })
        .await;
    server
        .store
        .insert_booking(Booking {
            id: "b2".to_string(),
            tenant_id: "t2".to_string(),
            client_email: "other@example.com".to_string(),
            scheduled_at: Utc::now() + Duration::days(5),
            reminder_sent: false,
        })
        .await;

    let run = client
        .post(server.url("/api/cron/reminders"))
        .header("x-cron-secret", common::CRON_SECRET)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(run["data"]["sent"], 1, "{}", run);

    let again = client
        .post(server.url("/api/cron/reminders"))
        .header("x-cron-secret", common::CRON_SECRET)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(again["data"]["sent"], 0, "{}", again);

    let bookings = server.store.bookings().await;
    let sent: Vec<&str> = bookings.iter().filter(|b| b.reminder_sent).map(|b| b.id.as_str()).collect();
    assert_eq!(sent, vec!["b1"]);
    Ok(())
}

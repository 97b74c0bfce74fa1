mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn queued_import_is_processed_by_cron() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = server.token("lead", Some("t1"), "TEAM_LEAD");

    let csv = "Title,Priority,Status\nFirst,high,open\n,low,open\nThird,,completed\n";
    let res = client
        .post(server.url("/api/admin/tasks/import"))
        .bearer_auth(&token)
        .json(&json!({ "csv": csv }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let queued = res.json::<Value>().await?;
    let job_id = queued["data"]["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(queued["data"]["status"], "PENDING");
    assert_eq!(queued["data"]["totalRows"], 3);
    assert!(queued["data"].get("csv").is_none(), "raw csv leaked: {}", queued);

    let res = client
        .post(server.url("/api/cron/import-jobs"))
        .header("x-cron-secret", common::CRON_SECRET)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let run = res.json::<Value>().await?;
    assert_eq!(run["data"]["processed"], 1);
    assert_eq!(run["data"]["partiallySucceeded"], 1);

    let job = client
        .get(server.url(&format!("/api/admin/tasks/import/{}", job_id)))
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(job["data"]["status"], "PARTIAL_SUCCESS");
    assert_eq!(job["data"]["successCount"], 2);
    assert_eq!(job["data"]["failureCount"], 1);
    assert_eq!(job["data"]["errors"][0]["rowNumber"], 3);

    let tasks = client
        .get(server.url("/api/admin/tasks"))
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(tasks["data"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn import_jobs_are_tenant_scoped() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let owner = server.token("lead", Some("t1"), "TEAM_LEAD");
    let other = server.token("lead", Some("t2"), "TEAM_LEAD");

    let queued = client
        .post(server.url("/api/admin/tasks/import"))
        .bearer_auth(&owner)
        .json(&json!({ "csv": "title\nOnly\n" }))
        .send()
        .await?
        .json::<Value>()
        .await?;
    let job_id = queued["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = client
        .get(server.url(&format!("/api/admin/tasks/import/{}", job_id)))
        .bearer_auth(&other)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn malformed_csv_is_rejected_up_front() -> Result<()> {
    let server = common::ensure_server().await?;
    let token = server.token("lead", Some("t1"), "TEAM_LEAD");

    let res = reqwest::Client::new()
        .post(server.url("/api/admin/tasks/import"))
        .bearer_auth(&token)
        .json(&json!({ "csv": "title\n\"unterminated\n" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn cron_accepts_bearer_secret_and_rejects_others() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/api/cron/import-jobs"))
        .bearer_auth(common::CRON_SECRET)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(server.url("/api/cron/reminders"))
        .header("x-cron-secret", "wrong")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn cron_is_closed_without_a_configured_secret() -> Result<()> {
    let mut config = common::test_config();
    config.jobs.cron_secret = None;
    let server = common::ensure_server_with(config).await?;

    let res = reqwest::Client::new()
        .post(server.url("/api/cron/import-jobs"))
        .header("x-cron-secret", "")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

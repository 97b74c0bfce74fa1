use chrono::Utc;
use serde::Serialize;
use sqlx::types::Json;
use tracing::{error, info, warn};

use crate::config::JobsConfig;
use crate::database::models::{ImportJob, ImportJobStatus, ImportRowError, Task};
use crate::export::parse_import;
use crate::store::{ImportJobStore, StoreError, TaskStore};

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRunSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub partially_succeeded: usize,
    pub failed: usize,
    pub requeued: usize,
    pub expired_removed: u64,
}

enum JobOutcome {
    Finished(ImportJobStatus),
    Requeued,
}

/// Claims and processes up to `import_batch_size` pending jobs, then removes
/// expired ones.
pub async fn process_import_jobs(
    tasks: &dyn TaskStore,
    imports: &dyn ImportJobStore,
    config: &JobsConfig,
) -> Result<ImportRunSummary, StoreError> {
    let mut summary = ImportRunSummary::default();

    for _ in 0..config.import_batch_size {
        let Some(mut job) = imports.claim_next(Utc::now()).await? else {
            break;
        };
        summary.processed += 1;

        let outcome = process_job(tasks, &mut job).await;
        imports.save(&job).await?;

        match outcome {
            JobOutcome::Finished(ImportJobStatus::Success) => summary.succeeded += 1,
            JobOutcome::Finished(ImportJobStatus::PartialSuccess) => summary.partially_succeeded += 1,
            JobOutcome::Finished(_) => summary.failed += 1,
            JobOutcome::Requeued => {
                // The task store is failing; leave the rest for the next run
                summary.requeued += 1;
                break;
            }
        }
    }

    summary.expired_removed = imports.cleanup_expired(Utc::now()).await?;
    info!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        partial = summary.partially_succeeded,
        failed = summary.failed,
        requeued = summary.requeued,
        expired_removed = summary.expired_removed,
        "Import run finished"
    );
    Ok(summary)
}

/// Rows are resumed from `processed_rows`, so a retried job does not insert
/// the same row twice.
async fn process_job(tasks: &dyn TaskStore, job: &mut ImportJob) -> JobOutcome {
    let rows = match parse_import(&job.csv) {
        Ok(rows) => rows,
        Err(e) => {
            warn!(job_id = %job.id, "Import file is not valid CSV: {}", e);
            job.errors = Json(vec![ImportRowError { row_number: 1, error: e.to_string() }]);
            job.status = ImportJobStatus::Failed;
            return JobOutcome::Finished(job.status);
        }
    };
    job.total_rows = rows.len() as i32;

    for row in rows.into_iter().skip(job.processed_rows.max(0) as usize) {
        let outcome = match row.task {
            Ok(new_task) => match tasks.insert(Task::from_new(&job.tenant_id, new_task)).await {
                Ok(_) => Ok(()),
                Err(StoreError::Database(e)) => {
                    error!(job_id = %job.id, row = row.row_number, "Import interrupted: {}", e);
                    return requeue_or_fail(job);
                }
                Err(e) => Err(e.to_string()),
            },
            Err(message) => Err(message),
        };

        match outcome {
            Ok(()) => job.success_count += 1,
            Err(error) => {
                job.failure_count += 1;
                job.errors.0.push(ImportRowError { row_number: row.row_number, error });
            }
        }
        job.processed_rows += 1;
    }

    job.status = if job.failure_count == 0 {
        ImportJobStatus::Success
    } else if job.success_count == 0 {
        ImportJobStatus::Failed
    } else {
        ImportJobStatus::PartialSuccess
    };
    JobOutcome::Finished(job.status)
}

fn requeue_or_fail(job: &mut ImportJob) -> JobOutcome {
    job.retry_count += 1;
    if job.retry_count < job.max_retries {
        job.status = ImportJobStatus::Pending;
        JobOutcome::Requeued
    } else {
        job.status = ImportJobStatus::Failed;
        job.errors.0.push(ImportRowError {
            row_number: job.processed_rows as usize + 2,
            error: format!("Gave up after {} attempts", job.retry_count),
        });
        JobOutcome::Finished(job.status)
    }
}

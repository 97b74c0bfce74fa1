//! Work triggered by the scheduler endpoints and the operator CLI.

pub mod backfill;
pub mod imports;
pub mod reminders;

pub use backfill::{backfill_super_admin_memberships, BackfillReport};
pub use imports::{process_import_jobs, ImportRunSummary};
pub use reminders::{send_due_reminders, LogNotifier, NotifyError, ReminderNotifier, ReminderRunSummary};

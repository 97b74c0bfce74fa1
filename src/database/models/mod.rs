pub mod booking;
pub mod import_job;
pub mod membership;
pub mod security;
pub mod task;

pub use booking::Booking;
pub use import_job::{ImportJob, ImportJobStatus, ImportRowError};
pub use membership::{DirectoryUser, TenantMembership};
pub use security::SecuritySettings;
pub use task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};

pub mod backfill;

pub use backfill::memberships_backfill_post;

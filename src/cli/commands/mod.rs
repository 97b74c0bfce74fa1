pub mod cron;
pub mod memberships;
pub mod token;

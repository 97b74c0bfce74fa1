pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod filter;
pub mod handlers;
pub mod i18n;
pub mod jobs;
pub mod middleware;
pub mod permissions;
pub mod state;
pub mod store;
pub mod tenant;

#[cfg(test)]
pub mod testing;

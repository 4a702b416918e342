//! pgmig CLI - Command-line interface for pgmig.
//!
//! This crate provides the `pgmig` binary: versioned migrations, one-off
//! migration files, seeding and database bootstrap for PostgreSQL.

pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;

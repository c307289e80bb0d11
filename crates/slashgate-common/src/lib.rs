//! # slashgate-common
//!
//! Shared configuration, error types, identifiers and wire models used by every
//! slashgate crate. Nothing in here dispatches anything; it only describes shapes.

pub mod config;
pub mod error;
pub mod models;
pub mod permissions;
pub mod snowflake;
pub mod validation;

pub use permissions::Permissions;
pub use snowflake::Snowflake;

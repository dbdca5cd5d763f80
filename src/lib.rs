//! File-sharing host engine.
//!
//! Turns one declarative document of users, groups, and shares into a
//! running host: system identities are created, per-protocol daemons
//! (SMB, WebDAV, FTP, SFTP, NFS) are configured from the shares that
//! enable them, and the daemons are then supervised with their output
//! forwarded to the structured log.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: parse and validate the configuration document
//! - **[`plan`]**: compile the document into an ordered list of actions
//! - **[`engine`]**: execute a plan against the host, tracking [`state`]
//! - **[`channels`]**: per-protocol configurators and the daemon supervisor
//! - **[`resources`]**: idempotent `check + apply` primitives (accounts, keys)
//! - **[`commands`]**: top-level subcommand orchestration (`run`, `plan`, `check`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod channels;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod logging;
pub mod operations;
pub mod plan;
pub mod resources;
pub mod state;
